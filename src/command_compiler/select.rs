use nom::{
    bytes::complete::tag_no_case,
    character::complete::multispace0,
    error::{convert_error, VerboseError},
    sequence::preceded,
    Finish, IResult,
};

use super::parse_terminator;
use super::statement::{ParseError, Statement};

fn parse_bare<'a>(
    keyword: &'static str,
) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str, VerboseError<&'a str>> {
    move |input| {
        let (input, _) = preceded(multispace0, tag_no_case(keyword))(input)?;
        let (_, _) = parse_terminator(input)?;
        Ok(("", ""))
    }
}

pub(super) fn validate_select(input: &str) -> Result<Statement, ParseError> {
    match parse_bare("select")(input).finish() {
        Err(e) => Err(ParseError::MalformedStatement(convert_error(input, e))),
        Ok((_, _)) => Ok(Statement::Select),
    }
}

pub(super) fn validate_bookmark(input: &str) -> Result<Statement, ParseError> {
    match parse_bare("bookmark")(input).finish() {
        Err(e) => Err(ParseError::MalformedStatement(convert_error(input, e))),
        Ok((_, _)) => Ok(Statement::Bookmark),
    }
}
