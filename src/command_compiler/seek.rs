use nom::{
    bytes::complete::tag_no_case,
    character::complete::{digit1, multispace0, multispace1},
    combinator::{cut, map_res},
    error::{convert_error, VerboseError},
    sequence::tuple,
    Finish, IResult,
};

use super::parse_terminator;
use super::statement::{ParseError, Statement};

/// `SEEK <n>;` addresses the bookmark of the table's n-th row.
fn parse_seek(input: &str) -> IResult<&str, u64, VerboseError<&str>> {
    let (input, _) = tuple((multispace0, tag_no_case("seek"), multispace1))(input)?;
    let (input, row_number) = cut(map_res(digit1, |s: &str| s.parse::<u64>()))(input)?;
    let (_, _) = cut(parse_terminator)(input)?;

    Ok(("", row_number))
}

pub(super) fn validate_seek(input: &str) -> Result<Statement, ParseError> {
    match parse_seek(input).finish() {
        Err(e) => Err(ParseError::MalformedStatement(convert_error(input, e))),
        Ok((_, row_number)) => Ok(Statement::Seek(row_number)),
    }
}
