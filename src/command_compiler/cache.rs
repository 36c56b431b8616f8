use std::num::NonZeroU32;

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

fn parse_cache(input: &str) -> IResult<&str, NonZeroU32, VerboseError<&str>> {
    let (input, _) = tuple((multispace0, tag_no_case("cache"), multispace1))(input)?;
    let (input, cache_size) = cut(map_res(digit1, |s: &str| s.parse::<NonZeroU32>()))(input)?;
    let (_, _) = cut(parse_terminator)(input)?;

    Ok(("", cache_size))
}

pub(super) fn validate_cache(input: &str) -> Result<Statement, ParseError> {
    match parse_cache(input).finish() {
        Err(e) => Err(ParseError::MalformedStatement(convert_error(input, e))),
        Ok((_, cache_size)) => Ok(Statement::Cache(cache_size)),
    }
}
