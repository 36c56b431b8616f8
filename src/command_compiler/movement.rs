use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{multispace0, multispace1},
    combinator::{cut, value},
    error::{convert_error, VerboseError},
    sequence::tuple,
    Finish, IResult,
};

use super::parse_terminator;
use super::statement::{MoveTarget, ParseError, Statement};

fn parse_move_target(input: &str) -> IResult<&str, MoveTarget, VerboseError<&str>> {
    alt((
        value(MoveTarget::First, tag_no_case("first")),
        value(MoveTarget::Last, tag_no_case("last")),
        value(MoveTarget::Next, tag_no_case("next")),
        value(
            MoveTarget::Previous,
            alt((tag_no_case("previous"), tag_no_case("prev"))),
        ),
    ))(input)
}

fn parse_move(input: &str) -> IResult<&str, MoveTarget, VerboseError<&str>> {
    let (input, _) = tuple((multispace0, tag_no_case("move"), multispace1))(input)?;
    let (input, target) = cut(parse_move_target)(input)?;
    let (_, _) = cut(parse_terminator)(input)?;

    Ok(("", target))
}

pub(super) fn validate_move(input: &str) -> Result<Statement, ParseError> {
    match parse_move(input).finish() {
        Err(e) => Err(ParseError::MalformedStatement(convert_error(input, e))),
        Ok((_, target)) => Ok(Statement::Move(target)),
    }
}
