use nom::{
    bytes::complete::escaped,
    character::complete::{char, multispace0, none_of, one_of},
    combinator::all_consuming,
    error::VerboseError,
    sequence::pair,
    IResult,
};

pub(super) fn escaped_string_single_quote(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    escaped(none_of("\\\'"), '\\', one_of(r#""n\'"#))(input)
}

pub(super) fn escaped_string_double_quote(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    escaped(none_of("\\\""), '\\', one_of(r#""n\'"#))(input)
}

/// Trailing `;` closing every statement.
pub(super) fn parse_terminator(input: &str) -> IResult<&str, (&str, char), VerboseError<&str>> {
    all_consuming(pair(multispace0, char(';')))(input)
}
