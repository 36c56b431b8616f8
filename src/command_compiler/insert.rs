use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{cut, map, opt, recognize, value},
    error::{convert_error, VerboseError},
    multi::separated_list1,
    sequence::{delimited, pair, tuple},
    Finish, IResult,
};

use super::statement::{ParseError, Statement};
use super::{escaped_string_double_quote, escaped_string_single_quote, parse_terminator};

/// One value of an `INSERT VALUES (...)` list. Quoted values keep their quoting so the
/// string `'null'` stays distinct from the `NULL` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertValue<'a> {
    Null,
    Number(&'a str),
    Quoted(&'a str),
}

/// Values of an `INSERT VALUES (...)` statement, in column order.
#[derive(Debug, PartialEq, Eq)]
pub struct InsertTokens<'a> {
    pub column_values: Vec<InsertValue<'a>>,
}

fn parse_value(input: &str) -> IResult<&str, InsertValue, VerboseError<&str>> {
    alt((
        map(recognize(pair(opt(char('-')), digit1)), InsertValue::Number),
        value(InsertValue::Null, tag_no_case("null")),
        map(
            delimited(char('\''), escaped_string_single_quote, char('\'')),
            InsertValue::Quoted,
        ),
        map(
            delimited(char('"'), escaped_string_double_quote, char('"')),
            InsertValue::Quoted,
        ),
    ))(input)
}

fn parse_column_values(input: &str) -> IResult<&str, Vec<InsertValue>, VerboseError<&str>> {
    separated_list1(
        char(','),
        cut(delimited(multispace0, parse_value, multispace0)),
    )(input)
}

fn parse_insert(input: &str) -> IResult<&str, InsertTokens, VerboseError<&str>> {
    let (input, _) = tuple((multispace0, tag_no_case("insert"), multispace1))(input)?;
    let (input, _) = cut(tag_no_case("values"))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, column_values) =
        cut(delimited(char('('), parse_column_values, char(')')))(input)?;
    let (_, _) = cut(parse_terminator)(input)?;

    Ok(("", InsertTokens { column_values }))
}

pub(super) fn validate_insert(input: &str) -> Result<Statement, ParseError> {
    match parse_insert(input).finish() {
        Err(e) => Err(ParseError::MalformedStatement(convert_error(input, e))),
        Ok((_, insert_tokens)) => Ok(Statement::Insert(insert_tokens)),
    }
}
