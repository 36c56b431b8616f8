use nom::{
    character::complete::{alpha1, multispace0},
    error::VerboseError,
    sequence::preceded,
    IResult,
};

mod cache;
mod common_parsers;
mod insert;
mod movement;
mod seek;
mod select;
pub mod statement;

use common_parsers::*;
pub use insert::{InsertTokens, InsertValue};
pub use statement::*;

fn parse_keyword(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    preceded(multispace0, alpha1)(input)
}

pub fn parse_statement(statement_str: &str) -> Result<Statement, ParseError> {
    let Ok((_, keyword)) = parse_keyword(statement_str) else {
        return Err(ParseError::UnknownStatement);
    };

    match keyword.to_ascii_lowercase().as_str() {
        "move" => movement::validate_move(statement_str),
        "seek" => seek::validate_seek(statement_str),
        "cache" => cache::validate_cache(statement_str),
        "insert" => insert::validate_insert(statement_str),
        "select" => select::validate_select(statement_str),
        "bookmark" => select::validate_bookmark(statement_str),
        _ => Err(ParseError::UnknownStatement),
    }
}
