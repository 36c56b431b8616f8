use std::num::NonZeroU32;

use thiserror::Error;

use super::insert::InsertTokens;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget {
    First,
    Last,
    Next,
    Previous,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Statement<'a> {
    Move(MoveTarget),
    Seek(u64),
    Cache(NonZeroU32),
    Insert(InsertTokens<'a>),
    Select,
    Bookmark,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown statement")]
    UnknownStatement,
    #[error("Malformed statement:\n{0}")]
    MalformedStatement(String),
}
