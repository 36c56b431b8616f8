use thiserror::Error;

use crate::backend::bookmark::BookmarkError;
use crate::backend::cursor::CursorError;

#[derive(Error, Debug)]
pub enum VMError {
    #[error("Cannot perform operation. No database connection open.")]
    DBClosed,
    #[error("{0}")]
    Cursor(#[from] CursorError),
    #[error("Cannot read bookmark: {0}")]
    Bookmark(#[from] BookmarkError),
    #[error("The open table does not support bookmarks")]
    BookmarksUnsupported,
    #[error("Row {0} not in table")]
    NoSuchRow(u64),
    #[error("No current row")]
    NoCurrentRow,
    #[error("Mismatch between number of columns ({0}) and number of values passed ({1})")]
    ColumnCountMismatch(usize, usize),
    #[error("Error when parsing value {0}")]
    ItemParsingError(String),
}
