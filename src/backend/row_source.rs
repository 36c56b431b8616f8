use thiserror::Error;

use super::bookmark::{BookmarkKind, RawBookmark};
use super::columns::Columns;
use super::row::FieldValue;
use super::row_handle::RowId;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Row source unavailable: {0}")]
    Unavailable(String),
    #[error("Row source rejected bookmark: {0}")]
    BadBookmark(String),
    #[error("Row source does not support bookmarks")]
    BookmarksUnsupported,
    #[error("Row {0} is not known to the row source")]
    UnknownRow(RowId),
    #[error("Row {0} released more times than it was referenced")]
    NotHeld(RowId),
    #[error("Column {0} out of range")]
    ColumnOutOfRange(usize),
    #[error("Row source rejected new row: {0}")]
    InsertRejected(String),
}

/// Result of one fetch call. `end_of_rows` reports that the fetch ran into either end of the
/// rowset before `count` rows could be returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedRows {
    pub rows: Vec<RowId>,
    pub end_of_rows: bool,
}

impl FetchedRows {
    pub fn end() -> Self {
        Self {
            rows: Vec::new(),
            end_of_rows: true,
        }
    }
}

/// Pull-based backing store the cursor fetches from.
///
/// Every [`RowId`] returned by a fetch or by [`RowSource::insert_row`] carries one reference
/// owned by the caller. [`RowSource::add_ref`] adds one, [`RowSource::release`] drops one per id.
///
/// Sequential fetches work from a *next fetch position* sitting between two rows. Right after
/// creation or [`RowSource::restart`] the position is at the origin: a forward fetch starts
/// before the first row and a backward fetch starts after the last row. `offset` moves the
/// position before fetching. A positive `count` returns the rows following the position in
/// order, a negative one returns the rows preceding it in reverse order, and the position ends
/// up just past the last row returned. An offset landing outside the rowset returns no rows with
/// `end_of_rows` set. A failed fetch leaves the position where it was.
///
/// Bookmark fetches return the bookmarked row moved by `offset` first, then continue in the
/// direction of `count`. They do not touch the sequential position.
pub trait RowSource {
    /// `None` when the source can only be walked sequentially.
    fn bookmark_kind(&self) -> Option<BookmarkKind> {
        None
    }

    fn fetch_sequential(&mut self, offset: i64, count: i64) -> Result<FetchedRows, SourceError>;

    fn fetch_at_bookmark(
        &mut self,
        _bookmark: &RawBookmark,
        _offset: i64,
        _count: i64,
    ) -> Result<FetchedRows, SourceError> {
        Err(SourceError::BookmarksUnsupported)
    }

    fn get_bookmark(&mut self, _row: RowId) -> Result<RawBookmark, SourceError> {
        Err(SourceError::BookmarksUnsupported)
    }

    fn add_ref(&mut self, row: RowId) -> Result<(), SourceError>;

    fn release(&mut self, rows: &[RowId]) -> Result<(), SourceError>;

    /// Moves the sequential position back to the origin.
    fn restart(&mut self) -> Result<(), SourceError>;

    fn columns(&self) -> Columns {
        Columns::new()
    }

    fn get_data(&mut self, _row: RowId, column: usize) -> Result<FieldValue, SourceError> {
        Err(SourceError::ColumnOutOfRange(column))
    }

    /// Appends a row and hands it back with one reference. The sequential position is left just
    /// after the new row, as if it had been fetched forward.
    fn insert_row(&mut self, _values: Vec<FieldValue>) -> Result<RowId, SourceError> {
        Err(SourceError::InsertRejected(
            "row source is read only".to_string(),
        ))
    }
}
