use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tabled::Tabled;
use thiserror::Error;
use tracing::{instrument, trace};

use super::bookmark::{BookmarkKind, RawBookmark};
use super::columns::{ColumnItemType, Columns, IntegerType, TextType};
use super::row::{FieldValue, Row};
use super::row_handle::RowId;
use super::row_source::{FetchedRows, RowSource, SourceError};

const DEMO_NAME_SIZE: u8 = 32;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Row has {found} values but table has {expected} columns")]
    ColumnCountMismatch { expected: usize, found: usize },
    #[error("Could not encode row: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Could not decode row: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("Table full. Row ids no longer fit in {0:?} bookmarks")]
    TableFull(BookmarkKind),
}

/// Counters of every call the cursor made into the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Tabled)]
pub struct SourceStats {
    pub fetches: usize,
    pub rows_fetched: usize,
    pub restarts: usize,
    pub add_refs: usize,
    pub inserts: usize,
    pub releases: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPosition {
    Origin,
    Gap(usize),
}

#[derive(Debug, Serialize, Deserialize)]
struct OpaqueBookmark {
    table: String,
    rowid: u64,
}

#[derive(Debug)]
struct StoredRow {
    rowid: RowId,
    payload: Box<[u8]>,
}

/// Row source over rows held in memory, addressable sequentially and, when built with a
/// [`BookmarkKind`], by bookmark. Tracks the references it hands out.
#[derive(Debug)]
pub struct MemoryTable {
    pub name: String,
    columns: Columns,
    rows: Vec<StoredRow>,
    bookmark_kind: Option<BookmarkKind>,
    next_fetch: FetchPosition,
    refs: HashMap<RowId, usize>,
    stats: SourceStats,
}

impl MemoryTable {
    const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

    pub fn new(name: &str, columns: Columns, bookmark_kind: Option<BookmarkKind>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
            bookmark_kind,
            next_fetch: FetchPosition::Origin,
            refs: HashMap::new(),
            stats: SourceStats::default(),
        }
    }

    /// Table of `num_rows` rows `(i, "row i")`.
    pub fn with_demo_rows(
        name: &str,
        num_rows: usize,
        bookmark_kind: Option<BookmarkKind>,
    ) -> Result<Self, TableError> {
        let columns = Columns::from(vec![
            ("id", ColumnItemType::Integer(IntegerType::Int)),
            ("name", ColumnItemType::Text(TextType::Varchar(DEMO_NAME_SIZE))),
        ]);
        let mut table = Self::new(name, columns, bookmark_kind);
        for i in 0..num_rows {
            table.push_row(vec![
                FieldValue::Integer(i as i32),
                FieldValue::Text(format!("row {}", i)),
            ])?;
        }
        Ok(table)
    }

    #[instrument(parent = None, skip(self), level = "trace")]
    /// Appends a row without handing out a reference to it.
    pub fn push_row(&mut self, values: Vec<FieldValue>) -> Result<RowId, TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::ColumnCountMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        let rowid = self.rows.len() as u64 + 1;
        if self.bookmark_kind == Some(BookmarkKind::Fixed4) && rowid > u64::from(u32::MAX) {
            return Err(TableError::TableFull(BookmarkKind::Fixed4));
        }
        let payload: Box<[u8]> = Row::new(rowid, values).try_into()?;
        self.rows.push(StoredRow {
            rowid: RowId(rowid),
            payload,
        });
        Ok(RowId(rowid))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn stats(&self) -> SourceStats {
        self.stats
    }

    /// Row references handed out and not yet released.
    pub fn outstanding_refs(&self) -> usize {
        self.refs.values().sum()
    }

    /// Bookmark of the row at `index` in table order.
    pub fn bookmark_at(&self, index: usize) -> Option<RawBookmark> {
        let row = self.rows.get(index)?;
        self.encode_bookmark(row.rowid).ok()
    }

    pub fn row(&self, row: RowId) -> Result<Row, SourceError> {
        let index = self.index_of(row).ok_or(SourceError::UnknownRow(row))?;
        Row::try_from(&*self.rows[index].payload)
            .map_err(|err| SourceError::Unavailable(err.to_string()))
    }

    fn index_of(&self, row: RowId) -> Option<usize> {
        self.rows
            .binary_search_by_key(&row, |stored| stored.rowid)
            .ok()
    }

    fn encode_bookmark(&self, row: RowId) -> Result<RawBookmark, SourceError> {
        match self.bookmark_kind {
            None => Err(SourceError::BookmarksUnsupported),
            Some(BookmarkKind::Fixed4) => {
                let rowid = u32::try_from(row.0)
                    .map_err(|_| SourceError::BadBookmark(format!("row {} too large", row)))?;
                Ok(RawBookmark::from(&rowid.to_le_bytes()[..]))
            }
            Some(BookmarkKind::Fixed8) => Ok(RawBookmark::from(&row.0.to_le_bytes()[..])),
            Some(BookmarkKind::Variable) => {
                let opaque = OpaqueBookmark {
                    table: self.name.clone(),
                    rowid: row.0,
                };
                bincode::serde::encode_to_vec(&opaque, Self::BINCODE_CONFIG)
                    .map(RawBookmark::from)
                    .map_err(|err| SourceError::BadBookmark(err.to_string()))
            }
        }
    }

    /// Index of the row a raw bookmark designates. `None` for a sentinel on an empty table.
    fn resolve(&self, bookmark: &RawBookmark) -> Result<Option<usize>, SourceError> {
        let kind = self
            .bookmark_kind
            .ok_or(SourceError::BookmarksUnsupported)?;
        if bookmark.is_first() {
            return Ok((!self.rows.is_empty()).then_some(0));
        }
        if bookmark.is_last() {
            return Ok(self.rows.len().checked_sub(1));
        }
        let rowid = match kind {
            BookmarkKind::Fixed4 => <[u8; 4]>::try_from(&bookmark[..])
                .map(|bytes| u64::from(u32::from_le_bytes(bytes)))
                .map_err(|_| SourceError::BadBookmark("expected 4 bytes".to_string()))?,
            BookmarkKind::Fixed8 => <[u8; 8]>::try_from(&bookmark[..])
                .map(u64::from_le_bytes)
                .map_err(|_| SourceError::BadBookmark("expected 8 bytes".to_string()))?,
            BookmarkKind::Variable => {
                let (opaque, _): (OpaqueBookmark, usize) =
                    bincode::serde::decode_from_slice(bookmark, Self::BINCODE_CONFIG)
                        .map_err(|err| SourceError::BadBookmark(err.to_string()))?;
                if opaque.table != self.name {
                    return Err(SourceError::BadBookmark(format!(
                        "bookmark belongs to table {}",
                        opaque.table
                    )));
                }
                opaque.rowid
            }
        };
        self.index_of(RowId(rowid))
            .map(Some)
            .ok_or_else(|| SourceError::BadBookmark(format!("no row {}", RowId(rowid))))
    }

    fn hand_out(&mut self, indices: Vec<usize>, count: i64) -> FetchedRows {
        let rows: Vec<RowId> = indices.into_iter().map(|i| self.rows[i].rowid).collect();
        for row in &rows {
            *self.refs.entry(*row).or_insert(0) += 1;
        }
        self.stats.rows_fetched += rows.len();
        let end_of_rows = (rows.len() as u64) < count.unsigned_abs();
        trace!(fetched = rows.len(), end_of_rows, "rows handed out");
        FetchedRows { rows, end_of_rows }
    }
}

impl RowSource for MemoryTable {
    fn bookmark_kind(&self) -> Option<BookmarkKind> {
        self.bookmark_kind
    }

    #[instrument(parent = None, skip(self), level = "trace")]
    fn fetch_sequential(&mut self, offset: i64, count: i64) -> Result<FetchedRows, SourceError> {
        self.stats.fetches += 1;
        let len = self.rows.len() as i64;
        let base = match self.next_fetch {
            FetchPosition::Origin if count < 0 => len,
            FetchPosition::Origin => 0,
            FetchPosition::Gap(gap) => gap as i64,
        };
        let start = base + offset;
        if !(0..=len).contains(&start) {
            return Ok(FetchedRows::end());
        }

        let (indices, gap): (Vec<usize>, i64) = if count >= 0 {
            let end = (start + count).min(len);
            ((start..end).map(|i| i as usize).collect(), end)
        } else {
            let low = (start + count).max(0);
            ((low..start).rev().map(|i| i as usize).collect(), low)
        };
        self.next_fetch = FetchPosition::Gap(gap as usize);
        Ok(self.hand_out(indices, count))
    }

    #[instrument(parent = None, skip(self), level = "trace")]
    fn fetch_at_bookmark(
        &mut self,
        bookmark: &RawBookmark,
        offset: i64,
        count: i64,
    ) -> Result<FetchedRows, SourceError> {
        self.stats.fetches += 1;
        let Some(base) = self.resolve(bookmark)? else {
            return Ok(FetchedRows::end());
        };
        let len = self.rows.len() as i64;
        let start = base as i64 + offset;
        if !(0..len).contains(&start) {
            return Ok(FetchedRows::end());
        }

        let indices: Vec<usize> = if count >= 0 {
            (start..(start + count).min(len))
                .map(|i| i as usize)
                .collect()
        } else {
            ((start + count + 1).max(0)..=start)
                .rev()
                .map(|i| i as usize)
                .collect()
        };
        Ok(self.hand_out(indices, count))
    }

    fn get_bookmark(&mut self, row: RowId) -> Result<RawBookmark, SourceError> {
        self.index_of(row).ok_or(SourceError::UnknownRow(row))?;
        self.encode_bookmark(row)
    }

    fn add_ref(&mut self, row: RowId) -> Result<(), SourceError> {
        self.index_of(row).ok_or(SourceError::UnknownRow(row))?;
        *self.refs.entry(row).or_insert(0) += 1;
        self.stats.add_refs += 1;
        Ok(())
    }

    fn release(&mut self, rows: &[RowId]) -> Result<(), SourceError> {
        for row in rows {
            match self.refs.get_mut(row) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    if *count == 0 {
                        self.refs.remove(row);
                    }
                }
                _ => return Err(SourceError::NotHeld(*row)),
            }
            self.stats.releases += 1;
        }
        Ok(())
    }

    fn restart(&mut self) -> Result<(), SourceError> {
        self.next_fetch = FetchPosition::Origin;
        self.stats.restarts += 1;
        Ok(())
    }

    fn columns(&self) -> Columns {
        self.columns.clone()
    }

    fn get_data(&mut self, row: RowId, column: usize) -> Result<FieldValue, SourceError> {
        self.row(row)?
            .into_attributes()
            .into_iter()
            .nth(column)
            .ok_or(SourceError::ColumnOutOfRange(column))
    }

    #[instrument(parent = None, skip(self), level = "trace")]
    fn insert_row(&mut self, values: Vec<FieldValue>) -> Result<RowId, SourceError> {
        let row = self
            .push_row(values)
            .map_err(|err| SourceError::InsertRejected(err.to_string()))?;
        self.refs.insert(row, 1);
        self.stats.inserts += 1;
        self.next_fetch = FetchPosition::Gap(self.rows.len());
        Ok(row)
    }
}
