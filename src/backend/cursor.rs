use std::fmt;
use std::mem;
use std::num::NonZeroU32;

use thiserror::Error;
use tracing::{debug, instrument, trace};

use super::bookmark::{Bookmark, BookmarkCodec, BookmarkError, RawBookmark};
use super::cache_window::{CacheWindow, FetchDirection, WindowDirection, WindowShape};
use super::columns::Columns;
use super::row::FieldValue;
use super::row_handle::{RowHandle, RowId, SharedRowSource};
use super::row_source::{FetchedRows, SourceError};

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("No current record. BOF or EOF is reached, or no row is positioned")]
    NoCurrentRecord,
    #[error("Invalid bookmark: {0}")]
    InvalidBookmark(String),
    #[error("Row source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),
    #[error("Could not allocate memory for the cache window or bookmark")]
    OutOfMemory,
    #[error("Field {0} does not exist in the current row")]
    FieldOutOfRange(usize),
}

impl From<SourceError> for CursorError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::BadBookmark(reason) => CursorError::InvalidBookmark(reason),
            SourceError::BookmarksUnsupported => {
                CursorError::InvalidBookmark(SourceError::BookmarksUnsupported.to_string())
            }
            SourceError::ColumnOutOfRange(column) => CursorError::FieldOutOfRange(column),
            other => CursorError::SourceUnavailable(other),
        }
    }
}

impl From<BookmarkError> for CursorError {
    fn from(err: BookmarkError) -> Self {
        match err {
            BookmarkError::OutOfMemory => CursorError::OutOfMemory,
            other => CursorError::InvalidBookmark(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorOptions {
    cache_size: NonZeroU32,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            cache_size: NonZeroU32::MIN,
        }
    }
}

impl CursorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows requested from the row source per fetch.
    pub fn with_cache_size(mut self, cache_size: NonZeroU32) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn cache_size(&self) -> NonZeroU32 {
        self.cache_size
    }
}

/// Snapshot of the cursor flags and position, without triggering any fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    pub bof: bool,
    pub eof: bool,
    pub current: Option<RowId>,
    pub bookmark: Option<Bookmark>,
    pub cache_size: u32,
}

/// The current row either lives in the window (no reference of its own) or is a handle the
/// cursor owns outright.
#[derive(Debug, Default)]
enum CurrentRow {
    #[default]
    None,
    Window(usize),
    Detached(RowHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchAddress {
    Sequential { offset: i64, restart: bool },
    AtBookmark { bookmark: Bookmark, offset: i64 },
}

/// Bidirectional cursor over a [`RowSource`](super::row_source::RowSource), served from a cache
/// window of prefetched row handles.
pub struct Cursor {
    source: SharedRowSource,
    window: CacheWindow,
    current: CurrentRow,
    bof: bool,
    eof: bool,
    positioned: bool,
    cache_size: NonZeroU32,
    codec: Option<BookmarkCodec>,
    // Bookmark of the last row fetched, or the sentinel of the end last run into.
    bookmark: Option<Bookmark>,
    restart_pending: bool,
    // The window's last fetch reported the end of the rowset in this direction.
    end_of_rows: Option<FetchDirection>,
    // A failed repositioning left a sequential source at its origin while a row stayed current.
    reanchor_pending: bool,
}

impl Cursor {
    #[instrument(parent = None, skip(source), level = "trace")]
    /// Opens a cursor. Nothing is fetched until the first move or value access.
    pub fn open(source: SharedRowSource, options: CursorOptions) -> Self {
        let codec = source.borrow().bookmark_kind().map(BookmarkCodec::new);
        debug!(
            cache_size = options.cache_size.get(),
            bookmarks = ?codec.map(|codec| codec.kind()),
            "cursor opened"
        );
        Self {
            source,
            window: CacheWindow::new(),
            current: CurrentRow::None,
            bof: false,
            eof: false,
            positioned: false,
            cache_size: options.cache_size,
            bookmark: codec.map(|_| Bookmark::BeforeFirst),
            codec,
            restart_pending: false,
            end_of_rows: None,
            reanchor_pending: false,
        }
    }

    /// Releases every row the cursor still holds.
    pub fn close(mut self) {
        self.current = CurrentRow::None;
        self.window.reset();
        debug!("cursor closed");
    }

    pub fn cache_size(&self) -> NonZeroU32 {
        self.cache_size
    }

    /// Takes effect at the next fetch. A window already in place is left alone.
    pub fn set_cache_size(&mut self, cache_size: NonZeroU32) {
        self.cache_size = cache_size;
    }

    pub fn supports_bookmarks(&self) -> bool {
        self.codec.is_some()
    }

    pub fn window(&self) -> &CacheWindow {
        &self.window
    }

    pub fn state(&self) -> CursorState {
        CursorState {
            bof: self.bof,
            eof: self.eof,
            current: self.current_handle().map(RowHandle::id),
            bookmark: self.bookmark.clone(),
            cache_size: self.cache_size.get(),
        }
    }

    pub fn current_row(&mut self) -> Result<Option<RowId>, CursorError> {
        self.ensure_positioned()?;
        Ok(self.current_handle().map(RowHandle::id))
    }

    pub fn at_bof(&mut self) -> Result<bool, CursorError> {
        self.ensure_positioned()?;
        Ok(self.bof)
    }

    pub fn at_eof(&mut self) -> Result<bool, CursorError> {
        self.ensure_positioned()?;
        Ok(self.eof)
    }

    pub fn columns(&self) -> Columns {
        self.source.borrow().columns()
    }

    /// Reads one field of the current row.
    pub fn field(&mut self, column: usize) -> Result<FieldValue, CursorError> {
        let row = self.current_id()?;
        Ok(self.source.borrow_mut().get_data(row, column)?)
    }

    /// Reads every field of the current row.
    pub fn fields(&mut self) -> Result<Vec<FieldValue>, CursorError> {
        let row = self.current_id()?;
        let num_columns = self.source.borrow().columns().len();
        let mut source = self.source.borrow_mut();
        (0..num_columns)
            .map(|column| source.get_data(row, column).map_err(CursorError::from))
            .collect()
    }

    /// Bookmark of the current row, usable with [`Cursor::seek`].
    pub fn bookmark(&mut self) -> Result<Bookmark, CursorError> {
        let row = self.current_id()?;
        let codec = self.codec.ok_or_else(|| {
            CursorError::InvalidBookmark(SourceError::BookmarksUnsupported.to_string())
        })?;
        let raw = self.source.borrow_mut().get_bookmark(row)?;
        Ok(codec.encode(&raw)?)
    }

    #[instrument(parent = None, skip(self), level = "trace")]
    pub fn move_first(&mut self) -> Result<(), CursorError> {
        self.reposition(FetchDirection::Forward, None)
    }

    #[instrument(parent = None, skip(self), level = "trace")]
    pub fn move_last(&mut self) -> Result<(), CursorError> {
        self.reposition(FetchDirection::Backward, None)
    }

    pub fn move_next(&mut self) -> Result<(), CursorError> {
        self.ensure_positioned()?;
        self.advance(FetchDirection::Forward)
    }

    pub fn move_previous(&mut self) -> Result<(), CursorError> {
        self.ensure_positioned()?;
        self.advance(FetchDirection::Backward)
    }

    #[instrument(parent = None, skip(self), level = "trace")]
    /// Positions the cursor on the row `bookmark` designates and prefetches forward from it.
    pub fn seek(&mut self, bookmark: &Bookmark) -> Result<(), CursorError> {
        if self.codec.is_none() {
            return Err(CursorError::InvalidBookmark(
                SourceError::BookmarksUnsupported.to_string(),
            ));
        }
        self.reposition(FetchDirection::Forward, Some(bookmark.clone()))
    }

    #[instrument(parent = None, skip(self), ret, level = "trace")]
    /// Moves one row in `direction`, from the window when it can and from the row source
    /// otherwise.
    pub fn advance(&mut self, direction: FetchDirection) -> Result<(), CursorError> {
        let at_boundary = match direction {
            FetchDirection::Forward => self.eof,
            FetchDirection::Backward => self.bof,
        };
        if at_boundary {
            return Err(CursorError::NoCurrentRecord);
        }
        if self.reanchor_pending {
            self.reanchor()?;
        }

        let Some(window_direction) = self.window.direction().fetch_direction() else {
            let address = self.origin_address(direction);
            return self.refill(direction, address);
        };

        let index = if window_direction == direction {
            self.window.take_next()
        } else {
            self.window.step_back()
        };
        match index {
            Some(index) => {
                trace!(index, "served from cache window");
                self.select(index);
                Ok(())
            }
            None if window_direction == direction
                && self.end_of_rows == Some(direction)
                && self.window.remaining() == 0 =>
            {
                trace!("window already reached the end of rows");
                let had_current = self.current_handle().is_some();
                self.current = CurrentRow::None;
                self.hit_boundary(direction, had_current);
                Ok(())
            }
            None => {
                let address = self.refill_address(direction, window_direction);
                self.refill(direction, address)
            }
        }
    }

    #[instrument(parent = None, skip(self, values), level = "trace")]
    /// Inserts a new row through the row source and makes it current.
    pub fn add_new(&mut self, values: Vec<FieldValue>) -> Result<RowId, CursorError> {
        let held = self.detach_current()?;
        let shape = self.window.release();

        let inserted = self.source.borrow_mut().insert_row(values);
        let row = match inserted {
            Ok(row) => RowHandle::adopt(row, &self.source),
            Err(err) => {
                self.window.restore(shape);
                self.restore_current(held);
                return Err(err.into());
            }
        };

        if let Some(codec) = self.codec {
            match self.bookmark_of(codec, &row) {
                Ok(bookmark) => self.bookmark = Some(bookmark),
                Err(err) => {
                    // The row exists at the source either way, it just cannot anchor the cursor.
                    drop(row);
                    self.window.restore(shape);
                    self.restore_current(held);
                    return Err(err);
                }
            }
        }

        // Later moves continue from the new row as if it had just been fetched forward.
        self.window.restore(WindowShape {
            direction: WindowDirection::Forward,
            fetched: 1,
            position: 1,
        });
        self.restart_pending = false;
        self.reanchor_pending = false;
        self.end_of_rows = None;
        let id = row.id();
        self.current = CurrentRow::Detached(row);
        self.bof = false;
        self.eof = false;
        self.positioned = true;
        drop(held);
        debug!(row = %id, "row added");
        Ok(id)
    }

    fn ensure_positioned(&mut self) -> Result<(), CursorError> {
        if !self.positioned {
            trace!("first access, positioning on the first row");
            self.advance(FetchDirection::Forward)?;
            self.positioned = true;
        }
        Ok(())
    }

    fn current_id(&mut self) -> Result<RowId, CursorError> {
        self.ensure_positioned()?;
        self.current_handle()
            .map(RowHandle::id)
            .ok_or(CursorError::NoCurrentRecord)
    }

    fn current_handle(&self) -> Option<&RowHandle> {
        match &self.current {
            CurrentRow::None => None,
            CurrentRow::Window(index) => self.window.row(*index),
            CurrentRow::Detached(handle) => Some(handle),
        }
    }

    fn select(&mut self, index: usize) {
        self.current = CurrentRow::Window(index);
        self.bof = false;
        self.eof = false;
    }

    fn reposition(
        &mut self,
        direction: FetchDirection,
        target: Option<Bookmark>,
    ) -> Result<(), CursorError> {
        let address = match (&self.bookmark, target) {
            (None, _) => FetchAddress::Sequential {
                offset: 0,
                restart: true,
            },
            (Some(_), Some(bookmark)) => FetchAddress::AtBookmark {
                bookmark,
                offset: 0,
            },
            (Some(_), None) => FetchAddress::AtBookmark {
                bookmark: origin_bookmark(direction),
                offset: 0,
            },
        };
        self.refill(direction, address)?;
        self.positioned = true;
        Ok(())
    }

    fn origin_address(&self, direction: FetchDirection) -> FetchAddress {
        match &self.bookmark {
            None => FetchAddress::Sequential {
                offset: 0,
                restart: self.restart_pending,
            },
            Some(bookmark) if bookmark.is_sentinel() => FetchAddress::AtBookmark {
                bookmark: origin_bookmark(direction),
                offset: 0,
            },
            Some(bookmark) => FetchAddress::AtBookmark {
                bookmark: bookmark.clone(),
                offset: 0,
            },
        }
    }

    /// Address of the batch adjoining the window in `direction`.
    ///
    /// A sequential source sits just past the window's far edge, a bookmark fetch starts at (and
    /// includes) the far edge row, hence the different continuation offsets. Reversing lands on
    /// the row before the current one in both modes.
    fn refill_address(
        &self,
        direction: FetchDirection,
        window_direction: FetchDirection,
    ) -> FetchAddress {
        let sign = window_direction.sign();
        let remaining = self.window.remaining() as i64;
        let reversing = direction != window_direction;
        match &self.bookmark {
            None => FetchAddress::Sequential {
                offset: if reversing {
                    -sign * (remaining + 1)
                } else {
                    -sign * remaining
                },
                restart: false,
            },
            Some(bookmark) => FetchAddress::AtBookmark {
                bookmark: bookmark.clone(),
                offset: if reversing {
                    -sign * (remaining + 1)
                } else {
                    sign * (1 - remaining)
                },
            },
        }
    }

    /// Takes a reference of its own on the current row so it outlives the window.
    fn detach_current(&mut self) -> Result<Option<RowHandle>, CursorError> {
        match mem::take(&mut self.current) {
            CurrentRow::None => Ok(None),
            CurrentRow::Detached(handle) => Ok(Some(handle)),
            CurrentRow::Window(index) => {
                let cloned = self.window.row(index).map(RowHandle::clone_ref).transpose();
                match cloned {
                    Ok(handle) => Ok(handle),
                    Err(err) => {
                        self.current = CurrentRow::Window(index);
                        Err(err.into())
                    }
                }
            }
        }
    }

    #[instrument(parent = None, skip(self), ret, level = "trace")]
    /// Walks a restarted sequential source forward until it meets the current row again and
    /// makes the batch holding it the window, so relative moves continue from that row.
    fn reanchor(&mut self) -> Result<(), CursorError> {
        let Some(target) = self.current_handle().map(RowHandle::id) else {
            self.reanchor_pending = false;
            return Ok(());
        };
        let count = i64::from(self.cache_size.get());

        self.source.borrow_mut().restart()?;
        self.restart_pending = false;
        loop {
            let fetched = self.source.borrow_mut().fetch_sequential(0, count)?;
            let rows: Vec<RowHandle> = fetched
                .rows
                .iter()
                .map(|&id| RowHandle::adopt(id, &self.source))
                .collect();

            let Some(index) = rows.iter().position(|row| row.id() == target) else {
                if rows.is_empty() || fetched.end_of_rows {
                    return Err(SourceError::UnknownRow(target).into());
                }
                continue;
            };

            self.window.fill(FetchDirection::Forward, rows);
            while self.window.position() <= index {
                self.window.take_next();
            }
            self.end_of_rows = fetched.end_of_rows.then_some(FetchDirection::Forward);
            // The window now holds the row, the detached reference can go.
            self.current = CurrentRow::Window(index);
            self.reanchor_pending = false;
            debug!(row = %target, "re-anchored on current row");
            return Ok(());
        }
    }

    fn restore_current(&mut self, held: Option<RowHandle>) {
        self.current = held.map_or(CurrentRow::None, CurrentRow::Detached);
    }

    fn bookmark_of(&self, codec: BookmarkCodec, row: &RowHandle) -> Result<Bookmark, CursorError> {
        let raw = self.source.borrow_mut().get_bookmark(row.id())?;
        Ok(codec.encode(&raw)?)
    }

    fn fetch(
        &mut self,
        address: &FetchAddress,
        raw_bookmark: Option<&RawBookmark>,
        count: i64,
    ) -> Result<FetchedRows, CursorError> {
        let mut source = self.source.borrow_mut();
        match (address, raw_bookmark) {
            (FetchAddress::AtBookmark { offset, .. }, Some(raw)) => {
                Ok(source.fetch_at_bookmark(raw, *offset, count)?)
            }
            (FetchAddress::Sequential { offset, restart }, _) => {
                if *restart {
                    source.restart()?;
                    self.restart_pending = false;
                    trace!("row source restarted");
                }
                Ok(source.fetch_sequential(*offset, count)?)
            }
            (FetchAddress::AtBookmark { .. }, None) => Err(CursorError::InvalidBookmark(
                "bookmark fetch without a bookmark".to_string(),
            )),
        }
    }

    #[instrument(parent = None, skip(self), ret, level = "trace")]
    /// Replaces the window with a batch fetched at `address`.
    ///
    /// The current row is handed off to a reference of its own before the old window is
    /// released. If anything fails after that, the handed-off reference becomes the current row
    /// again and the old window shape is put back, so the cursor stays where it was.
    fn refill(&mut self, direction: FetchDirection, address: FetchAddress) -> Result<(), CursorError> {
        let cache_size = self.cache_size.get();
        let count = i64::from(cache_size) * direction.sign();
        let mut rows = Vec::new();
        rows.try_reserve_exact(cache_size as usize)
            .map_err(|_| CursorError::OutOfMemory)?;

        let raw_bookmark = match &address {
            FetchAddress::AtBookmark { bookmark, .. } => {
                let codec = self.codec.ok_or_else(|| {
                    CursorError::InvalidBookmark(SourceError::BookmarksUnsupported.to_string())
                })?;
                Some(codec.decode(bookmark)?)
            }
            FetchAddress::Sequential { .. } => None,
        };
        let restarting = matches!(address, FetchAddress::Sequential { restart: true, .. });

        let held = self.detach_current()?;
        if restarting {
            // Cleared once the source has actually been restarted.
            self.restart_pending = true;
        }
        let shape = self.window.release();
        debug!(?address, count, "fetching from row source");

        let fetched = match self.fetch(&address, raw_bookmark.as_ref(), count) {
            Ok(fetched) => fetched,
            Err(err) => {
                debug!(%err, "fetch failed, restoring current row");
                if restarting && !self.restart_pending {
                    // The source went back to its origin, the old shape no longer matches it.
                    self.window.reset();
                    self.end_of_rows = None;
                    self.reanchor_pending = held.is_some();
                } else {
                    self.window.restore(shape);
                }
                self.restore_current(held);
                return Err(err);
            }
        };

        if fetched.rows.is_empty() {
            self.hit_boundary(direction, held.is_some());
            drop(held);
            return Ok(());
        }

        rows.extend(
            fetched
                .rows
                .iter()
                .map(|&id| RowHandle::adopt(id, &self.source)),
        );
        trace!(
            fetched = rows.len(),
            end_of_rows = fetched.end_of_rows,
            "rows fetched"
        );

        if let Some(codec) = self.codec {
            let last = rows.last().map(|row| self.bookmark_of(codec, row));
            match last {
                Some(Ok(bookmark)) => self.bookmark = Some(bookmark),
                Some(Err(err)) => {
                    drop(rows);
                    self.window.restore(shape);
                    self.restore_current(held);
                    return Err(err);
                }
                None => {}
            }
        }

        self.window.fill(direction, rows);
        self.end_of_rows = fetched.end_of_rows.then_some(direction);
        self.reanchor_pending = false;
        if let Some(index) = self.window.take_next() {
            self.select(index);
        }
        // The window now supplies the current row, the handed-off reference can go.
        drop(held);
        Ok(())
    }

    /// The cursor ran off the end it was moving toward.
    fn hit_boundary(&mut self, direction: FetchDirection, had_current: bool) {
        match direction {
            FetchDirection::Forward => {
                self.eof = true;
                self.bof = !had_current;
            }
            FetchDirection::Backward => {
                self.bof = true;
                self.eof = !had_current;
            }
        }
        self.current = CurrentRow::None;
        self.window.reset();
        self.end_of_rows = None;
        self.reanchor_pending = false;
        match self.bookmark {
            Some(_) => self.bookmark = Some(origin_bookmark(direction.reverse())),
            None => self.restart_pending = true,
        }
        debug!(bof = self.bof, eof = self.eof, "reached end of rows");
    }
}

/// Sentinel a fetch in `direction` starts from when no real bookmark is at hand.
fn origin_bookmark(direction: FetchDirection) -> Bookmark {
    match direction {
        FetchDirection::Forward => Bookmark::BeforeFirst,
        FetchDirection::Backward => Bookmark::AfterLast,
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let current = match self.current_handle() {
            Some(handle) => handle.id().to_string(),
            None => "none".to_string(),
        };
        write!(
            f,
            "Cursor: [BOF {}], [EOF {}], [Current row {}], [Window {:?} {}/{}], [Cache size {}]",
            self.bof,
            self.eof,
            current,
            self.window.direction(),
            self.window.position(),
            self.window.fetched(),
            self.cache_size
        )
    }
}
