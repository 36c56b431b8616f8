use std::cell::{Ref, RefCell};
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};

use super::bookmark::BookmarkKind;
use super::cursor::{Cursor, CursorOptions};
use super::memory_table::{MemoryTable, TableError};
use super::row_handle::SharedRowSource;

const DEMO_TABLE_NAME: &str = "demo";

/// An open session: one in-memory table and the cursor walking it.
pub struct Database {
    table: Rc<RefCell<MemoryTable>>,
    cursor: Cursor,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Could not build table. The following error occurred: {0}")]
    TableBuildError(#[from] TableError),
}

impl Database {
    pub fn open(
        num_rows: usize,
        bookmark_kind: Option<BookmarkKind>,
        options: CursorOptions,
    ) -> Result<Self, DatabaseError> {
        let table = Rc::new(RefCell::new(MemoryTable::with_demo_rows(
            DEMO_TABLE_NAME,
            num_rows,
            bookmark_kind,
        )?));
        let source: SharedRowSource = table.clone();
        let cursor = Cursor::open(source, options);
        debug!(num_rows, ?bookmark_kind, "database opened");

        Ok(Self { table, cursor })
    }

    pub fn close(self) {
        let Self { table, cursor } = self;
        cursor.close();
        let outstanding = table.borrow().outstanding_refs();
        if outstanding != 0 {
            warn!(
                table = %table.borrow().name,
                outstanding, "row references outstanding after close"
            );
        }
    }

    pub fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    pub fn table(&self) -> Ref<'_, MemoryTable> {
        self.table.borrow()
    }
}
