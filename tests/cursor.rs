use std::cell::RefCell;
use std::num::NonZeroU32;
use std::rc::Rc;

use cursor_rs::backend::columns::Columns;
use cursor_rs::backend::memory_table::MemoryTable;
use cursor_rs::backend::row::FieldValue;
use cursor_rs::{
    Bookmark, BookmarkCodec, BookmarkKind, Cursor, CursorError, CursorOptions, FetchedRows,
    RawBookmark, RowId, RowSource, SharedRowSource, SourceError,
};

/// Memory table that counts fetches, can refuse the next one and panics past a fetch budget.
struct Scripted {
    table: MemoryTable,
    fetches: usize,
    fetch_limit: Option<usize>,
    fail_next_fetch: bool,
}

impl Scripted {
    fn new(num_rows: usize, bookmark_kind: Option<BookmarkKind>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            table: MemoryTable::with_demo_rows("scripted", num_rows, bookmark_kind).unwrap(),
            fetches: 0,
            fetch_limit: None,
            fail_next_fetch: false,
        }))
    }

    fn count_fetch(&mut self) -> Result<(), SourceError> {
        if self.fail_next_fetch {
            self.fail_next_fetch = false;
            return Err(SourceError::Unavailable("connection lost".to_string()));
        }
        self.fetches += 1;
        if let Some(limit) = self.fetch_limit {
            assert!(self.fetches <= limit, "unexpected fetch #{}", self.fetches);
        }
        Ok(())
    }
}

impl RowSource for Scripted {
    fn bookmark_kind(&self) -> Option<BookmarkKind> {
        self.table.bookmark_kind()
    }

    fn fetch_sequential(&mut self, offset: i64, count: i64) -> Result<FetchedRows, SourceError> {
        self.count_fetch()?;
        self.table.fetch_sequential(offset, count)
    }

    fn fetch_at_bookmark(
        &mut self,
        bookmark: &RawBookmark,
        offset: i64,
        count: i64,
    ) -> Result<FetchedRows, SourceError> {
        self.count_fetch()?;
        self.table.fetch_at_bookmark(bookmark, offset, count)
    }

    fn get_bookmark(&mut self, row: RowId) -> Result<RawBookmark, SourceError> {
        self.table.get_bookmark(row)
    }

    fn add_ref(&mut self, row: RowId) -> Result<(), SourceError> {
        self.table.add_ref(row)
    }

    fn release(&mut self, rows: &[RowId]) -> Result<(), SourceError> {
        self.table.release(rows)
    }

    fn restart(&mut self) -> Result<(), SourceError> {
        self.table.restart()
    }

    fn columns(&self) -> Columns {
        self.table.columns()
    }

    fn get_data(&mut self, row: RowId, column: usize) -> Result<FieldValue, SourceError> {
        self.table.get_data(row, column)
    }

    fn insert_row(&mut self, values: Vec<FieldValue>) -> Result<RowId, SourceError> {
        self.table.insert_row(values)
    }
}

fn open(source: &Rc<RefCell<Scripted>>, cache_size: u32) -> Cursor {
    let shared: SharedRowSource = source.clone();
    let options =
        CursorOptions::default().with_cache_size(NonZeroU32::new(cache_size).unwrap());
    Cursor::open(shared, options)
}

fn assert_all_released(source: &Rc<RefCell<Scripted>>) {
    let source = source.borrow();
    let stats = source.table.stats();
    assert_eq!(source.table.outstanding_refs(), 0);
    assert_eq!(
        stats.releases,
        stats.rows_fetched + stats.add_refs + stats.inserts
    );
}

fn demo_values(id: i32) -> Vec<FieldValue> {
    vec![FieldValue::Integer(id), FieldValue::Text(format!("row {}", id))]
}

#[test]
fn empty_source_sets_both_flags_after_one_fetch() {
    for kind in [None, Some(BookmarkKind::Fixed4)] {
        let source = Scripted::new(0, kind);
        let mut cursor = open(&source, 4);

        assert!(cursor.at_bof().unwrap());
        assert!(cursor.at_eof().unwrap());
        assert_eq!(cursor.current_row().unwrap(), None);
        assert!(matches!(cursor.move_next(), Err(CursorError::NoCurrentRecord)));
        assert!(matches!(
            cursor.move_previous(),
            Err(CursorError::NoCurrentRecord)
        ));
        assert_eq!(source.borrow().fetches, 1);

        cursor.close();
        assert_all_released(&source);
    }
}

#[test]
fn open_does_not_fetch() {
    let source = Scripted::new(3, None);
    let cursor = open(&source, 2);
    assert_eq!(source.borrow().fetches, 0);
    assert_eq!(cursor.state().current, None);
    cursor.close();
}

#[test]
fn single_row_cache_visits_every_row_both_ways() {
    let source = Scripted::new(10, None);
    let mut cursor = open(&source, 1);

    assert_eq!(cursor.current_row().unwrap(), Some(RowId(1)));
    for id in 2..=10 {
        cursor.move_next().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(id)));
    }
    cursor.move_next().unwrap();
    assert!(cursor.at_eof().unwrap());
    assert!(!cursor.at_bof().unwrap());
    assert_eq!(cursor.current_row().unwrap(), None);

    for id in (1..=10).rev() {
        cursor.move_previous().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(id)));
    }
    cursor.move_previous().unwrap();
    assert!(cursor.at_bof().unwrap());
    assert!(!cursor.at_eof().unwrap());

    cursor.close();
    assert_all_released(&source);
}

#[test]
fn moving_past_a_reached_boundary_fails_without_fetching() {
    let source = Scripted::new(2, Some(BookmarkKind::Fixed8));
    let mut cursor = open(&source, 2);

    cursor.move_last().unwrap();
    cursor.move_next().unwrap();
    assert!(cursor.at_eof().unwrap());
    let fetches = source.borrow().fetches;
    let state = cursor.state();

    for _ in 0..3 {
        assert!(matches!(cursor.move_next(), Err(CursorError::NoCurrentRecord)));
        assert!(matches!(cursor.field(0), Err(CursorError::NoCurrentRecord)));
    }
    assert_eq!(source.borrow().fetches, fetches);
    assert_eq!(cursor.state(), state);

    cursor.move_previous().unwrap();
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(2)));
    cursor.close();
    assert_all_released(&source);
}

#[test]
fn one_prefetch_serves_forward_and_backward_moves() {
    let source = Scripted::new(10, None);
    let mut cursor = open(&source, 5);
    source.borrow_mut().fetch_limit = Some(1);

    cursor.move_first().unwrap();
    for id in 2..=5 {
        cursor.move_next().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(id)));
    }
    for id in (2..=4).rev() {
        cursor.move_previous().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(id)));
    }
    assert_eq!(source.borrow().fetches, 1);

    cursor.close();
    assert_all_released(&source);
}

#[test]
fn reversal_at_window_edge_neither_skips_nor_repeats() {
    for kind in [None, Some(BookmarkKind::Fixed4)] {
        let source = Scripted::new(10, kind);
        let mut cursor = open(&source, 3);

        cursor.move_last().unwrap();
        let mut visited = vec![cursor.current_row().unwrap()];
        for _ in 0..5 {
            cursor.move_previous().unwrap();
            visited.push(cursor.current_row().unwrap());
        }
        for _ in 0..6 {
            cursor.move_next().unwrap();
            visited.push(cursor.current_row().unwrap());
        }

        let expected: Vec<_> = [10, 9, 8, 7, 6, 5, 6, 7, 8, 9, 10]
            .into_iter()
            .map(|id| Some(RowId(id)))
            .chain([None])
            .collect();
        assert_eq!(visited, expected);
        assert!(cursor.at_eof().unwrap());
        assert!(matches!(cursor.move_next(), Err(CursorError::NoCurrentRecord)));

        cursor.close();
        assert_all_released(&source);
    }
}

#[test]
fn seek_then_step_away_and_back_returns_to_the_bookmarked_row() {
    for cache_size in [1, 3] {
        let source = Scripted::new(10, Some(BookmarkKind::Fixed4));
        let mut cursor = open(&source, cache_size);

        let raw = source.borrow().table.bookmark_at(5).unwrap();
        let bookmark = BookmarkCodec::new(BookmarkKind::Fixed4).encode(&raw).unwrap();
        assert_eq!(bookmark, Bookmark::Numeric32(6));

        cursor.seek(&bookmark).unwrap();
        assert_eq!(cursor.field(0).unwrap(), FieldValue::Integer(5));
        cursor.move_next().unwrap();
        assert_eq!(cursor.field(0).unwrap(), FieldValue::Integer(6));
        cursor.move_previous().unwrap();
        assert_eq!(cursor.field(0).unwrap(), FieldValue::Integer(5));
        assert_eq!(cursor.bookmark().unwrap(), bookmark);

        cursor.close();
        assert_all_released(&source);
    }
}

#[test]
fn variable_bookmarks_round_trip_through_seek() {
    let source = Scripted::new(5, Some(BookmarkKind::Variable));
    let mut cursor = open(&source, 2);

    cursor.move_last().unwrap();
    let bookmark = cursor.bookmark().unwrap();
    assert!(matches!(bookmark, Bookmark::Opaque(_)));

    cursor.move_first().unwrap();
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(1)));
    cursor.seek(&bookmark).unwrap();
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(5)));
    assert!(matches!(
        cursor.seek(&Bookmark::Numeric64(1)),
        Err(CursorError::InvalidBookmark(_))
    ));
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(5)));

    cursor.close();
    assert_all_released(&source);
}

#[test]
fn seek_on_sequential_source_is_an_invalid_bookmark() {
    let source = Scripted::new(3, None);
    let mut cursor = open(&source, 1);

    assert!(!cursor.supports_bookmarks());
    assert!(matches!(
        cursor.seek(&Bookmark::Numeric32(1)),
        Err(CursorError::InvalidBookmark(_))
    ));
    assert!(matches!(
        cursor.bookmark(),
        Err(CursorError::InvalidBookmark(_))
    ));
    assert_eq!(source.borrow().fetches, 1);
    cursor.close();
    assert_all_released(&source);
}

#[test]
fn failed_refill_keeps_the_current_row() {
    for kind in [None, Some(BookmarkKind::Fixed4)] {
        let source = Scripted::new(6, kind);
        let mut cursor = open(&source, 2);

        cursor.move_first().unwrap();
        cursor.move_next().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(2)));

        source.borrow_mut().fail_next_fetch = true;
        assert!(matches!(
            cursor.move_next(),
            Err(CursorError::SourceUnavailable(SourceError::Unavailable(_)))
        ));
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(2)));
        assert_eq!(cursor.field(1).unwrap(), FieldValue::Text("row 1".to_string()));
        assert!(!cursor.at_bof().unwrap() && !cursor.at_eof().unwrap());

        cursor.move_next().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));
        cursor.move_previous().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(2)));

        cursor.close();
        assert_all_released(&source);
    }
}

#[test]
fn failed_reversal_then_retry_lands_on_the_previous_row() {
    let source = Scripted::new(6, None);
    let mut cursor = open(&source, 2);

    cursor.move_first().unwrap();
    cursor.move_next().unwrap();
    cursor.move_next().unwrap();
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));

    source.borrow_mut().fail_next_fetch = true;
    assert!(cursor.move_previous().is_err());
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));

    cursor.move_previous().unwrap();
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(2)));
    cursor.close();
    assert_all_released(&source);
}

#[test]
fn added_row_becomes_current_and_traversal_continues_from_it() {
    for kind in [None, Some(BookmarkKind::Fixed8)] {
        let source = Scripted::new(3, kind);
        let mut cursor = open(&source, 2);

        cursor.move_first().unwrap();
        let row = cursor.add_new(demo_values(42)).unwrap();
        assert_eq!(row, RowId(4));
        assert_eq!(cursor.current_row().unwrap(), Some(row));
        assert_eq!(cursor.field(0).unwrap(), FieldValue::Integer(42));
        if kind.is_some() {
            assert_eq!(cursor.bookmark().unwrap(), Bookmark::Numeric64(4));
        }

        cursor.move_previous().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));
        cursor.move_next().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(4)));
        cursor.move_next().unwrap();
        assert!(cursor.at_eof().unwrap());

        cursor.close();
        assert_all_released(&source);
    }
}

#[test]
fn rejected_insert_leaves_cursor_in_place() {
    let source = Scripted::new(3, None);
    let mut cursor = open(&source, 3);

    cursor.move_first().unwrap();
    cursor.move_next().unwrap();
    assert!(matches!(
        cursor.add_new(vec![FieldValue::Null]),
        Err(CursorError::SourceUnavailable(SourceError::InsertRejected(_)))
    ));
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(2)));
    cursor.move_next().unwrap();
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));

    cursor.close();
    assert_all_released(&source);
}

#[test]
fn cache_size_change_applies_to_the_next_refill() {
    let source = Scripted::new(10, None);
    let mut cursor = open(&source, 2);

    cursor.move_first().unwrap();
    cursor.set_cache_size(NonZeroU32::new(4).unwrap());
    assert_eq!(cursor.window().fetched(), 2);

    cursor.move_next().unwrap();
    assert_eq!(source.borrow().fetches, 1);
    cursor.move_next().unwrap();
    assert_eq!(source.borrow().fetches, 2);
    assert_eq!(cursor.window().fetched(), 4);
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));

    cursor.close();
    assert_all_released(&source);
}

#[test]
fn dropping_the_cursor_releases_every_row() {
    let source = Scripted::new(8, Some(BookmarkKind::Fixed4));
    {
        let mut cursor = open(&source, 3);
        cursor.move_last().unwrap();
        cursor.move_previous().unwrap();
        cursor.add_new(demo_values(8)).unwrap();
        assert!(source.borrow().table.outstanding_refs() > 0);
    }
    assert_all_released(&source);
}

#[test]
fn failed_reposition_after_restart_resumes_next_to_the_current_row() {
    for cache_size in [1, 2, 4] {
        let source = Scripted::new(6, None);
        let mut cursor = open(&source, cache_size);

        cursor.move_first().unwrap();
        cursor.move_next().unwrap();
        cursor.move_next().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));

        source.borrow_mut().fail_next_fetch = true;
        assert!(matches!(
            cursor.move_first(),
            Err(CursorError::SourceUnavailable(_))
        ));
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));

        cursor.move_next().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(4)));
        cursor.move_previous().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));

        source.borrow_mut().fail_next_fetch = true;
        assert!(cursor.move_last().is_err());
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(3)));
        cursor.move_previous().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(2)));

        cursor.close();
        assert_all_released(&source);
    }
}

#[test]
fn failed_resume_after_failed_reposition_can_be_retried() {
    let source = Scripted::new(6, None);
    let mut cursor = open(&source, 2);

    cursor.move_last().unwrap();
    cursor.move_previous().unwrap();
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(5)));

    source.borrow_mut().fail_next_fetch = true;
    assert!(cursor.move_first().is_err());
    source.borrow_mut().fail_next_fetch = true;
    assert!(cursor.move_next().is_err());
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(5)));

    cursor.move_next().unwrap();
    assert_eq!(cursor.current_row().unwrap(), Some(RowId(6)));
    cursor.move_next().unwrap();
    assert!(cursor.at_eof().unwrap());

    cursor.close();
    assert_all_released(&source);
}

#[test]
fn short_final_batch_ends_traversal_without_another_fetch() {
    for kind in [None, Some(BookmarkKind::Fixed4)] {
        let source = Scripted::new(5, kind);
        let mut cursor = open(&source, 3);

        cursor.move_first().unwrap();
        for _ in 0..4 {
            cursor.move_next().unwrap();
        }
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(5)));
        assert_eq!(source.borrow().fetches, 2);
        cursor.move_next().unwrap();
        assert!(cursor.at_eof().unwrap());
        assert_eq!(source.borrow().fetches, 2);

        cursor.move_last().unwrap();
        for _ in 0..4 {
            cursor.move_previous().unwrap();
        }
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(1)));
        assert_eq!(source.borrow().fetches, 4);
        cursor.move_previous().unwrap();
        assert!(cursor.at_bof().unwrap());
        assert_eq!(source.borrow().fetches, 4);

        cursor.move_next().unwrap();
        assert_eq!(cursor.current_row().unwrap(), Some(RowId(1)));

        cursor.close();
        assert_all_released(&source);
    }
}
