use super::current_row_table;
use super::vm_error::VMError;
use crate::backend::bookmark::BookmarkCodec;
use crate::backend::database::Database;
use crate::backend::row_source::RowSource;

/// Seeks to the bookmark of the `row_number`-th row of the table, counted from 1.
pub(super) fn process_seek(row_number: u64, database: &mut Database) -> Result<(), VMError> {
    let bookmark = {
        let table = database.table();
        let kind = table.bookmark_kind().ok_or(VMError::BookmarksUnsupported)?;
        let raw = row_number
            .checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| table.bookmark_at(index))
            .ok_or(VMError::NoSuchRow(row_number))?;
        BookmarkCodec::new(kind).encode(&raw)?
    };

    let cursor = database.cursor();
    cursor.seek(&bookmark)?;
    println!("{}", current_row_table(cursor)?);
    Ok(())
}
