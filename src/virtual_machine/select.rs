use super::current_row_table;
use super::vm_error::VMError;
use crate::backend::database::Database;

pub(super) fn process_select(database: &mut Database) -> Result<(), VMError> {
    let cursor = database.cursor();
    if cursor.current_row()?.is_none() {
        println!("{}", cursor);
        return Ok(());
    }
    println!("{}", current_row_table(cursor)?);
    Ok(())
}

pub(super) fn process_bookmark(database: &mut Database) -> Result<(), VMError> {
    let bookmark = database.cursor().bookmark()?;
    println!("Bookmark: {}", bookmark);
    Ok(())
}
