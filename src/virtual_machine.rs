use tabled::builder::Builder;
use tabled::Table;

use crate::backend::cursor::Cursor;
use crate::backend::database::Database;
use crate::command_compiler::Statement;

mod insert;
mod movement;
mod seek;
mod select;
mod vm_error;

pub use vm_error::VMError;

/// Renders the current row as a one-row table headed by the column names.
fn current_row_table(cursor: &mut Cursor) -> Result<Table, VMError> {
    let row = cursor.current_row()?.ok_or(VMError::NoCurrentRow)?;
    let values = cursor.fields()?;

    let mut builder = Builder::default();
    let mut header = vec!["rowid".to_string()];
    header.extend(cursor.columns().to_printable());
    builder.push_record(header);

    let mut record = vec![row.to_string()];
    record.extend(values.iter().map(|value| value.to_string()));
    builder.push_record(record);

    Ok(builder.build())
}

pub fn execute_statement(
    statement: Statement,
    db_instance: Option<&mut Database>,
) -> Result<(), VMError> {
    let open_database = db_instance.ok_or(VMError::DBClosed)?;

    match statement {
        Statement::Move(target) => movement::process_move(target, open_database),
        Statement::Seek(row_number) => seek::process_seek(row_number, open_database),
        Statement::Cache(cache_size) => movement::process_cache(cache_size, open_database),
        Statement::Insert(insert_tokens) => insert::process_insert(insert_tokens, open_database),
        Statement::Select => select::process_select(open_database),
        Statement::Bookmark => select::process_bookmark(open_database),
    }
}
