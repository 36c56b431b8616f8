use super::vm_error::VMError;
use crate::backend::columns::{ColumnType, Columns};
use crate::backend::database::Database;
use crate::backend::row::FieldValue;
use crate::command_compiler::{InsertTokens, InsertValue};

fn parse_values(
    columns: &Columns,
    column_values: &[InsertValue],
) -> Result<Vec<FieldValue>, VMError> {
    if columns.len() != column_values.len() {
        return Err(VMError::ColumnCountMismatch(
            columns.len(),
            column_values.len(),
        ));
    }

    columns
        .iter()
        .zip(column_values)
        .map(|((_, column_type), value)| match value {
            InsertValue::Null => Ok(FieldValue::Null),
            InsertValue::Number(input) | InsertValue::Quoted(input) => column_type
                .validate(input)
                .ok_or_else(|| VMError::ItemParsingError(input.to_string())),
        })
        .collect()
}

pub(super) fn process_insert(
    insert_tokens: InsertTokens,
    database: &mut Database,
) -> Result<(), VMError> {
    let InsertTokens { column_values } = insert_tokens;

    let cursor = database.cursor();
    let values = parse_values(&cursor.columns(), &column_values)?;
    let row = cursor.add_new(values)?;
    println!("Inserted row {}", row);

    Ok(())
}
