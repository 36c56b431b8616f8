use std::num::NonZeroU32;

use super::current_row_table;
use super::vm_error::VMError;
use crate::backend::database::Database;
use crate::command_compiler::MoveTarget;

pub(super) fn process_move(target: MoveTarget, database: &mut Database) -> Result<(), VMError> {
    let cursor = database.cursor();
    match target {
        MoveTarget::First => cursor.move_first()?,
        MoveTarget::Last => cursor.move_last()?,
        MoveTarget::Next => cursor.move_next()?,
        MoveTarget::Previous => cursor.move_previous()?,
    }

    match cursor.current_row()? {
        Some(_) => println!("{}", current_row_table(cursor)?),
        None if cursor.at_eof()? => println!("EOF"),
        None => println!("BOF"),
    }
    Ok(())
}

pub(super) fn process_cache(cache_size: NonZeroU32, database: &mut Database) -> Result<(), VMError> {
    database.cursor().set_cache_size(cache_size);
    println!("Cache size set to {}", cache_size);
    Ok(())
}
