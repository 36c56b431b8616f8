use dialoguer::{BasicHistory, Input};
use tracing_subscriber::EnvFilter;

use cursor_rs::backend::database::Database;
use cursor_rs::command_compiler::parse_statement;
use cursor_rs::metacommand_processor::process_metacommand;
use cursor_rs::virtual_machine::execute_statement;

const PROMPT: &str = "cursor";
const HISTORY_DEPTH: usize = 64;

fn process_input(input_str: &str, db_instance: &mut Option<Database>) {
    if input_str.starts_with('.') {
        if let Err(err) = process_metacommand(input_str, db_instance) {
            println!("{}", err);
        }
        return;
    }

    match parse_statement(input_str) {
        Ok(statement) => {
            if let Err(err) = execute_statement(statement, db_instance.as_mut()) {
                println!("{}", err);
            }
        }
        Err(err) => println!("{}", err),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut history = BasicHistory::new()
        .max_entries(HISTORY_DEPTH)
        .no_duplicates(true);
    let mut db_instance: Option<Database> = None;

    loop {
        let input = Input::<String>::new()
            .with_prompt(PROMPT)
            .history_with(&mut history)
            .interact_text();

        match input {
            Ok(input_str) => process_input(input_str.trim(), &mut db_instance),
            Err(err) => {
                eprintln!("Could not read input: {}", err);
                break;
            }
        }
    }

    if let Some(db) = db_instance {
        db.close();
    }
}
