use std::num::NonZeroU32;
use std::str::FromStr;

use tabled::Table;
use thiserror::Error;

use crate::backend::bookmark::BookmarkKind;
use crate::backend::cursor::CursorOptions;
use crate::backend::database::Database;

const SUCCESS: i32 = 0;
const DEFAULT_DEMO_ROWS: usize = 20;

enum Metacommand {
    Close,
    Exit,
    Open,
    Stats,
    Window,
}

#[derive(Error, Debug)]
pub enum MetacommandErr {
    #[error("No database open.")]
    DBClosed,
    #[error("Extra argument: {0}")]
    ExtraArgument(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not a metacommand")]
    NotAMetacommand,
    #[error("Cannot open database. Encountered the following error: {0}")]
    OpenDBError(String),
    #[error("Cannot print cache window: {0}")]
    PrintError(#[from] std::io::Error),
    #[error("Unrecognized Metacommand: {0}")]
    UnrecognizedMetacommand(String),
}

fn parse_bookmark_kind(arg: &str) -> Result<Option<BookmarkKind>, MetacommandErr> {
    match arg {
        "none" => Ok(None),
        "fixed4" => Ok(Some(BookmarkKind::Fixed4)),
        "fixed8" => Ok(Some(BookmarkKind::Fixed8)),
        "variable" => Ok(Some(BookmarkKind::Variable)),
        _ => Err(MetacommandErr::InvalidArgument(arg.to_string())),
    }
}

fn close_metacommand(db_instance: &mut Option<Database>) -> Result<(), MetacommandErr> {
    match db_instance.take() {
        Some(db) => {
            db.close();
            Ok(())
        }
        None => Err(MetacommandErr::DBClosed),
    }
}

fn exit_metacommand(db_instance: &mut Option<Database>) -> ! {
    let _ = close_metacommand(db_instance);
    std::process::exit(SUCCESS)
}

/// `.open [rows] [none|fixed4|fixed8|variable] [cache]`
pub fn open_metacommand(
    db_instance: &mut Option<Database>,
    args: &[&str],
) -> Result<(), MetacommandErr> {
    if args.len() > 3 {
        return Err(MetacommandErr::ExtraArgument(args[3].to_string()));
    }

    let num_rows = match args.first() {
        Some(arg) => arg
            .parse::<usize>()
            .map_err(|_| MetacommandErr::InvalidArgument(arg.to_string()))?,
        None => DEFAULT_DEMO_ROWS,
    };
    let bookmark_kind = match args.get(1) {
        Some(arg) => parse_bookmark_kind(arg)?,
        None => None,
    };
    let mut options = CursorOptions::default();
    if let Some(arg) = args.get(2) {
        let cache_size = arg
            .parse::<NonZeroU32>()
            .map_err(|_| MetacommandErr::InvalidArgument(arg.to_string()))?;
        options = options.with_cache_size(cache_size);
    }

    let _ = close_metacommand(db_instance);

    *db_instance = Some(
        Database::open(num_rows, bookmark_kind, options)
            .map_err(|err| MetacommandErr::OpenDBError(err.to_string()))?,
    );

    Ok(())
}

fn window_metacommand(db_instance: &mut Option<Database>) -> Result<(), MetacommandErr> {
    let db = db_instance.as_mut().ok_or(MetacommandErr::DBClosed)?;
    println!("{}", db.cursor());
    db.cursor().window().print_tree()?;
    Ok(())
}

fn stats_metacommand(db_instance: &mut Option<Database>) -> Result<(), MetacommandErr> {
    let db = db_instance.as_ref().ok_or(MetacommandErr::DBClosed)?;
    let table = db.table();
    println!("{}", Table::new([table.stats()]));
    println!(
        "Rows: {}. Outstanding row references: {}",
        table.len(),
        table.outstanding_refs()
    );
    Ok(())
}

impl FromStr for Metacommand {
    type Err = MetacommandErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('.').ok_or(MetacommandErr::NotAMetacommand)? {
            "close" => Ok(Metacommand::Close),
            "exit" => Ok(Metacommand::Exit),
            "open" => Ok(Metacommand::Open),
            "stats" => Ok(Metacommand::Stats),
            "window" => Ok(Metacommand::Window),
            _ => Err(MetacommandErr::UnrecognizedMetacommand(s.to_string())),
        }
    }
}

pub fn process_metacommand(
    input_str: &str,
    db_instance: &mut Option<Database>,
) -> Result<(), MetacommandErr> {
    let tokens: Vec<_> = input_str.split_whitespace().collect();

    let (metacommand_str, args) = tokens
        .split_first()
        .ok_or(MetacommandErr::NotAMetacommand)?;
    let metacommand = Metacommand::from_str(metacommand_str)?;

    let no_args = || match args.first() {
        Some(arg) => Err(MetacommandErr::ExtraArgument(arg.to_string())),
        None => Ok(()),
    };

    match metacommand {
        Metacommand::Close => no_args().and_then(|_| close_metacommand(db_instance)),
        Metacommand::Exit => exit_metacommand(db_instance),
        Metacommand::Open => open_metacommand(db_instance, args),
        Metacommand::Stats => no_args().and_then(|_| stats_metacommand(db_instance)),
        Metacommand::Window => no_args().and_then(|_| window_metacommand(db_instance)),
    }
}
