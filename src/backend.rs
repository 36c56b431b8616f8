pub mod bookmark;
pub mod cache_window;
pub mod columns;
pub mod cursor;
pub mod database;
pub mod memory_table;
pub mod row;
pub mod row_handle;
pub mod row_source;
