pub mod backend;
pub mod command_compiler;
pub mod metacommand_processor;
pub mod virtual_machine;

pub use backend::bookmark::{Bookmark, BookmarkCodec, BookmarkKind, RawBookmark};
pub use backend::cache_window::{CacheWindow, FetchDirection, WindowDirection};
pub use backend::cursor::{Cursor, CursorError, CursorOptions, CursorState};
pub use backend::row_handle::{RowHandle, RowId, SharedRowSource};
pub use backend::row_source::{FetchedRows, RowSource, SourceError};
