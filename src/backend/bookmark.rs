use std::fmt;
use std::ops::Deref;

use thiserror::Error;
use tracing::instrument;

/// Single-byte wire code a bookmark-addressed source reads as "the first row".
pub const BMK_FIRST: u8 = 0x01;
/// Single-byte wire code a bookmark-addressed source reads as "the last row".
pub const BMK_LAST: u8 = 0x02;

const FIXED4_SIZE: usize = 4;
const FIXED8_SIZE: usize = 8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BookmarkError {
    #[error("Bookmark of {found} bytes does not match the fixed width of {expected} bytes")]
    WidthMismatch { expected: usize, found: usize },
    #[error("Bookmark {0} cannot address a row source using {1:?} bookmarks")]
    KindMismatch(Bookmark, BookmarkKind),
    #[error("Variable-length bookmark collides with a reserved sentinel code")]
    SentinelCollision,
    #[error("Empty bookmark")]
    Empty,
    #[error("Could not allocate bookmark storage")]
    OutOfMemory,
}

/// Shape of the bookmark column a row source exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkKind {
    Fixed4,
    Fixed8,
    Variable,
}

/// Position marker that can re-address a row later.
///
/// The sentinels are declared first and last so the derived ordering places them outside every
/// real position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bookmark {
    BeforeFirst,
    Numeric32(u32),
    Numeric64(u64),
    Opaque(Box<[u8]>),
    AfterLast,
}

impl Bookmark {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Bookmark::BeforeFirst | Bookmark::AfterLast)
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Bookmark::BeforeFirst => write!(f, "<before first>"),
            Bookmark::Numeric32(value) => write!(f, "{}", value),
            Bookmark::Numeric64(value) => write!(f, "{}", value),
            Bookmark::Opaque(bytes) => {
                write!(f, "0x")?;
                for byte in bytes.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Bookmark::AfterLast => write!(f, "<after last>"),
        }
    }
}

/// Bookmark bytes exactly as the row source hands them out and accepts them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawBookmark(Box<[u8]>);

impl RawBookmark {
    pub fn first() -> Self {
        Self(Box::new([BMK_FIRST]))
    }

    pub fn last() -> Self {
        Self(Box::new([BMK_LAST]))
    }

    pub fn is_first(&self) -> bool {
        *self.0 == [BMK_FIRST]
    }

    pub fn is_last(&self) -> bool {
        *self.0 == [BMK_LAST]
    }
}

impl Deref for RawBookmark {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for RawBookmark {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<Vec<u8>> for RawBookmark {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

/// Converts between the source's bookmark column and [`Bookmark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookmarkCodec {
    kind: BookmarkKind,
}

impl BookmarkCodec {
    pub fn new(kind: BookmarkKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> BookmarkKind {
        self.kind
    }

    #[instrument(parent = None, skip(self), ret, level = "trace")]
    /// Reads the bookmark column of a fetched row.
    pub fn encode(&self, raw: &RawBookmark) -> Result<Bookmark, BookmarkError> {
        match self.kind {
            BookmarkKind::Fixed4 => {
                let bytes = <[u8; FIXED4_SIZE]>::try_from(&raw[..]).map_err(|_| {
                    BookmarkError::WidthMismatch {
                        expected: FIXED4_SIZE,
                        found: raw.len(),
                    }
                })?;
                Ok(Bookmark::Numeric32(u32::from_le_bytes(bytes)))
            }
            BookmarkKind::Fixed8 => {
                let bytes = <[u8; FIXED8_SIZE]>::try_from(&raw[..]).map_err(|_| {
                    BookmarkError::WidthMismatch {
                        expected: FIXED8_SIZE,
                        found: raw.len(),
                    }
                })?;
                Ok(Bookmark::Numeric64(u64::from_le_bytes(bytes)))
            }
            BookmarkKind::Variable => {
                if raw.is_empty() {
                    return Err(BookmarkError::Empty);
                }
                if raw.is_first() || raw.is_last() {
                    return Err(BookmarkError::SentinelCollision);
                }
                let mut bytes = Vec::new();
                bytes
                    .try_reserve_exact(raw.len())
                    .map_err(|_| BookmarkError::OutOfMemory)?;
                bytes.extend_from_slice(raw);
                Ok(Bookmark::Opaque(bytes.into_boxed_slice()))
            }
        }
    }

    #[instrument(parent = None, skip(self), ret, level = "trace")]
    /// Produces the wire form used to address a bookmark fetch. Sentinels become the single-byte
    /// `BMK_FIRST`/`BMK_LAST` codes.
    pub fn decode(&self, bookmark: &Bookmark) -> Result<RawBookmark, BookmarkError> {
        match (bookmark, self.kind) {
            (Bookmark::BeforeFirst, _) => Ok(RawBookmark::first()),
            (Bookmark::AfterLast, _) => Ok(RawBookmark::last()),
            (Bookmark::Numeric32(value), BookmarkKind::Fixed4) => {
                Ok(RawBookmark::from(&value.to_le_bytes()[..]))
            }
            (Bookmark::Numeric64(value), BookmarkKind::Fixed8) => {
                Ok(RawBookmark::from(&value.to_le_bytes()[..]))
            }
            (Bookmark::Opaque(bytes), BookmarkKind::Variable) => {
                if bytes.is_empty() {
                    return Err(BookmarkError::Empty);
                }
                if **bytes == [BMK_FIRST] || **bytes == [BMK_LAST] {
                    return Err(BookmarkError::SentinelCollision);
                }
                Ok(RawBookmark::from(&bytes[..]))
            }
            (other, kind) => Err(BookmarkError::KindMismatch(other.clone(), kind)),
        }
    }
}
