use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{error, trace};

use super::row_source::{RowSource, SourceError};

pub type SharedRowSource = Rc<RefCell<dyn RowSource>>;

/// Opaque identifier of a row inside its row source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One reference on a row. Dropping the handle releases the reference back to its source.
pub struct RowHandle {
    id: RowId,
    source: SharedRowSource,
}

impl RowHandle {
    /// Takes over a reference the source already handed out for `id`.
    pub(crate) fn adopt(id: RowId, source: &SharedRowSource) -> Self {
        Self {
            id,
            source: Rc::clone(source),
        }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    /// Takes an additional reference on the same row.
    pub fn clone_ref(&self) -> Result<Self, SourceError> {
        self.source.borrow_mut().add_ref(self.id)?;
        trace!(row = %self.id, "row reference added");
        Ok(Self {
            id: self.id,
            source: Rc::clone(&self.source),
        })
    }
}

impl Drop for RowHandle {
    fn drop(&mut self) {
        // Handles are never dropped while the cursor holds a borrow of the source.
        match self.source.try_borrow_mut() {
            Ok(mut source) => {
                if let Err(err) = source.release(&[self.id]) {
                    error!(row = %self.id, %err, "could not release row");
                }
            }
            Err(_) => error!(row = %self.id, "row source busy, row reference leaked"),
        }
    }
}

impl fmt::Debug for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("RowHandle").field(&self.id).finish()
    }
}
