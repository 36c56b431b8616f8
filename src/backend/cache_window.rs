use std::io;

use ptree::item::StringItem;
use ptree::{print_tree, TreeBuilder};
use tracing::{instrument, trace};

use super::row_handle::RowHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDirection {
    Forward,
    Backward,
}

impl FetchDirection {
    pub fn sign(self) -> i64 {
        match self {
            FetchDirection::Forward => 1,
            FetchDirection::Backward => -1,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            FetchDirection::Forward => FetchDirection::Backward,
            FetchDirection::Backward => FetchDirection::Forward,
        }
    }
}

/// Direction the window's rows were fetched in. `Unset` means no window has been fetched since
/// the cursor was opened, repositioned, or ran off either end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowDirection {
    #[default]
    Unset,
    Forward,
    Backward,
}

impl WindowDirection {
    pub fn fetch_direction(self) -> Option<FetchDirection> {
        match self {
            WindowDirection::Unset => None,
            WindowDirection::Forward => Some(FetchDirection::Forward),
            WindowDirection::Backward => Some(FetchDirection::Backward),
        }
    }
}

impl From<FetchDirection> for WindowDirection {
    fn from(direction: FetchDirection) -> Self {
        match direction {
            FetchDirection::Forward => WindowDirection::Forward,
            FetchDirection::Backward => WindowDirection::Backward,
        }
    }
}

/// Geometry of a window, kept apart from its rows so a window can be released and later
/// restored without its handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowShape {
    pub direction: WindowDirection,
    pub fetched: usize,
    pub position: usize,
}

/// Row handles obtained by the most recent fetch.
///
/// `rows[0]` is the row nearest to where the fetch started, so walking the window in its fetch
/// direction means walking `rows` front to back. `position` counts the rows consumed; while a
/// row of the window is current it sits at `rows[position - 1]`.
///
/// A window is *live* while it holds all `fetched` handles. A released window keeps its shape
/// but no handles, and every move out of it goes back to the row source.
#[derive(Debug, Default)]
pub struct CacheWindow {
    rows: Vec<RowHandle>,
    direction: WindowDirection,
    fetched: usize,
    position: usize,
}

impl CacheWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(&self) -> WindowDirection {
        self.direction
    }

    pub fn fetched(&self) -> usize {
        self.fetched
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Rows of the window not yet consumed in its fetch direction.
    pub fn remaining(&self) -> usize {
        self.fetched - self.position
    }

    pub fn is_live(&self) -> bool {
        self.fetched > 0 && self.rows.len() == self.fetched
    }

    pub fn shape(&self) -> WindowShape {
        WindowShape {
            direction: self.direction,
            fetched: self.fetched,
            position: self.position,
        }
    }

    pub fn row(&self, index: usize) -> Option<&RowHandle> {
        self.rows.get(index)
    }

    #[instrument(parent = None, skip(self, rows), level = "trace")]
    /// Replaces the window with a fresh batch. Nothing is consumed yet.
    pub fn fill(&mut self, direction: FetchDirection, rows: Vec<RowHandle>) {
        self.fetched = rows.len();
        self.rows = rows;
        self.direction = direction.into();
        self.position = 0;
        trace!(fetched = self.fetched, "window filled");
    }

    /// Consumes the next row in the fetch direction and returns its index.
    pub fn take_next(&mut self) -> Option<usize> {
        if !self.is_live() || self.position >= self.fetched {
            return None;
        }
        self.position += 1;
        Some(self.position - 1)
    }

    /// Steps back against the fetch direction and returns the index of the row now current.
    /// Fails at the edge the window was entered from.
    pub fn step_back(&mut self) -> Option<usize> {
        if !self.is_live() || self.position < 2 {
            return None;
        }
        self.position -= 1;
        Some(self.position - 1)
    }

    #[instrument(parent = None, skip(self), ret, level = "trace")]
    /// Releases every handle and returns the shape the window had.
    pub fn release(&mut self) -> WindowShape {
        let shape = self.shape();
        self.rows.clear();
        shape
    }

    /// Releases every handle and forgets the shape.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.direction = WindowDirection::Unset;
        self.fetched = 0;
        self.position = 0;
    }

    #[instrument(parent = None, skip(self), level = "trace")]
    /// Puts back a shape without handles, so the next move refetches relative to it.
    pub fn restore(&mut self, shape: WindowShape) {
        self.rows.clear();
        self.direction = shape.direction;
        self.fetched = shape.fetched;
        self.position = shape.position.min(shape.fetched);
    }

    fn create_tree(&self) -> StringItem {
        let mut tree_builder = TreeBuilder::new(format!(
            "Cache window [{:?}] [{}/{} consumed]{}",
            self.direction,
            self.position,
            self.fetched,
            if self.is_live() || self.fetched == 0 {
                ""
            } else {
                " (released)"
            }
        ));
        for (index, row) in self.rows.iter().enumerate() {
            let marker = if index + 1 == self.position { " <" } else { "" };
            tree_builder.add_empty_child(format!("[{}] row {}{}", index, row.id(), marker));
        }
        tree_builder.build()
    }

    pub fn print_tree(&self) -> io::Result<()> {
        print_tree(&self.create_tree())
    }
}
