//! Pagination position within one work item.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pagination cursor: a 1-based page number or an offset/limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cursor {
    Page(u32),
    Offset { offset: u32, limit: u32 },
}

impl Cursor {
    /// First page of a page-numbered listing.
    pub fn first_page() -> Self {
        Cursor::Page(1)
    }

    /// First window of an offset/limit listing.
    pub fn first_window(limit: u32) -> Self {
        Cursor::Offset { offset: 0, limit }
    }

    /// The next position. Never moves backwards.
    pub fn advance(self) -> Self {
        match self {
            Cursor::Page(n) => Cursor::Page(n.saturating_add(1)),
            Cursor::Offset { offset, limit } => Cursor::Offset {
                offset: offset.saturating_add(limit),
                limit,
            },
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Page(n) => write!(f, "page {n}"),
            Cursor::Offset { offset, limit } => write!(f, "offset {offset} (limit {limit})"),
        }
    }
}
