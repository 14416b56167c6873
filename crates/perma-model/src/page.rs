use serde::{Deserialize, Serialize};

use crate::record::Record;

/// One response from a paginated list endpoint.
///
/// The API wraps every list in `{"meta": {...}, "objects": [...]}`. Both
/// keys default to empty so a sparse body still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub meta: PageMeta,
    #[serde(default)]
    pub objects: Vec<Record>,
}

/// Pagination metadata attached to a [`Page`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub limit: Option<u64>,
    /// Server-supplied pointer to the following page, absent or null on the last one.
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl PageMeta {
    /// The next-page pointer, treating an empty string the same as null.
    pub fn next_link(&self) -> Option<&str> {
        self.next.as_deref().filter(|n| !n.is_empty())
    }

    /// Completion fraction after the `index`-th object (zero-based) of this
    /// page has been processed, rounded to three decimals.
    ///
    /// An empty collection is complete from the start.
    pub fn fraction_after(&self, index: usize) -> f64 {
        if self.total_count == 0 {
            return 1.0;
        }
        let done = (self.offset + index as u64 + 1) as f64;
        let fraction = done / self.total_count as f64;
        (fraction * 1000.0).round() / 1000.0
    }
}

impl Page {
    /// Wrap a single object as a one-element page with no successor.
    pub fn single(object: Record) -> Self {
        Self {
            meta: PageMeta {
                total_count: 1,
                ..PageMeta::default()
            },
            objects: vec![object],
        }
    }
}
