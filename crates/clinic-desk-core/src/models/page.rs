//! List envelopes and pagination state.

use serde::{Deserialize, Deserializer};

/// Rows per patient page. Fixed by the server.
pub const PAGE_SIZE: u32 = 10;

/// One response from a list endpoint.
///
/// The server answers either with a paginated envelope or a bare array.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    /// Server-reported total across all pages
    pub count: Option<u64>,
    pub results: Vec<T>,
}

impl<T> Listing<T> {
    pub fn new(results: Vec<T>, count: Option<u64>) -> Self {
        Self { count, results }
    }

    /// Total matching rows, preferring the server-reported count.
    pub fn total(&self) -> u64 {
        match self.count {
            Some(count) if count > 0 => count,
            _ => self.results.len() as u64,
        }
    }
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            count: None,
            results: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListingWire<T> {
    Paged {
        #[serde(default)]
        count: Option<u64>,
        results: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Listing<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ListingWire::<T>::deserialize(deserializer)? {
            ListingWire::Paged { count, results } => Listing { count, results },
            ListingWire::Bare(results) => Listing {
                count: None,
                results,
            },
        })
    }
}

/// Current page of a paginated view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    page: u32,
    total_count: u64,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page: 1,
            total_count: 0,
        }
    }
}

impl PageState {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Number of pages for the current total.
    pub fn total_pages(&self) -> u32 {
        let pages = self.total_count.div_ceil(PAGE_SIZE as u64);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Whether `page` can be shown. Page 1 is always reachable.
    pub fn contains(&self, page: u32) -> bool {
        page == 1 || (page > 1 && page <= self.total_pages())
    }

    pub fn next(&self) -> Option<u32> {
        let next = self.page.checked_add(1)?;
        self.contains(next).then_some(next)
    }

    pub fn prev(&self) -> Option<u32> {
        let prev = self.page.checked_sub(1)?;
        self.contains(prev).then_some(prev)
    }

    /// Record a loaded page, clamping the page number into range.
    pub fn apply(&mut self, page: u32, total_count: u64) {
        self.total_count = total_count;
        let last = self.total_pages().max(1);
        self.page = page.clamp(1, last);
    }
}
