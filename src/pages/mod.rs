use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_PAGE_SIZE: PageSize = PageSize::Limited(10);

/// Upper bound on the number of pages laid out for one listing.
pub const MAX_PAGES: u64 = 100_000;

/// Number of items requested per page. `Unlimited` travels as `-1` on the
/// wire and in stored preferences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageSize {
    Limited(u32),
    Unlimited,
}

impl PageSize {
    pub fn from_count(count: i64) -> Option<Self> {
        match count {
            -1 => Some(Self::Unlimited),
            n if n > 0 => u32::try_from(n).ok().map(Self::Limited),
            _ => None,
        }
    }

    pub fn as_count(&self) -> i64 {
        match self {
            Self::Limited(n) => i64::from(*n),
            Self::Unlimited => -1,
        }
    }

    pub fn limit(&self) -> Option<u64> {
        match self {
            Self::Limited(n) => Some(u64::from(*n)),
            Self::Unlimited => None,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        DEFAULT_PAGE_SIZE
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("unlimited") || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::Unlimited);
        }
        let count: i64 = trimmed
            .parse()
            .map_err(|_| format!("invalid page size '{trimmed}'"))?;
        Self::from_count(count)
            .ok_or_else(|| format!("page size must be positive or -1, got {count}"))
    }
}

impl Serialize for PageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_count())
    }
}

impl<'de> Deserialize<'de> for PageSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let count = i64::deserialize(deserializer)?;
        Self::from_count(count).ok_or_else(|| {
            serde::de::Error::custom(format!("page size must be positive or -1, got {count}"))
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageDescriptor {
    pub start: u64,
    pub active: bool,
}

/// Lays out the pages for a listing of `total_count` items and returns them
/// together with the index of the page containing `current_start`.
///
/// There is always at least one page and exactly one of them is active. A
/// `current_start` past the last page activates the last page. At most
/// [`MAX_PAGES`] pages are laid out.
pub fn compute_pages(
    total_count: u64,
    page_size: PageSize,
    current_start: u64,
) -> (Vec<PageDescriptor>, usize) {
    let size = match page_size.limit() {
        Some(size) => size,
        None => {
            return (
                vec![PageDescriptor {
                    start: 0,
                    active: true,
                }],
                0,
            )
        }
    };

    let page_count = page_count(total_count, page_size).min(MAX_PAGES);
    let active_index = (0..page_count)
        .find(|i| {
            let start = i * size;
            current_start >= start && current_start < start + size
        })
        .unwrap_or(page_count - 1);

    let pages = (0..page_count)
        .map(|i| PageDescriptor {
            start: i * size,
            active: i == active_index,
        })
        .collect();
    (pages, active_index as usize)
}

/// Number of pages needed for `total_count` items, at least one.
pub fn page_count(total_count: u64, page_size: PageSize) -> u64 {
    match page_size.limit() {
        Some(size) => total_count.div_ceil(size).max(1),
        None => 1,
    }
}

/// Start offset that keeps the item at `active_start` visible once the page
/// size becomes `new_size`.
pub fn reanchor_start(active_start: u64, new_size: PageSize) -> u64 {
    match new_size.limit() {
        Some(size) => (active_start / size) * size,
        None => 0,
    }
}

/// Sizes offered by a page-size selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSizeOptions {
    pub sizes: Vec<u32>,
    pub unlimited: bool,
}

impl Default for PageSizeOptions {
    fn default() -> Self {
        Self {
            sizes: vec![10, 15, 20],
            unlimited: false,
        }
    }
}

impl PageSizeOptions {
    pub fn accepts(&self, size: PageSize) -> bool {
        match size {
            PageSize::Limited(n) => self.sizes.contains(&n),
            PageSize::Unlimited => self.unlimited,
        }
    }

    pub fn choices(&self) -> Vec<PageSize> {
        let mut out: Vec<PageSize> = self.sizes.iter().copied().map(PageSize::Limited).collect();
        if self.unlimited {
            out.push(PageSize::Unlimited);
        }
        out
    }

    pub fn smallest(&self) -> Option<u32> {
        self.sizes.iter().copied().min()
    }
}
