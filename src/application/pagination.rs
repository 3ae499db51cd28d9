//! Numbered-page pagination with a compact navigation window.

use std::num::NonZeroUsize;

use serde::Serialize;
use thiserror::Error;

/// Half-width of the navigation window when none is configured.
pub const DEFAULT_NAVIGATION_HALF_WIDTH: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("invalid page token `{0}`")]
    InvalidPageToken(String),
}

/// A page number requested by the caller, normalized to be at least 1.
///
/// Clamping to the last page happens later, once the total is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestedPage(usize);

impl RequestedPage {
    pub const FIRST: Self = Self(1);

    pub fn new(number: usize) -> Self {
        Self(number.max(1))
    }

    /// Parse a raw `page` query value.
    ///
    /// Absent or blank tokens select the first page. Any integer is accepted,
    /// including negative and absurdly large ones; only non-numeric tokens fail.
    pub fn parse(raw: Option<&str>) -> Result<Self, PaginationError> {
        let Some(token) = raw.map(str::trim).filter(|token| !token.is_empty()) else {
            return Ok(Self::FIRST);
        };

        let (negative, digits) = match token.as_bytes()[0] {
            b'-' => (true, &token[1..]),
            b'+' => (false, &token[1..]),
            _ => (false, token),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PaginationError::InvalidPageToken(token.to_string()));
        }

        if negative {
            return Ok(Self::FIRST);
        }

        let number = digits.parse::<usize>().unwrap_or(usize::MAX);
        Ok(Self::new(number))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for RequestedPage {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Where a resolved page sits inside the full ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub number: usize,
    pub last_page: usize,
    pub offset: usize,
    pub limit: usize,
}

/// One page of an ordered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub number: usize,
    pub page_size: usize,
    pub last_page: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub window: Vec<usize>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            number: self.number,
            page_size: self.page_size,
            last_page: self.last_page,
            has_previous: self.has_previous,
            has_next: self.has_next,
            window: self.window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: NonZeroUsize,
    half_width: usize,
}

impl Paginator {
    pub fn new(page_size: NonZeroUsize, half_width: usize) -> Self {
        Self {
            page_size,
            half_width,
        }
    }

    /// Resolve the requested page against `total` items.
    pub fn plan(&self, total: usize, requested: RequestedPage) -> PagePlan {
        let size = self.page_size.get();
        let last_page = total.div_ceil(size).max(1);
        let number = requested.get().min(last_page);
        PagePlan {
            number,
            last_page,
            offset: (number - 1) * size,
            limit: size,
        }
    }

    /// Assemble a page from items already sliced to `plan`.
    pub fn assemble<T>(&self, plan: PagePlan, items: Vec<T>, total: usize) -> Page<T> {
        Page {
            items,
            total,
            number: plan.number,
            page_size: self.page_size.get(),
            last_page: plan.last_page,
            has_previous: plan.number > 1,
            has_next: plan.number < plan.last_page,
            window: navigation_window(plan.last_page, plan.number, self.half_width),
        }
    }

    /// Slice a fully materialized ordered sequence.
    pub fn paginate<T>(&self, items: Vec<T>, requested: RequestedPage) -> Page<T> {
        let total = items.len();
        let plan = self.plan(total, requested);
        let slice = items
            .into_iter()
            .skip(plan.offset)
            .take(plan.limit)
            .collect();
        self.assemble(plan, slice, total)
    }
}

/// Slice `items` into a page of `page_size` using the default navigation half-width.
pub fn paginate<T>(items: Vec<T>, page_size: NonZeroUsize, requested: RequestedPage) -> Page<T> {
    Paginator::new(page_size, DEFAULT_NAVIGATION_HALF_WIDTH).paginate(items, requested)
}

/// Page numbers to render around `current`.
///
/// Near the start the window is the first `current + half_width` pages. Past
/// that it is the page-number sequence sliced at zero-based offsets
/// `[current - half_width - 1, current + half_width)`, i.e. pages
/// `current - half_width ..= current + half_width`. Both forms clip at
/// `last_page`, and short listings show every page.
pub fn navigation_window(last_page: usize, current: usize, half_width: usize) -> Vec<usize> {
    let last_page = last_page.max(1);
    let current = current.clamp(1, last_page);

    if last_page <= half_width.saturating_mul(2).saturating_add(1) {
        return (1..=last_page).collect();
    }

    let end = current.saturating_add(half_width).min(last_page);
    let start = if current <= half_width {
        1
    } else {
        current - half_width
    };
    (start..=end).collect()
}
