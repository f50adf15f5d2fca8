//! Client-side windowing of the rated collection.

use crate::models::{Movie, PAGE_SIZE};

/// Returns the `page`-th window (1-based) of `collection`.
pub fn page(collection: &[Movie], page: u32, page_size: usize) -> &[Movie] {
    let page = page.max(1) as usize;
    let start = (page - 1).saturating_mul(page_size).min(collection.len());
    let end = start.saturating_add(page_size).min(collection.len());
    &collection[start..end]
}

pub fn default_page(collection: &[Movie], page_number: u32) -> &[Movie] {
    page(collection, page_number, PAGE_SIZE)
}

pub fn page_count(len: usize, page_size: usize) -> u32 {
    len.div_ceil(page_size.max(1)) as u32
}

/// Moves `current` back onto the last non-empty page when it points past the
/// end of the collection. A single removal that empties the current page
/// steps back exactly one page. Never goes below 1.
pub fn corrected_page(len: usize, current: u32, page_size: usize) -> u32 {
    let last = page_count(len, page_size).max(1);
    current.clamp(1, last)
}
