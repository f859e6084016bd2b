//! Pagination Engine: greedy first-fit packing of ordered blocks into A4 pages.
//!
//! Blocks are never split: one taller than a page sits alone on a page it overflows.
//! The requested page count is a hint. Too few pages are padded with empty ones, and
//! too many raise the realized maximum instead of dropping content. The pass is pure;
//! the caller persists `realized_max_pages` when `grew` is set.

use serde::Serialize;

use crate::layout::block::{sanitize_height, Block};

/// A4 portrait.
pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

/// Usable vertical space per page after margins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCapacity {
    pub usable_height_mm: f32,
}

impl PageCapacity {
    pub fn from_margins(margin_top_mm: f32, margin_bottom_mm: f32) -> Self {
        Self {
            usable_height_mm: PAGE_HEIGHT_MM - margin_top_mm - margin_bottom_mm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    pub requested_max_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-based and contiguous.
    pub page_number: u32,
    pub blocks: Vec<Block>,
}

impl Page {
    fn new(page_number: u32, blocks: Vec<Block>) -> Self {
        Self {
            page_number,
            blocks,
        }
    }

    pub fn used_height_mm(&self) -> f32 {
        self.blocks.iter().map(|b| b.estimated_height_mm).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult {
    pub pages: Vec<Page>,
    /// `max(requested, produced)`; the new policy baseline.
    pub realized_max_pages: u32,
    /// Content needed more pages than requested.
    pub grew: bool,
}

impl PaginationResult {
    /// All placed blocks in page order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }
}

pub fn paginate(
    blocks: Vec<Block>,
    capacity: PageCapacity,
    policy: PaginationPolicy,
) -> PaginationResult {
    let mut pages: Vec<Page> = Vec::new();
    let mut current: Vec<Block> = Vec::new();
    let mut current_height = 0.0f32;

    for mut block in blocks {
        // Blocks normally come through `Block::new`, but the field is public.
        block.estimated_height_mm = sanitize_height(block.estimated_height_mm);
        let height = block.estimated_height_mm;

        if current_height + height > capacity.usable_height_mm && !current.is_empty() {
            let number = pages.len() as u32 + 1;
            pages.push(Page::new(number, std::mem::take(&mut current)));
            current_height = 0.0;
        }

        current_height += height;
        current.push(block);
    }

    if !current.is_empty() {
        let number = pages.len() as u32 + 1;
        pages.push(Page::new(number, current));
    }

    let produced = pages.len() as u32;
    let grew = produced > policy.requested_max_pages;

    while (pages.len() as u32) < policy.requested_max_pages {
        let number = pages.len() as u32 + 1;
        pages.push(Page::new(number, Vec::new()));
    }

    PaginationResult {
        pages,
        realized_max_pages: produced.max(policy.requested_max_pages),
        grew,
    }
}
