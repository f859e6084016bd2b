//! Page Fill Analysis: how much of each paginated page the estimated content uses.
//!
//! Heights are estimates, so the verdict is advisory: it drives the overflow
//! indicator in the page markup and the per-page stats in the preview response.

use serde::{Deserialize, Serialize};

use crate::layout::paginate::{Page, PageCapacity};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Per-page fill verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageFillVerdict {
    /// No blocks: a padding page reserved by the page-count setting.
    Empty,
    /// Content fits within the usable height.
    Acceptable,
    /// A single oversized block exceeds the usable height.
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFillAnalysis {
    pub page_number: u32,
    pub used_height_mm: f32,
    pub usable_height_mm: f32,
    /// `used / usable`; above 1.0 on overflow.
    pub fill_ratio: f32,
    pub overflow_mm: f32,
    pub verdict: PageFillVerdict,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

pub fn analyze_page_fill(page: &Page, capacity: PageCapacity) -> PageFillAnalysis {
    let used = page.used_height_mm();
    let usable = capacity.usable_height_mm;

    let fill_ratio = if usable > 0.0 { used / usable } else { 0.0 };
    let overflow_mm = (used - usable).max(0.0);

    let verdict = if page.blocks.is_empty() {
        PageFillVerdict::Empty
    } else if overflow_mm > 0.0 {
        PageFillVerdict::Overflow
    } else {
        PageFillVerdict::Acceptable
    };

    PageFillAnalysis {
        page_number: page.page_number,
        used_height_mm: used,
        usable_height_mm: usable,
        fill_ratio,
        overflow_mm,
        verdict,
    }
}

pub fn analyze_pages(pages: &[Page], capacity: PageCapacity) -> Vec<PageFillAnalysis> {
    pages
        .iter()
        .map(|page| analyze_page_fill(page, capacity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::block::{Block, BlockKind};

    fn page(heights: &[f32]) -> Page {
        let blocks = heights
            .iter()
            .map(|h| Block::new(BlockKind::Experience, String::new(), *h))
            .collect();
        Page {
            page_number: 1,
            blocks,
        }
    }

    fn capacity() -> PageCapacity {
        PageCapacity::from_margins(20.0, 20.0)
    }

    #[test]
    fn test_empty_page_verdict() {
        let analysis = analyze_page_fill(&page(&[]), capacity());
        assert_eq!(analysis.verdict, PageFillVerdict::Empty);
        assert_eq!(analysis.fill_ratio, 0.0);
    }

    #[test]
    fn test_acceptable_fill_verdict() {
        let analysis = analyze_page_fill(&page(&[100.0, 57.0]), capacity());
        assert_eq!(analysis.verdict, PageFillVerdict::Acceptable);
        assert!((analysis.fill_ratio - 157.0 / 257.0).abs() < 1e-5);
        assert_eq!(analysis.overflow_mm, 0.0);
    }

    #[test]
    fn test_overflow_verdict() {
        let analysis = analyze_page_fill(&page(&[300.0]), capacity());
        assert_eq!(analysis.verdict, PageFillVerdict::Overflow);
        assert_eq!(analysis.overflow_mm, 43.0);
        assert!(analysis.fill_ratio > 1.0);
    }

    #[test]
    fn test_zero_height_blocks_are_not_empty() {
        let analysis = analyze_page_fill(&page(&[0.0]), capacity());
        assert_eq!(analysis.verdict, PageFillVerdict::Acceptable);
    }
}
