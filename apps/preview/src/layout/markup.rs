//! Page markup: one fixed A4 container per page, consumed by the export rasterizer.

use std::fmt::Write;

use crate::customization::{CustomizationSettings, LayoutMode};
use crate::layout::block::{Block, BlockKind};
use crate::layout::page_fill::{PageFillAnalysis, PageFillVerdict};
use crate::layout::paginate::{Page, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};

/// Column a block is tagged with under the sidebar layout. Tagging never moves a
/// block: page markup keeps the resolved order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarColumn {
    FullWidth,
    Left,
    Right,
}

impl SidebarColumn {
    pub fn for_kind(kind: BlockKind) -> Self {
        match kind {
            BlockKind::RecruitmentBanner | BlockKind::Header => SidebarColumn::FullWidth,
            BlockKind::Summary | BlockKind::Skills | BlockKind::Languages => SidebarColumn::Left,
            _ => SidebarColumn::Right,
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            SidebarColumn::FullWidth => "sidebar-full",
            SidebarColumn::Left => "sidebar-left",
            SidebarColumn::Right => "sidebar-right",
        }
    }
}

fn page_style(settings: &CustomizationSettings) -> String {
    format!(
        "--cv-page-width: {PAGE_WIDTH_MM}mm; --cv-page-height: {PAGE_HEIGHT_MM}mm; \
         --cv-margin-top: {}mm; --cv-margin-bottom: {}mm; \
         --cv-margin-left: {}mm; --cv-margin-right: {}mm; \
         width: {PAGE_WIDTH_MM}mm; height: {PAGE_HEIGHT_MM}mm;",
        settings.page_margin_top,
        settings.page_margin_bottom,
        settings.page_margin_left,
        settings.page_margin_right,
    )
}

fn page_classes(settings: &CustomizationSettings, fill: &PageFillAnalysis) -> String {
    let mut classes = format!("cv-page layout-{}", settings.layout_type.as_str());
    if !settings.show_section_lines {
        classes.push_str(" no-line");
    }
    if fill.verdict == PageFillVerdict::Overflow {
        classes.push_str(" page-overflow");
    }
    classes
}

fn push_blocks(out: &mut String, blocks: &[Block]) {
    for block in blocks {
        out.push_str(&block.markup);
    }
}

/// Wraps each block in a slot carrying its column class, in page order.
fn push_sidebar_blocks(out: &mut String, blocks: &[Block]) {
    for block in blocks {
        let _ = write!(
            out,
            r#"<div class="cv-slot {}" data-section="{}">{}</div>"#,
            SidebarColumn::for_kind(block.kind).class_name(),
            block.kind,
            block.markup
        );
    }
}

/// Renders one page container with its blocks, overflow indicator, and footer.
pub fn render_page(
    page: &Page,
    fill: &PageFillAnalysis,
    settings: &CustomizationSettings,
) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<div class="{}" data-page="{}" style="{}"><div class="cv-page-content">"#,
        page_classes(settings, fill),
        page.page_number,
        page_style(settings),
    );

    match settings.layout_type {
        LayoutMode::Sidebar => push_sidebar_blocks(&mut out, &page.blocks),
        _ => push_blocks(&mut out, &page.blocks),
    }

    if fill.verdict == PageFillVerdict::Overflow {
        let _ = write!(
            out,
            r#"<div class="page-overflow-indicator" data-overflow-mm="{:.1}">Content exceeds the page by {:.1}mm</div>"#,
            fill.overflow_mm, fill.overflow_mm,
        );
    }

    let _ = write!(
        out,
        r#"</div><div class="cv-page-footer">Page {}</div></div>"#,
        page.page_number
    );
    out
}

/// Concatenates every page container, in page order.
pub fn render_document(
    pages: &[Page],
    fills: &[PageFillAnalysis],
    settings: &CustomizationSettings,
) -> String {
    pages
        .iter()
        .zip(fills)
        .map(|(page, fill)| render_page(page, fill, settings))
        .collect()
}
