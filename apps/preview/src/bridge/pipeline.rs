//! One regeneration pass: build → resolve → paginate → analyze → markup.
//!
//! Pure and synchronous; the bridge runs it on the blocking pool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::customization::{capacity_for, CustomizationSettings};
use crate::layout::block::{Block, BlockKind};
use crate::layout::builder::escape_html;
use crate::layout::markup::{render_document, render_page};
use crate::layout::page_fill::{analyze_page_fill, analyze_pages, PageFillAnalysis};
use crate::layout::{
    build_blocks, paginate, resolve, BuildContext, HeightModel, LayoutPreferences, Page,
    PaginationPolicy,
};
use crate::models::FormData;

/// Everything one cycle reads, snapshotted before the pass starts.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub cycle: u64,
    pub form: FormData,
    pub settings: CustomizationSettings,
    pub prefs: LayoutPreferences,
    pub edit_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub page_number: u32,
    pub block_kinds: Vec<BlockKind>,
    pub fill: PageFillAnalysis,
}

/// Output of one regeneration cycle, as published to observers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPreview {
    pub cycle: u64,
    pub pages: Vec<RenderedPage>,
    /// Concatenated page containers.
    pub html: String,
    /// CSS custom properties for the current customization.
    pub css: String,
    pub realized_max_pages: u32,
    pub grew: bool,
    pub edit_mode: bool,
    /// Rendered by the minimal fallback after a pipeline failure.
    pub fallback: bool,
    pub generated_at: DateTime<Utc>,
}

pub type PipelineFn = fn(&PipelineInputs) -> RenderedPreview;

/// Shared handle to a published preview.
pub type SharedPreview = Arc<RenderedPreview>;

pub fn run_pipeline(inputs: &PipelineInputs) -> RenderedPreview {
    let ctx = BuildContext {
        hidden: &inputs.prefs.hidden,
        heights: HeightModel::from_settings(&inputs.settings),
        editable: inputs.edit_mode,
    };

    let blocks = build_blocks(&inputs.form, &ctx);
    let resolved = resolve(blocks, &inputs.prefs);

    let capacity = capacity_for(&inputs.settings);
    let policy = PaginationPolicy {
        requested_max_pages: inputs.settings.max_pages,
    };
    let result = paginate(resolved, capacity, policy);
    let fills = analyze_pages(&result.pages, capacity);

    RenderedPreview {
        cycle: inputs.cycle,
        pages: summarize(&result.pages, &fills),
        html: render_document(&result.pages, &fills, &inputs.settings),
        css: inputs.settings.css_variables(),
        realized_max_pages: result.realized_max_pages,
        grew: result.grew,
        edit_mode: inputs.edit_mode,
        fallback: false,
        generated_at: Utc::now(),
    }
}

fn summarize(pages: &[Page], fills: &[PageFillAnalysis]) -> Vec<RenderedPage> {
    pages
        .iter()
        .zip(fills)
        .map(|(page, fill)| RenderedPage {
            page_number: page.page_number,
            block_kinds: page.blocks.iter().map(|b| b.kind).collect(),
            fill: fill.clone(),
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Fallback
// ────────────────────────────────────────────────────────────────────────────

fn plain_block(kind: BlockKind, title: &str, lines: &[&str]) -> Option<Block> {
    let lines: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    let mut markup = format!(r#"<div class="cv-section cv-fallback" data-section="{kind}">"#);
    if !title.is_empty() {
        markup.push_str(&format!("<h2>{}</h2>", escape_html(title)));
    }
    for line in lines {
        markup.push_str(&format!("<p>{}</p>", escape_html(line)));
    }
    markup.push_str("</div>");
    // Heights are meaningless here; the fallback is always a single page.
    Some(Block::new(kind, markup, 0.0))
}

/// Minimal single-page rendering: header plus the plain-text sections that are
/// available. Uses none of the builder's per-section logic.
pub fn fallback_preview(inputs: &PipelineInputs) -> RenderedPreview {
    let form = &inputs.form;
    let contact = [form.email.as_str(), form.phone.as_str(), form.address.as_str()]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
    let skills = form.skills_text();

    let blocks: Vec<Block> = [
        plain_block(
            BlockKind::Header,
            "",
            &[form.full_name.as_str(), form.job_title.as_str(), contact.as_str()],
        ),
        plain_block(BlockKind::Summary, "Summary", &[form.summary.as_str()]),
        plain_block(
            BlockKind::Skills,
            "Skills",
            &skills.lines().collect::<Vec<_>>(),
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    let page = Page {
        page_number: 1,
        blocks,
    };
    let fill = analyze_page_fill(&page, capacity_for(&inputs.settings));
    let html = render_page(&page, &fill, &inputs.settings);

    RenderedPreview {
        cycle: inputs.cycle,
        pages: summarize(std::slice::from_ref(&page), std::slice::from_ref(&fill)),
        html,
        css: inputs.settings.css_variables(),
        realized_max_pages: inputs.settings.max_pages,
        grew: false,
        edit_mode: inputs.edit_mode,
        fallback: true,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::form::{ExperienceEntry, SkillEntry};

    fn inputs(form: FormData) -> PipelineInputs {
        PipelineInputs {
            cycle: 7,
            form,
            settings: CustomizationSettings::default(),
            prefs: LayoutPreferences::default(),
            edit_mode: false,
        }
    }

    fn sample_form() -> FormData {
        FormData {
            full_name: "Ada Lovelace".to_string(),
            job_title: "Analyst".to_string(),
            email: "ada@example.com".to_string(),
            summary: "Writes the first programs.".to_string(),
            experience: vec![ExperienceEntry {
                title: "Analyst".to_string(),
                company: "Analytical Engine".to_string(),
                start_date: "1842-01".to_string(),
                current: true,
                ..Default::default()
            }],
            technical_skills: vec![SkillEntry {
                name: "Mathematics".to_string(),
                level: 95,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_pads_to_requested_pages() {
        let preview = run_pipeline(&inputs(sample_form()));
        assert_eq!(preview.cycle, 7);
        assert_eq!(preview.pages.len(), 2);
        assert_eq!(preview.pages[0].block_kinds[0], BlockKind::Header);
        assert!(preview.pages[1].block_kinds.is_empty());
        assert_eq!(preview.html.matches("cv-page-footer").count(), 2);
        assert!(!preview.fallback);
    }

    #[test]
    fn test_pipeline_is_deterministic_apart_from_timestamp() {
        let a = run_pipeline(&inputs(sample_form()));
        let b = run_pipeline(&inputs(sample_form()));
        assert_eq!(a.pages, b.pages);
        assert_eq!(a.html, b.html);
        assert_eq!(a.realized_max_pages, b.realized_max_pages);
    }

    #[test]
    fn test_pipeline_grows_for_long_content() {
        let mut form = sample_form();
        form.experience = (0..30)
            .map(|i| ExperienceEntry {
                title: format!("Role {i}"),
                company: "Acme".to_string(),
                start_date: "2020-01".to_string(),
                description: "x".repeat(600),
                ..Default::default()
            })
            .collect();
        let mut input = inputs(form);
        input.settings.max_pages = 1;
        let preview = run_pipeline(&input);
        assert!(preview.grew);
        assert_eq!(preview.realized_max_pages as usize, preview.pages.len());
        assert!(preview.pages.len() > 1);
    }

    #[test]
    fn test_fallback_is_single_plain_page() {
        let preview = fallback_preview(&inputs(sample_form()));
        assert!(preview.fallback);
        assert_eq!(preview.pages.len(), 1);
        assert_eq!(
            preview.pages[0].block_kinds,
            vec![BlockKind::Header, BlockKind::Summary, BlockKind::Skills]
        );
        assert!(preview.html.contains("Ada Lovelace"));
        assert!(preview.html.contains("Technical skills: Mathematics"));
        assert!(!preview.html.contains("drag-handle"));
    }

    #[test]
    fn test_fallback_with_empty_form_still_renders() {
        let preview = fallback_preview(&inputs(FormData::default()));
        assert_eq!(preview.pages.len(), 1);
        assert!(preview.pages[0].block_kinds.is_empty());
        assert!(preview.html.contains(r#"data-page="1""#));
    }
}
