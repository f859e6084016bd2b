//! Content Model Builder: turns the form record into ordered, height-estimated blocks.
//!
//! # Height estimation
//! Heights are affine estimates, not text metrics: a fixed base per section plus a
//! term proportional to text length (capped) per entry, scaled by the current
//! typography, plus the configured section and paragraph spacing. Every formula is
//! monotonic in content length, which is all the pagination engine relies on.
//!
//! Sections whose fields are all blank produce no block at all.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::customization::CustomizationSettings;
use crate::layout::block::{Block, BlockKind};
use crate::models::form::{format_month, FormData, RecruitmentBanner};

// ────────────────────────────────────────────────────────────────────────────
// Height constants (millimetres at default typography)
// ────────────────────────────────────────────────────────────────────────────

const HEADER_MM: f32 = 35.0;
const SECTION_TITLE_MM: f32 = 15.0;

const SUMMARY_BASE_MM: f32 = 18.0;
const SUMMARY_MM_PER_200_CHARS: f32 = 6.0;
const SUMMARY_TEXT_CAP_MM: f32 = 15.0;

const ENTRY_BASE_MM: f32 = 12.0;
const ENTRY_TEXT_CAP_MM: f32 = 12.0;
const EXPERIENCE_MM_PER_250_CHARS: f32 = 6.0;
const EDUCATION_MM_PER_200_CHARS: f32 = 6.0;
const TECH_TAGS_MM: f32 = 4.0;

const SKILL_CATEGORY_MM: f32 = 10.0;
const SKILLS_MM_PER_100_CHARS: f32 = 5.0;
const SKILLS_TEXT_CAP_MM: f32 = 20.0;

const LANGUAGE_ENTRY_MM: f32 = 5.0;
const CERTIFICATION_ENTRY_MM: f32 = 9.0;

/// Space kept below the banner in addition to its configured height.
const BANNER_GAP_MM: f32 = 5.0;

const DEFAULT_BANNER_COLOR: &str = "#3B82F6";

/// Typography and spacing applied on top of the raw per-section estimates.
///
/// `Default` is the unscaled model with no spacing; [`HeightModel::from_settings`]
/// is what a regeneration uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightModel {
    /// Multiplier for text-driven heights.
    pub scale: f32,
    /// Added once per section block.
    pub section_gap_mm: f32,
    /// Added once per entry (paragraph, item, skill category).
    pub entry_gap_mm: f32,
}

impl Default for HeightModel {
    fn default() -> Self {
        Self {
            scale: 1.0,
            section_gap_mm: 0.0,
            entry_gap_mm: 0.0,
        }
    }
}

impl HeightModel {
    /// Scales with base font size and line height relative to the defaults, and
    /// carries the section and paragraph spacing as flat additions.
    pub fn from_settings(settings: &CustomizationSettings) -> Self {
        let defaults = CustomizationSettings::default();
        let font = settings.base_font_size / defaults.base_font_size;
        let leading = settings.line_height / defaults.line_height;
        let scale = font * leading;
        Self {
            scale: if scale.is_finite() {
                scale.clamp(0.5, 2.5)
            } else {
                1.0
            },
            section_gap_mm: non_negative(settings.section_spacing),
            entry_gap_mm: non_negative(settings.paragraph_spacing),
        }
    }

    /// Height of a section with `body_mm` of text-driven content and `entries` items.
    pub fn section_height(&self, body_mm: f32, entries: usize) -> f32 {
        body_mm * self.scale + self.section_gap_mm + entries as f32 * self.entry_gap_mm
    }
}

fn non_negative(mm: f32) -> f32 {
    if mm.is_finite() {
        mm.max(0.0)
    } else {
        0.0
    }
}

/// Inputs besides the form record that shape the generated blocks.
pub struct BuildContext<'a> {
    /// Kinds the user has hidden, skipped without synthesizing markup.
    pub hidden: &'a BTreeSet<BlockKind>,
    pub heights: HeightModel,
    /// Mirrors the preview's in-place edit mode onto `contenteditable`.
    pub editable: bool,
}

/// Builds one block per non-empty, non-hidden section, in default document order.
pub fn build_blocks(form: &FormData, ctx: &BuildContext<'_>) -> Vec<Block> {
    let mut blocks = Vec::new();
    for kind in BlockKind::DEFAULT_ORDER {
        if ctx.hidden.contains(&kind) {
            continue;
        }
        let block = match kind {
            BlockKind::RecruitmentBanner => build_banner(&form.recruitment_banner),
            BlockKind::Header => build_header(form, ctx),
            BlockKind::Summary => build_summary(form, ctx),
            BlockKind::Experience => build_experience(form, ctx),
            BlockKind::Education => build_education(form, ctx),
            BlockKind::Skills => build_skills(form, ctx),
            BlockKind::Languages => build_languages(form, ctx),
            BlockKind::Certifications => build_certifications(form, ctx),
            BlockKind::Projects => build_projects(form, ctx),
        };
        blocks.extend(block);
    }
    blocks
}

// ────────────────────────────────────────────────────────────────────────────
// Per-section builders
// ────────────────────────────────────────────────────────────────────────────

/// Banner rules: not shown → no block; shown with a height of 0 → a hidden
/// zero-height placeholder (so re-enabling it needs no other state); otherwise the
/// full banner at its configured height.
fn build_banner(banner: &RecruitmentBanner) -> Option<Block> {
    if !banner.show {
        return None;
    }

    let height = if banner.height_mm.is_finite() {
        banner.height_mm.max(0.0)
    } else {
        0.0
    };

    let style_class = css_token(&banner.style, "modern");
    if height <= 0.0 {
        let markup = format!(
            r#"<div class="cv-section cv-recruitment-banner banner-{style_class}" data-section="recruitment-banner" style="display: none; height: 0; min-height: 0; margin: 0; padding: 0;"></div>"#
        );
        let mut block = Block::new(BlockKind::RecruitmentBanner, markup, 0.0);
        block.pinned = banner.fixed;
        return Some(block);
    }

    let color = normalize_hex_color(&banner.color).unwrap_or_else(|| DEFAULT_BANNER_COLOR.to_string());
    let secondary = adjust_color(&color, -20);
    let mut style = format!(
        "--banner-height: {height}mm; --banner-color: {color}; --banner-color-secondary: {secondary}; min-height: {height}mm; height: {height}mm;"
    );
    if !banner.image_url.trim().is_empty() {
        let _ = write!(style, " background-image: url('{}');", escape_html(banner.image_url.trim()));
    }

    let fixed_class = if banner.fixed { "fixed-banner" } else { "sortable" };
    let mut html = format!(
        r#"<div class="cv-section cv-recruitment-banner banner-{style_class} {fixed_class}" data-section="recruitment-banner" style="{style}">"#
    );
    if !banner.fixed {
        html.push_str(DRAG_HANDLE);
    }
    html.push_str(r#"<div class="banner-content">"#);
    let company = banner.company_name.trim();
    if !banner.company_logo_url.trim().is_empty() {
        let _ = write!(
            html,
            r#"<img src="{}" alt="{} Logo" class="banner-logo">"#,
            escape_html(banner.company_logo_url.trim()),
            escape_html(company)
        );
    }
    html.push_str(r#"<div class="banner-info">"#);
    if !company.is_empty() {
        let _ = write!(html, r#"<h3 class="banner-company">{}</h3>"#, escape_html(company));
    }
    let recruiter = banner.recruiter_name();
    push_optional(&mut html, "banner-recruiter", "Contact: ", &recruiter);
    push_optional(&mut html, "banner-position", "", &banner.recruiter_position);
    push_optional(&mut html, "banner-phone", "Tel: ", &banner.recruiter_phone);
    push_optional(&mut html, "banner-email", "", &banner.recruiter_email);
    push_optional(&mut html, "banner-message", "", &banner.message);
    html.push_str("</div></div></div>");

    let mut block = Block::new(BlockKind::RecruitmentBanner, html, height + BANNER_GAP_MM);
    block.pinned = banner.fixed;
    Some(block)
}

fn build_header(form: &FormData, ctx: &BuildContext<'_>) -> Option<Block> {
    let contact: Vec<&str> = [form.email.trim(), form.phone.trim(), form.address.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    let links: Vec<(&str, &str)> = [
        ("LinkedIn", form.linkedin.trim()),
        ("Portfolio", form.website.trim()),
        ("GitHub", form.github.trim()),
    ]
    .into_iter()
    .filter(|(_, url)| !url.is_empty())
    .collect();

    let name = form.full_name.trim();
    let title = form.job_title.trim();
    if name.is_empty() && title.is_empty() && contact.is_empty() && links.is_empty() {
        return None;
    }

    let editable = editable_attr(ctx.editable);
    let mut html = section_open(BlockKind::Header);
    html.push_str(r#"<div class="cv-header">"#);
    if !name.is_empty() {
        let _ = write!(html, r#"<h1 class="cv-name" {editable}>{}</h1>"#, escape_html(name));
    }
    if !title.is_empty() {
        let _ = write!(html, r#"<p class="cv-title" {editable}>{}</p>"#, escape_html(title));
    }
    if !contact.is_empty() {
        let escaped: Vec<String> = contact.iter().map(|s| escape_html(s)).collect();
        let _ = write!(
            html,
            r#"<p class="cv-contact" {editable}>{}</p>"#,
            escaped.join(" | ")
        );
    }
    if !links.is_empty() {
        html.push_str(r#"<p class="cv-links">"#);
        for (label, url) in &links {
            let _ = write!(html, r#"<a href="{}">{label}</a> "#, escape_html(url));
        }
        html.push_str("</p>");
    }
    html.push_str("</div></div>");

    Some(Block::new(
        BlockKind::Header,
        html,
        ctx.heights.section_height(HEADER_MM, 0),
    ))
}

fn build_summary(form: &FormData, ctx: &BuildContext<'_>) -> Option<Block> {
    let summary = form.summary.trim();
    if summary.is_empty() {
        return None;
    }

    let editable = editable_attr(ctx.editable);
    let mut html = section_open(BlockKind::Summary);
    let _ = write!(html, r#"<h2 {editable}>Summary</h2>"#);
    let _ = write!(
        html,
        r#"<p class="cv-summary-text" {editable}>{}</p></div>"#,
        escape_html(summary)
    );

    let text_mm = (char_len(summary) / 200.0 * SUMMARY_MM_PER_200_CHARS).min(SUMMARY_TEXT_CAP_MM);
    Some(Block::new(
        BlockKind::Summary,
        html,
        ctx.heights.section_height(SUMMARY_BASE_MM + text_mm, 1),
    ))
}

fn build_experience(form: &FormData, ctx: &BuildContext<'_>) -> Option<Block> {
    let editable = editable_attr(ctx.editable);
    let mut html = section_open(BlockKind::Experience);
    let _ = write!(html, r#"<h2 {editable}>Professional Experience</h2>"#);

    let mut height = SECTION_TITLE_MM;
    let mut items = 0usize;
    for exp in form.experience.iter().filter(|e| !e.is_blank()) {
        let title = exp.title.trim();
        let company = exp.company.trim();
        let period = exp.period();
        let description = exp.description.trim();

        html.push_str(r#"<div class="cv-item">"#);
        let heading = match (title.is_empty(), company.is_empty()) {
            (false, false) => format!("{} at {}", escape_html(title), escape_html(company)),
            (false, true) => escape_html(title),
            (true, false) => escape_html(company),
            (true, true) => String::new(),
        };
        let _ = write!(html, r#"<h3 {editable}>{heading}</h3>"#);
        if !exp.location.trim().is_empty() {
            let _ = write!(
                html,
                r#"<p class="cv-location" {editable}>{}</p>"#,
                escape_html(exp.location.trim())
            );
        }
        if !period.is_empty() {
            let _ = write!(html, r#"<p class="cv-period" {editable}>{period}</p>"#);
        }
        if !description.is_empty() {
            let _ = write!(
                html,
                r#"<div class="cv-description" {editable}>{}</div>"#,
                format_description(description)
            );
        }
        let techs = push_technologies(&mut html, &exp.technologies);
        html.push_str("</div>");

        height += ENTRY_BASE_MM
            + (char_len(description) / 250.0 * EXPERIENCE_MM_PER_250_CHARS).min(ENTRY_TEXT_CAP_MM);
        if techs {
            height += TECH_TAGS_MM;
        }
        items += 1;
    }

    if items == 0 {
        return None;
    }
    html.push_str("</div>");
    Some(Block::new(
        BlockKind::Experience,
        html,
        ctx.heights.section_height(height, items),
    ))
}

fn build_education(form: &FormData, ctx: &BuildContext<'_>) -> Option<Block> {
    let editable = editable_attr(ctx.editable);
    let mut html = section_open(BlockKind::Education);
    let _ = write!(html, r#"<h2 {editable}>Education</h2>"#);

    let mut height = SECTION_TITLE_MM;
    let mut items = 0usize;
    for edu in form.education.iter().filter(|e| !e.is_blank()) {
        let degree = edu.degree.trim();
        let school = edu.school.trim();
        let period = edu.period();
        let description = edu.description.trim();

        html.push_str(r#"<div class="cv-item">"#);
        let heading = match (degree.is_empty(), school.is_empty()) {
            (false, false) => format!("{} - {}", escape_html(degree), escape_html(school)),
            (false, true) => escape_html(degree),
            (true, false) => escape_html(school),
            (true, true) => String::new(),
        };
        let _ = write!(html, r#"<h3 {editable}>{heading}</h3>"#);
        if !period.is_empty() {
            let _ = write!(html, r#"<p class="cv-period" {editable}>{period}</p>"#);
        }
        if !edu.grade.trim().is_empty() {
            let _ = write!(
                html,
                r#"<p class="cv-grade" {editable}>{}</p>"#,
                escape_html(edu.grade.trim())
            );
        }
        if !description.is_empty() {
            let _ = write!(
                html,
                r#"<p {editable}>{}</p>"#,
                escape_html(description)
            );
        }
        html.push_str("</div>");

        height += ENTRY_BASE_MM
            + (char_len(description) / 200.0 * EDUCATION_MM_PER_200_CHARS).min(ENTRY_TEXT_CAP_MM);
        items += 1;
    }

    if items == 0 {
        return None;
    }
    html.push_str("</div>");
    Some(Block::new(
        BlockKind::Education,
        html,
        ctx.heights.section_height(height, items),
    ))
}

fn build_skills(form: &FormData, ctx: &BuildContext<'_>) -> Option<Block> {
    let (technical, soft) = form.named_skills();
    if technical.is_empty() && soft.is_empty() {
        return None;
    }

    let editable = editable_attr(ctx.editable);
    let mut html = section_open(BlockKind::Skills);
    let _ = write!(html, r#"<h2 {editable}>Skills</h2>"#);

    let mut categories = 0usize;
    for (title, skills) in [("Technical skills", &technical), ("Soft skills", &soft)] {
        if skills.is_empty() {
            continue;
        }
        categories += 1;
        let _ = write!(
            html,
            r#"<div class="cv-skills-category"><h4>{title}</h4><div class="cv-skills-list">"#
        );
        for skill in skills.iter() {
            let level = skill.level.min(100);
            let _ = write!(
                html,
                r#"<div class="cv-skill-item"><span class="cv-skill-name">{}</span><div class="cv-skill-bar"><div class="cv-skill-progress" style="width: {level}%"></div></div></div>"#,
                escape_html(skill.name.trim())
            );
        }
        html.push_str("</div></div>");
    }
    html.push_str("</div>");

    let text_mm = (char_len(&form.skills_text()) / 100.0 * SKILLS_MM_PER_100_CHARS).min(SKILLS_TEXT_CAP_MM);
    let height = SECTION_TITLE_MM + categories as f32 * SKILL_CATEGORY_MM + text_mm;
    Some(Block::new(
        BlockKind::Skills,
        html,
        ctx.heights.section_height(height, categories),
    ))
}

fn build_languages(form: &FormData, ctx: &BuildContext<'_>) -> Option<Block> {
    let languages: Vec<_> = form
        .languages
        .iter()
        .filter(|l| !l.name.trim().is_empty())
        .collect();
    if languages.is_empty() {
        return None;
    }

    let editable = editable_attr(ctx.editable);
    let mut html = section_open(BlockKind::Languages);
    let _ = write!(html, r#"<h2 {editable}>Languages</h2><div class="cv-languages-list">"#);
    for lang in &languages {
        let _ = write!(
            html,
            r#"<div class="cv-language-item"><span class="cv-language-name">{}</span><span class="cv-language-level">{}</span></div>"#,
            escape_html(lang.name.trim()),
            escape_html(lang.level.trim())
        );
    }
    html.push_str("</div></div>");

    let height = SECTION_TITLE_MM + languages.len() as f32 * LANGUAGE_ENTRY_MM;
    Some(Block::new(
        BlockKind::Languages,
        html,
        ctx.heights.section_height(height, languages.len()),
    ))
}

fn build_certifications(form: &FormData, ctx: &BuildContext<'_>) -> Option<Block> {
    let certs: Vec<_> = form
        .certifications
        .iter()
        .filter(|c| !c.name.trim().is_empty())
        .collect();
    if certs.is_empty() {
        return None;
    }

    let editable = editable_attr(ctx.editable);
    let mut html = section_open(BlockKind::Certifications);
    let _ = write!(html, r#"<h2 {editable}>Certifications</h2>"#);
    for cert in &certs {
        let details: Vec<String> = [cert.issuer.trim().to_string(), format_month(&cert.date)]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(|s| escape_html(&s))
            .collect();
        let _ = write!(
            html,
            r#"<div class="cv-certification-item"><div class="cv-certification-name">{}</div><div class="cv-certification-details">{}"#,
            escape_html(cert.name.trim()),
            details.join(" • ")
        );
        if !cert.url.trim().is_empty() {
            let _ = write!(html, r#" • <a href="{}">Verify</a>"#, escape_html(cert.url.trim()));
        }
        html.push_str("</div></div>");
    }
    html.push_str("</div>");

    let height = SECTION_TITLE_MM + certs.len() as f32 * CERTIFICATION_ENTRY_MM;
    Some(Block::new(
        BlockKind::Certifications,
        html,
        ctx.heights.section_height(height, certs.len()),
    ))
}

fn build_projects(form: &FormData, ctx: &BuildContext<'_>) -> Option<Block> {
    let projects: Vec<_> = form
        .projects
        .iter()
        .filter(|p| !p.name.trim().is_empty())
        .collect();
    if projects.is_empty() {
        return None;
    }

    let editable = editable_attr(ctx.editable);
    let mut html = section_open(BlockKind::Projects);
    let _ = write!(html, r#"<h2 {editable}>Projects</h2>"#);

    let mut height = SECTION_TITLE_MM;
    for project in &projects {
        let description = project.description.trim();
        let period = project.period();
        let _ = write!(
            html,
            r#"<div class="cv-project-item"><h3 class="cv-project-name" {editable}>{}</h3>"#,
            escape_html(project.name.trim())
        );
        if !period.is_empty() {
            let _ = write!(html, r#"<p class="cv-period">{period}</p>"#);
        }
        if !description.is_empty() {
            let _ = write!(
                html,
                r#"<div class="cv-project-description" {editable}>{}</div>"#,
                format_description(description)
            );
        }
        let techs = push_technologies(&mut html, &project.technologies);
        if !project.url.trim().is_empty() {
            let _ = write!(
                html,
                r#"<div class="cv-project-url"><a href="{}">View project</a></div>"#,
                escape_html(project.url.trim())
            );
        }
        html.push_str("</div>");

        height += ENTRY_BASE_MM
            + (char_len(description) / 250.0 * EXPERIENCE_MM_PER_250_CHARS).min(ENTRY_TEXT_CAP_MM);
        if techs {
            height += TECH_TAGS_MM;
        }
    }
    html.push_str("</div>");
    Some(Block::new(
        BlockKind::Projects,
        html,
        ctx.heights.section_height(height, projects.len()),
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// Markup helpers
// ────────────────────────────────────────────────────────────────────────────

const DRAG_HANDLE: &str = r#"<div class="drag-handle">⋮⋮</div>"#;

fn section_open(kind: BlockKind) -> String {
    format!(r#"<div class="cv-section sortable" data-section="{kind}">{DRAG_HANDLE}"#)
}

fn editable_attr(editable: bool) -> &'static str {
    if editable {
        r#"contenteditable="true""#
    } else {
        r#"contenteditable="false""#
    }
}

fn push_optional(html: &mut String, class: &str, prefix: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        let _ = write!(html, r#"<p class="{class}">{prefix}{}</p>"#, escape_html(value));
    }
}

/// Appends technology tags; returns whether any were written.
fn push_technologies(html: &mut String, technologies: &[String]) -> bool {
    let techs: Vec<&str> = technologies
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if techs.is_empty() {
        return false;
    }
    html.push_str(r#"<div class="cv-technologies">"#);
    for tech in techs {
        let _ = write!(html, r#"<span class="cv-tech-tag">{}</span>"#, escape_html(tech));
    }
    html.push_str("</div>");
    true
}

/// One element per non-empty line; lines starting with `•` become bullet points.
pub(crate) fn format_description(description: &str) -> String {
    description
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if line.starts_with('•') {
                format!(r#"<div class="cv-bullet-point">{}</div>"#, escape_html(line))
            } else {
                format!("<div>{}</div>", escape_html(line))
            }
        })
        .collect()
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn char_len(text: &str) -> f32 {
    text.chars().count() as f32
}

/// Restricts a user-supplied class fragment to `[a-z0-9-]`.
fn css_token(raw: &str, fallback: &str) -> String {
    let token: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase();
    if token.is_empty() {
        fallback.to_string()
    } else {
        token
    }
}

/// Accepts `#rrggbb` / `rrggbb` and returns the canonical `#rrggbb` form.
fn normalize_hex_color(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(format!("#{}", hex.to_ascii_lowercase()))
    } else {
        None
    }
}

/// Shifts each RGB channel of a `#rrggbb` color by `amount`, saturating at 0/255.
pub(crate) fn adjust_color(color: &str, amount: i32) -> String {
    let hex = color.trim_start_matches('#');
    let Ok(num) = u32::from_str_radix(hex, 16) else {
        return color.to_string();
    };
    let shift = |channel: u32| -> u32 { (channel as i32 + amount).clamp(0, 255) as u32 };
    let r = shift((num >> 16) & 0xFF);
    let g = shift((num >> 8) & 0xFF);
    let b = shift(num & 0xFF);
    format!("#{:06x}", (r << 16) | (g << 8) | b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::form::{
        CertificationEntry, EducationEntry, ExperienceEntry, LanguageEntry, ProjectEntry,
        SkillEntry,
    };

    fn ctx(hidden: &BTreeSet<BlockKind>) -> BuildContext<'_> {
        BuildContext {
            hidden,
            heights: HeightModel::default(),
            editable: false,
        }
    }

    fn full_form() -> FormData {
        FormData {
            full_name: "Ada Lovelace".to_string(),
            job_title: "Analyst".to_string(),
            email: "ada@example.com".to_string(),
            summary: "Mathematician.".to_string(),
            experience: vec![ExperienceEntry {
                title: "Analyst".to_string(),
                company: "Engine Co".to_string(),
                start_date: "1842-01".to_string(),
                current: true,
                description: "Wrote the first program.".to_string(),
                ..Default::default()
            }],
            education: vec![EducationEntry {
                degree: "Private tutoring".to_string(),
                school: "Home".to_string(),
                ..Default::default()
            }],
            technical_skills: vec![SkillEntry {
                name: "Analysis".to_string(),
                level: 95,
            }],
            languages: vec![LanguageEntry {
                name: "French".to_string(),
                level: "Fluent".to_string(),
            }],
            certifications: vec![CertificationEntry {
                name: "Royal Society".to_string(),
                issuer: "RS".to_string(),
                ..Default::default()
            }],
            projects: vec![ProjectEntry {
                name: "Notes on the Engine".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn kinds(blocks: &[Block]) -> Vec<BlockKind> {
        blocks.iter().map(|b| b.kind).collect()
    }

    #[test]
    fn test_full_form_builds_all_sections_in_default_order() {
        let hidden = BTreeSet::new();
        let blocks = build_blocks(&full_form(), &ctx(&hidden));
        assert_eq!(
            kinds(&blocks),
            vec![
                BlockKind::Header,
                BlockKind::Summary,
                BlockKind::Experience,
                BlockKind::Education,
                BlockKind::Skills,
                BlockKind::Languages,
                BlockKind::Certifications,
                BlockKind::Projects,
            ]
        );
        assert!(blocks.iter().all(|b| b.estimated_height_mm > 0.0));
    }

    #[test]
    fn test_empty_form_builds_no_blocks() {
        let hidden = BTreeSet::new();
        assert!(build_blocks(&FormData::default(), &ctx(&hidden)).is_empty());
    }

    #[test]
    fn test_blank_entries_do_not_create_section() {
        let form = FormData {
            experience: vec![ExperienceEntry::default(), ExperienceEntry::default()],
            languages: vec![LanguageEntry {
                name: " ".to_string(),
                level: "B2".to_string(),
            }],
            ..Default::default()
        };
        let hidden = BTreeSet::new();
        assert!(build_blocks(&form, &ctx(&hidden)).is_empty());
    }

    #[test]
    fn test_hidden_kinds_are_skipped() {
        let hidden: BTreeSet<BlockKind> = [BlockKind::Summary, BlockKind::Projects].into();
        let blocks = build_blocks(&full_form(), &ctx(&hidden));
        assert!(!kinds(&blocks).contains(&BlockKind::Summary));
        assert!(!kinds(&blocks).contains(&BlockKind::Projects));
        assert!(kinds(&blocks).contains(&BlockKind::Header));
    }

    #[test]
    fn test_summary_height_monotonic_and_capped() {
        let hidden = BTreeSet::new();
        let height_for = |len: usize| {
            let form = FormData {
                summary: "x".repeat(len),
                ..Default::default()
            };
            build_blocks(&form, &ctx(&hidden))[0].estimated_height_mm
        };
        let short = height_for(50);
        let medium = height_for(400);
        let long = height_for(5000);
        let longer = height_for(50_000);
        assert!(short < medium);
        assert!(medium <= long);
        assert_eq!(long, longer, "text term is capped");
        assert!((longer - (SUMMARY_BASE_MM + SUMMARY_TEXT_CAP_MM)).abs() < 1e-3);
    }

    #[test]
    fn test_experience_height_sums_entries() {
        let hidden = BTreeSet::new();
        let entry = ExperienceEntry {
            title: "Dev".to_string(),
            company: "Co".to_string(),
            ..Default::default()
        };
        let form = FormData {
            experience: vec![entry.clone(), entry.clone(), entry],
            ..Default::default()
        };
        let blocks = build_blocks(&form, &ctx(&hidden));
        let expected = SECTION_TITLE_MM + 3.0 * ENTRY_BASE_MM;
        assert!((blocks[0].estimated_height_mm - expected).abs() < 1e-3);
    }

    #[test]
    fn test_banner_disabled_yields_no_block() {
        let mut form = full_form();
        form.recruitment_banner.show = false;
        let hidden = BTreeSet::new();
        let blocks = build_blocks(&form, &ctx(&hidden));
        assert!(!kinds(&blocks).contains(&BlockKind::RecruitmentBanner));
    }

    #[test]
    fn test_banner_zero_height_yields_hidden_placeholder() {
        let mut form = full_form();
        form.recruitment_banner.show = true;
        form.recruitment_banner.height_mm = 0.0;
        let hidden = BTreeSet::new();
        let blocks = build_blocks(&form, &ctx(&hidden));
        let banner = &blocks[0];
        assert_eq!(banner.kind, BlockKind::RecruitmentBanner);
        assert_eq!(banner.estimated_height_mm, 0.0);
        assert!(banner.markup.contains("display: none"));
    }

    #[test]
    fn test_banner_enabled_height_and_pin() {
        let mut form = full_form();
        form.recruitment_banner.show = true;
        form.recruitment_banner.fixed = true;
        form.recruitment_banner.height_mm = 20.0;
        form.recruitment_banner.company_name = "Globex".to_string();
        let hidden = BTreeSet::new();
        let blocks = build_blocks(&form, &ctx(&hidden));
        let banner = &blocks[0];
        assert_eq!(banner.estimated_height_mm, 20.0 + BANNER_GAP_MM);
        assert!(banner.pinned);
        assert!(banner.markup.contains("fixed-banner"));
        assert!(!banner.markup.contains("drag-handle"), "pinned banner cannot be dragged");
        assert!(banner.markup.contains("Globex"));
    }

    #[test]
    fn test_markup_is_escaped() {
        let form = FormData {
            full_name: "<script>alert(1)</script>".to_string(),
            ..Default::default()
        };
        let hidden = BTreeSet::new();
        let blocks = build_blocks(&form, &ctx(&hidden));
        assert!(!blocks[0].markup.contains("<script>"));
        assert!(blocks[0].markup.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_editable_flag_reaches_markup() {
        let hidden = BTreeSet::new();
        let mut context = ctx(&hidden);
        context.editable = true;
        let blocks = build_blocks(&full_form(), &context);
        assert!(blocks[0].markup.contains(r#"contenteditable="true""#));
    }

    #[test]
    fn test_spacing_settings_raise_estimates() {
        let hidden = BTreeSet::new();
        let total_for = |section: f32, paragraph: f32| -> f32 {
            let settings = CustomizationSettings {
                section_spacing: section,
                paragraph_spacing: paragraph,
                ..Default::default()
            };
            let context = BuildContext {
                hidden: &hidden,
                heights: HeightModel::from_settings(&settings),
                editable: false,
            };
            build_blocks(&full_form(), &context)
                .iter()
                .map(|b| b.estimated_height_mm)
                .sum()
        };

        let tight = total_for(4.0, 2.5);
        let loose = total_for(30.0, 20.0);
        // 8 sections and 7 entry-bearing ones with one entry each (skills: one category).
        let expected = 8.0 * (30.0 - 4.0) + 7.0 * (20.0 - 2.5);
        assert!((loose - tight - expected).abs() < 1e-2, "{tight} -> {loose}");
    }

    #[test]
    fn test_spacing_can_push_a_block_to_the_next_page() {
        use crate::layout::paginate::{paginate, PageCapacity, PaginationPolicy};

        let hidden = BTreeSet::new();
        let pages_for = |section: f32| {
            let settings = CustomizationSettings {
                section_spacing: section,
                ..Default::default()
            };
            let context = BuildContext {
                hidden: &hidden,
                heights: HeightModel::from_settings(&settings),
                editable: false,
            };
            let blocks = build_blocks(&full_form(), &context);
            let capacity = PageCapacity::from_margins(15.0, 15.0);
            paginate(blocks, capacity, PaginationPolicy { requested_max_pages: 1 })
                .pages
                .len()
        };
        assert_eq!(pages_for(0.0), 1);
        assert!(pages_for(30.0) > 1);
    }

    #[test]
    fn test_height_model_scales_with_font_size() {
        let mut settings = CustomizationSettings::default();
        assert_eq!(HeightModel::from_settings(&settings).scale, 1.0);
        settings.base_font_size = 21.0;
        assert!((HeightModel::from_settings(&settings).scale - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_format_description_bullets() {
        let html = format_description("• first\nplain\n\n• second");
        assert_eq!(
            html,
            r#"<div class="cv-bullet-point">• first</div><div>plain</div><div class="cv-bullet-point">• second</div>"#
        );
    }

    #[test]
    fn test_adjust_color_saturates() {
        assert_eq!(adjust_color("#3B82F6", -20), "#276ee2");
        assert_eq!(adjust_color("#000000", -20), "#000000");
        assert_eq!(adjust_color("#ffffff", 20), "#ffffff");
    }
}
