//! Customization State: typography, spacing and layout-mode settings.
//!
//! Settings are an immutable snapshot: every change produces a new value through
//! [`CustomizationSettings::merge_value`] + [`CustomizationSettings::normalize`], and
//! the [`manager::CustomizationManager`] is the single owner that swaps snapshots.

pub mod handlers;
pub mod manager;

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::layout::paginate::PageCapacity;

pub use manager::CustomizationManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    #[default]
    Single,
    TwoColumn,
    Sidebar,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Single => "single",
            LayoutMode::TwoColumn => "two-column",
            LayoutMode::Sidebar => "sidebar",
        }
    }

    /// Multi-column modes get the dense preset when switched into.
    pub fn is_dense(self) -> bool {
        !matches!(self, LayoutMode::Single)
    }
}

/// Sizes in `pt`, distances in `mm`, column width in `%`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationSettings {
    pub font_family: String,
    pub base_font_size: f32,
    pub line_height: f32,
    pub letter_spacing: f32,
    pub page_margin_top: f32,
    pub page_margin_bottom: f32,
    pub page_margin_left: f32,
    pub page_margin_right: f32,
    pub section_spacing: f32,
    pub paragraph_spacing: f32,
    pub layout_type: LayoutMode,
    pub left_column_width: f32,
    pub column_gap: f32,
    /// User intent for the page count. The pagination pass may realize more.
    pub max_pages: u32,
    pub h1_size: f32,
    pub h2_size: f32,
    pub h3_size: f32,
    pub title_spacing: f32,
    pub show_section_lines: bool,
    pub line_thickness: f32,
    pub line_color: String,
    pub line_margin: f32,
}

impl Default for CustomizationSettings {
    fn default() -> Self {
        Self {
            font_family: "Arial, sans-serif".to_string(),
            base_font_size: 10.5,
            line_height: 1.3,
            letter_spacing: 0.0,
            page_margin_top: 15.0,
            page_margin_bottom: 15.0,
            page_margin_left: 15.0,
            page_margin_right: 15.0,
            section_spacing: 4.0,
            paragraph_spacing: 2.5,
            layout_type: LayoutMode::Single,
            left_column_width: 38.0,
            column_gap: 5.0,
            max_pages: 2,
            h1_size: 16.0,
            h2_size: 13.0,
            h3_size: 12.0,
            title_spacing: 1.5,
            show_section_lines: true,
            line_thickness: 0.8,
            line_color: "#cccccc".to_string(),
            line_margin: 0.8,
        }
    }
}

pub const MAX_PAGES_LIMIT: u32 = 50;

/// Spacing panel values, persisted under `cv-spacing-settings`. `pageMargins`
/// applies to all four sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacingSettings {
    pub section_spacing: f32,
    pub item_spacing: f32,
    pub page_margins: f32,
    pub line_height: f32,
}

impl Default for SpacingSettings {
    fn default() -> Self {
        Self {
            section_spacing: 6.0,
            item_spacing: 4.0,
            page_margins: 12.0,
            line_height: 1.3,
        }
    }
}

impl SpacingSettings {
    /// Panel view of `settings`; the top margin stands in for all four.
    pub fn from_settings(settings: &CustomizationSettings) -> Self {
        Self {
            section_spacing: settings.section_spacing,
            item_spacing: settings.paragraph_spacing,
            page_margins: settings.page_margin_top,
            line_height: settings.line_height,
        }
    }

    pub fn to_patch(&self) -> Value {
        serde_json::to_value(self)
            .map(|raw| spacing_patch(&raw))
            .unwrap_or(Value::Null)
    }
}

/// Panel field and the settings fields it drives.
const SPACING_FIELDS: [(&str, &[&str]); 4] = [
    ("sectionSpacing", &["sectionSpacing"]),
    ("itemSpacing", &["paragraphSpacing"]),
    (
        "pageMargins",
        &["pageMarginTop", "pageMarginBottom", "pageMarginLeft", "pageMarginRight"],
    ),
    ("lineHeight", &["lineHeight"]),
];

/// Translates a raw spacing panel object into a settings patch. Missing fields are
/// skipped; values go through the usual merge coercion.
pub fn spacing_patch(raw: &Value) -> Value {
    let mut patch = Map::new();
    if let Some(raw) = raw.as_object() {
        for (source, targets) in SPACING_FIELDS {
            if let Some(value) = raw.get(source) {
                for target in targets {
                    patch.insert(target.to_string(), value.clone());
                }
            }
        }
    }
    Value::Object(patch)
}

/// Ceilings used by the compact-spacing operation.
const COMPACT_SECTION_SPACING: f32 = 1.5;
const COMPACT_PARAGRAPH_SPACING: f32 = 1.0;
const COMPACT_TITLE_SPACING: f32 = 0.5;
const COMPACT_LINE_MARGIN: f32 = 0.5;
const COMPACT_LINE_HEIGHT: f32 = 1.3;
const COMPACT_PAGE_MARGIN: f32 = 12.0;

// ────────────────────────────────────────────────────────────────────────────
// Merge / coercion
// ────────────────────────────────────────────────────────────────────────────

impl CustomizationSettings {
    /// Shallow-merges a JSON object over `self`.
    ///
    /// Unknown keys are dropped, numeric strings are coerced to numbers, and any
    /// value that still does not fit its field keeps the current value. Never fails;
    /// a non-object patch is ignored.
    pub fn merge_value(&self, patch: &Value) -> Self {
        let Some(patch) = patch.as_object() else {
            if !patch.is_null() {
                warn!("Customization patch is not an object; ignoring");
            }
            return self.clone();
        };

        let mut merged = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => return self.clone(),
        };

        for (key, incoming) in patch {
            let Some(current) = merged.get(key) else {
                continue;
            };
            match coerce_like(current, incoming) {
                Some(value) if field_accepts(key, &value) => {
                    merged.insert(key.clone(), value);
                }
                _ => warn!(key = %key, value = %incoming, "Ignoring invalid customization value"),
            }
        }

        match serde_json::from_value(Value::Object(merged)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Merged customization failed to decode; keeping previous");
                self.clone()
            }
        }
    }

    /// Merges `patch` over defaults. Used for persisted settings and named presets.
    pub fn from_value(value: &Value) -> Self {
        Self::default().merge_value(value).normalize()
    }

    /// Clamps every numeric field into its sane range; non-finite values take the default.
    pub fn normalize(mut self) -> Self {
        let d = Self::default();

        if self.font_family.trim().is_empty() {
            self.font_family = d.font_family;
        }
        self.base_font_size = clamp_or(self.base_font_size, 6.0, 24.0, d.base_font_size);
        self.line_height = clamp_or(self.line_height, 0.8, 3.0, d.line_height);
        self.letter_spacing = clamp_or(self.letter_spacing, -2.0, 10.0, d.letter_spacing);
        self.page_margin_top = clamp_or(self.page_margin_top, 0.0, 60.0, d.page_margin_top);
        self.page_margin_bottom =
            clamp_or(self.page_margin_bottom, 0.0, 60.0, d.page_margin_bottom);
        self.page_margin_left = clamp_or(self.page_margin_left, 0.0, 60.0, d.page_margin_left);
        self.page_margin_right = clamp_or(self.page_margin_right, 0.0, 60.0, d.page_margin_right);
        self.section_spacing = clamp_or(self.section_spacing, 0.0, 30.0, d.section_spacing);
        self.paragraph_spacing = clamp_or(self.paragraph_spacing, 0.0, 20.0, d.paragraph_spacing);
        self.left_column_width = clamp_or(self.left_column_width, 20.0, 60.0, d.left_column_width);
        self.column_gap = clamp_or(self.column_gap, 0.0, 20.0, d.column_gap);
        self.max_pages = self.max_pages.clamp(1, MAX_PAGES_LIMIT);
        self.h1_size = clamp_or(self.h1_size, 8.0, 40.0, d.h1_size);
        self.h2_size = clamp_or(self.h2_size, 8.0, 32.0, d.h2_size);
        self.h3_size = clamp_or(self.h3_size, 6.0, 28.0, d.h3_size);
        self.title_spacing = clamp_or(self.title_spacing, 0.0, 20.0, d.title_spacing);
        self.line_thickness = clamp_or(self.line_thickness, 0.0, 5.0, d.line_thickness);
        self.line_margin = clamp_or(self.line_margin, 0.0, 20.0, d.line_margin);
        if !is_hex_color(&self.line_color) {
            self.line_color = d.line_color;
        }
        self
    }

    /// Bulk settings applied once when switching into a multi-column layout.
    pub fn apply_dense_preset(mut self) -> Self {
        self.base_font_size = 10.0;
        self.line_height = 1.25;
        self.page_margin_top = 12.0;
        self.page_margin_bottom = 12.0;
        self.page_margin_left = 12.0;
        self.page_margin_right = 12.0;
        self.section_spacing = 3.5;
        self.paragraph_spacing = 2.0;
        self.left_column_width = 40.0;
        self.column_gap = 4.0;
        self.h1_size = 15.0;
        self.h2_size = 12.0;
        self.h3_size = 11.0;
        self.title_spacing = 1.2;
        self.line_thickness = 0.6;
        self.line_margin = 0.6;
        self
    }

    /// Applies a user patch: merge, the one-way dense preset on a switch into a
    /// multi-column mode, then normalisation. Switching back to `single` leaves the
    /// dense values in place.
    pub fn apply_patch(&self, patch: &Value) -> Self {
        let next = self.merge_value(patch);
        let switched = next.layout_type != self.layout_type && next.layout_type.is_dense();
        let next = if switched {
            next.apply_dense_preset()
        } else {
            next
        };
        next.normalize()
    }

    /// Tightens every spacing value to its compact ceiling. Values already tighter
    /// are kept, so applying it twice changes nothing.
    pub fn compact_spacing(&self) -> Self {
        let mut next = self.clone();
        next.section_spacing = next.section_spacing.min(COMPACT_SECTION_SPACING);
        next.paragraph_spacing = next.paragraph_spacing.min(COMPACT_PARAGRAPH_SPACING);
        next.title_spacing = next.title_spacing.min(COMPACT_TITLE_SPACING);
        next.line_margin = next.line_margin.min(COMPACT_LINE_MARGIN);
        next.line_height = next.line_height.min(COMPACT_LINE_HEIGHT);
        next.page_margin_top = next.page_margin_top.min(COMPACT_PAGE_MARGIN);
        next.page_margin_bottom = next.page_margin_bottom.min(COMPACT_PAGE_MARGIN);
        next.page_margin_left = next.page_margin_left.min(COMPACT_PAGE_MARGIN);
        next.page_margin_right = next.page_margin_right.min(COMPACT_PAGE_MARGIN);
        next.normalize()
    }

    pub fn capacity(&self) -> PageCapacity {
        capacity_for(self)
    }

    /// CSS custom-property declarations consumed by the preview stylesheet.
    pub fn css_variables(&self) -> String {
        let mut css = String::new();
        let vars: [(&str, String); 22] = [
            ("font-family", self.font_family.clone()),
            ("base-font-size", format!("{}pt", self.base_font_size)),
            ("line-height", self.line_height.to_string()),
            ("letter-spacing", format!("{}px", self.letter_spacing)),
            ("margin-top", format!("{}mm", self.page_margin_top)),
            ("margin-bottom", format!("{}mm", self.page_margin_bottom)),
            ("margin-left", format!("{}mm", self.page_margin_left)),
            ("margin-right", format!("{}mm", self.page_margin_right)),
            ("section-spacing", format!("{}mm", self.section_spacing)),
            ("paragraph-spacing", format!("{}mm", self.paragraph_spacing)),
            ("layout-type", self.layout_type.as_str().to_string()),
            ("left-column-width", format!("{}%", self.left_column_width)),
            ("column-gap", format!("{}mm", self.column_gap)),
            ("max-pages", self.max_pages.to_string()),
            ("h1-size", format!("{}pt", self.h1_size)),
            ("h2-size", format!("{}pt", self.h2_size)),
            ("h3-size", format!("{}pt", self.h3_size)),
            ("title-spacing", format!("{}mm", self.title_spacing)),
            (
                "section-line-display",
                if self.show_section_lines { "block" } else { "none" }.to_string(),
            ),
            ("line-thickness", format!("{}pt", self.line_thickness)),
            ("line-color", self.line_color.clone()),
            ("line-margin", format!("{}mm", self.line_margin)),
        ];
        css.push_str(":root {\n");
        for (name, value) in vars {
            let _ = writeln!(css, "  --cv-{name}: {value};");
        }
        css.push('}');
        css
    }
}

/// Usable page height for the given settings' vertical margins.
pub fn capacity_for(settings: &CustomizationSettings) -> PageCapacity {
    PageCapacity::from_margins(settings.page_margin_top, settings.page_margin_bottom)
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Converts `incoming` to the JSON shape of `current`, or `None` if impossible.
fn coerce_like(current: &Value, incoming: &Value) -> Option<Value> {
    match current {
        Value::Number(n) => {
            let raw = match incoming {
                Value::Number(v) => v.as_f64()?,
                Value::String(s) => s.trim().parse::<f64>().ok()?,
                _ => return None,
            };
            if !raw.is_finite() {
                return None;
            }
            if n.is_u64() {
                // Integer fields (maxPages) round; negatives clamp later via normalize.
                Some(Value::from(raw.round().max(0.0) as u64))
            } else {
                serde_json::Number::from_f64(raw).map(Value::Number)
            }
        }
        Value::Bool(_) => match incoming {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => s.trim().parse::<bool>().ok().map(Value::Bool),
            _ => None,
        },
        Value::String(_) => incoming.as_str().map(|s| Value::String(s.to_string())),
        _ => None,
    }
}

/// Field-specific validity beyond the JSON shape.
fn field_accepts(key: &str, value: &Value) -> bool {
    match key {
        "layoutType" => serde_json::from_value::<LayoutMode>(value.clone()).is_ok(),
        _ => true,
    }
}

fn clamp_or(value: f32, min: f32, max: f32, default: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}

fn is_hex_color(raw: &str) -> bool {
    let Some(hex) = raw.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_give_267mm_capacity() {
        let s = CustomizationSettings::default();
        assert_eq!(s.capacity().usable_height_mm, 267.0);
    }

    #[test]
    fn test_merge_coerces_numeric_strings_and_drops_unknown_keys() {
        let s = CustomizationSettings::default().merge_value(&json!({
            "baseFontSize": "11",
            "pageMarginTop": 20,
            "maxPages": "3",
            "madeUp": 1,
        }));
        assert_eq!(s.base_font_size, 11.0);
        assert_eq!(s.page_margin_top, 20.0);
        assert_eq!(s.max_pages, 3);
    }

    #[test]
    fn test_merge_keeps_previous_value_on_bad_input() {
        let s = CustomizationSettings::default().merge_value(&json!({
            "baseFontSize": "large",
            "layoutType": "three-column",
            "showSectionLines": "nope",
        }));
        assert_eq!(s, CustomizationSettings::default());
    }

    #[test]
    fn test_merge_non_object_patch_is_ignored() {
        let s = CustomizationSettings::default().merge_value(&json!([1, 2, 3]));
        assert_eq!(s, CustomizationSettings::default());
    }

    #[test]
    fn test_normalize_clamps_ranges() {
        let s = CustomizationSettings {
            page_margin_top: 500.0,
            page_margin_bottom: -3.0,
            base_font_size: f32::NAN,
            max_pages: 0,
            line_color: "red".to_string(),
            ..Default::default()
        }
        .normalize();
        assert_eq!(s.page_margin_top, 60.0);
        assert_eq!(s.page_margin_bottom, 0.0);
        assert_eq!(s.base_font_size, 10.5);
        assert_eq!(s.max_pages, 1);
        assert_eq!(s.line_color, "#cccccc");
        assert!(s.capacity().usable_height_mm > 0.0);
    }

    #[test]
    fn test_switch_to_sidebar_applies_dense_preset_once() {
        let start = CustomizationSettings::default();
        let dense = start.apply_patch(&json!({"layoutType": "sidebar"}));
        assert_eq!(dense.layout_type, LayoutMode::Sidebar);
        assert_eq!(dense.base_font_size, 10.0);
        assert_eq!(dense.page_margin_top, 12.0);

        // Further edits inside the same mode are not overwritten by the preset.
        let edited = dense.apply_patch(&json!({"baseFontSize": 11}));
        assert_eq!(edited.base_font_size, 11.0);

        // Switching back does not restore the previous values.
        let single = edited.apply_patch(&json!({"layoutType": "single"}));
        assert_eq!(single.layout_type, LayoutMode::Single);
        assert_eq!(single.page_margin_top, 12.0);
    }

    #[test]
    fn test_from_value_merges_over_defaults() {
        let s = CustomizationSettings::from_value(&json!({"h1Size": 20}));
        assert_eq!(s.h1_size, 20.0);
        assert_eq!(s.h2_size, 13.0);
    }

    #[test]
    fn test_spacing_patch_fans_out_page_margins() {
        let s = CustomizationSettings::default().merge_value(&spacing_patch(&json!({
            "sectionSpacing": "8",
            "itemSpacing": 3,
            "pageMargins": 10,
        })));
        assert_eq!(s.section_spacing, 8.0);
        assert_eq!(s.paragraph_spacing, 3.0);
        assert_eq!(s.page_margin_top, 10.0);
        assert_eq!(s.page_margin_right, 10.0);
        assert_eq!(s.line_height, 1.3);
    }

    #[test]
    fn test_spacing_patch_of_non_object_is_empty() {
        assert_eq!(spacing_patch(&json!("wide")), json!({}));
    }

    #[test]
    fn test_spacing_settings_round_trip_through_settings() {
        let panel = SpacingSettings {
            section_spacing: 5.0,
            item_spacing: 2.0,
            page_margins: 18.0,
            line_height: 1.5,
        };
        let s = CustomizationSettings::default().merge_value(&panel.to_patch());
        assert_eq!(SpacingSettings::from_settings(&s), panel);
    }

    #[test]
    fn test_compact_spacing_only_tightens() {
        let loose = CustomizationSettings {
            section_spacing: 10.0,
            paragraph_spacing: 0.2,
            page_margin_top: 25.0,
            page_margin_left: 8.0,
            line_height: 1.8,
            ..Default::default()
        };
        let compact = loose.compact_spacing();
        assert_eq!(compact.section_spacing, 1.5);
        assert_eq!(compact.paragraph_spacing, 0.2);
        assert_eq!(compact.page_margin_top, 12.0);
        assert_eq!(compact.page_margin_left, 8.0);
        assert_eq!(compact.line_height, 1.3);
        assert!(compact.capacity().usable_height_mm > loose.capacity().usable_height_mm);
        assert_eq!(compact.compact_spacing(), compact);
    }

    #[test]
    fn test_css_variables_block() {
        let css = CustomizationSettings::default().css_variables();
        assert!(css.starts_with(":root {"));
        assert!(css.contains("--cv-font-family: Arial, sans-serif;"));
        assert!(css.contains("--cv-margin-top: 15mm;"));
        assert!(css.contains("--cv-line-margin: 0.8mm;"));
    }
}
