//! Owning component for the customization snapshot and its persisted mirrors.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::customization::{
    spacing_patch, CustomizationSettings, SpacingSettings, MAX_PAGES_LIMIT,
};
use crate::store::{
    load_json, save_json, PreferenceStore, StoreError, KEY_CUSTOMIZATION, KEY_MARGIN_BOTTOM,
    KEY_MARGIN_LEFT, KEY_MARGIN_RIGHT, KEY_MARGIN_TOP, KEY_MAX_PAGES, KEY_PRESETS,
    KEY_SPACING_SETTINGS,
};

/// Single owner of the current settings. Readers get cloned snapshots; every write
/// persists before the snapshot is swapped, so a failed write leaves state unchanged.
pub struct CustomizationManager {
    store: Arc<dyn PreferenceStore>,
    current: RwLock<CustomizationSettings>,
}

/// Dedicated mirror keys and the settings field each one overrides on load.
const MIRRORED_FIELDS: [(&str, &str); 5] = [
    (KEY_MAX_PAGES, "maxPages"),
    (KEY_MARGIN_TOP, "pageMarginTop"),
    (KEY_MARGIN_BOTTOM, "pageMarginBottom"),
    (KEY_MARGIN_LEFT, "pageMarginLeft"),
    (KEY_MARGIN_RIGHT, "pageMarginRight"),
];

impl CustomizationManager {
    /// Merges the persisted settings object over defaults, then the spacing panel
    /// values, then any dedicated page-count / margin keys. Missing or malformed
    /// values fall back silently.
    pub async fn load(store: Arc<dyn PreferenceStore>) -> Self {
        let persisted: Option<Value> = load_json(store.as_ref(), KEY_CUSTOMIZATION).await;
        let mut settings = CustomizationSettings::from_value(&persisted.unwrap_or(Value::Null));

        if let Some(panel) = load_json::<Value>(store.as_ref(), KEY_SPACING_SETTINGS).await {
            settings = settings.merge_value(&spacing_patch(&panel));
        }

        for (key, field) in MIRRORED_FIELDS {
            if let Some(value) = load_json::<Value>(store.as_ref(), key).await {
                let mut patch = Map::new();
                patch.insert(field.to_string(), value);
                settings = settings.merge_value(&Value::Object(patch));
            }
        }
        let settings = settings.normalize();

        debug!(
            max_pages = settings.max_pages,
            layout = settings.layout_type.as_str(),
            "Customization loaded"
        );

        Self {
            store,
            current: RwLock::new(settings),
        }
    }

    pub async fn snapshot(&self) -> CustomizationSettings {
        self.current.read().await.clone()
    }

    /// Shallow-merges `patch`, persists, and returns the new settings.
    pub async fn update(&self, patch: &Value) -> Result<CustomizationSettings, StoreError> {
        let mut current = self.current.write().await;
        let next = current.apply_patch(patch);
        self.persist(&next).await?;
        *current = next.clone();
        Ok(next)
    }

    pub async fn reset(&self) -> Result<CustomizationSettings, StoreError> {
        let mut current = self.current.write().await;
        let next = CustomizationSettings::default();
        self.persist(&next).await?;
        *current = next.clone();
        info!("Customization reset to defaults");
        Ok(next)
    }

    /// Raises the page count to what the content needed. Checked against the
    /// current value under the write lock, so a limit the user set while the pass
    /// ran is never lowered. Returns the new count, or `None` when nothing changed
    /// (already at least `realized`, or at the cap).
    pub async fn grow_max_pages(&self, realized: u32) -> Result<Option<u32>, StoreError> {
        let mut current = self.current.write().await;
        let target = realized.min(MAX_PAGES_LIMIT);
        if target <= current.max_pages {
            return Ok(None);
        }
        let next = self.replace_max_pages(&mut current, target).await?;
        Ok(Some(next.max_pages))
    }

    pub async fn add_page(&self) -> Result<CustomizationSettings, StoreError> {
        let mut current = self.current.write().await;
        let pages = current.max_pages.saturating_add(1);
        self.replace_max_pages(&mut current, pages).await
    }

    /// Never goes below one page.
    pub async fn remove_page(&self) -> Result<CustomizationSettings, StoreError> {
        let mut current = self.current.write().await;
        let pages = current.max_pages.saturating_sub(1).max(1);
        self.replace_max_pages(&mut current, pages).await
    }

    async fn replace_max_pages(
        &self,
        current: &mut CustomizationSettings,
        max_pages: u32,
    ) -> Result<CustomizationSettings, StoreError> {
        let next = CustomizationSettings {
            max_pages: max_pages.clamp(1, MAX_PAGES_LIMIT),
            ..current.clone()
        };
        if next == *current {
            return Ok(next);
        }
        self.persist(&next).await?;
        *current = next.clone();
        Ok(next)
    }

    // ── Spacing ─────────────────────────────────────────────────────────────

    /// Applies the spacing panel and records it under `cv-spacing-settings`.
    pub async fn apply_spacing(
        &self,
        spacing: &SpacingSettings,
    ) -> Result<CustomizationSettings, StoreError> {
        let mut current = self.current.write().await;
        let next = current.merge_value(&spacing.to_patch()).normalize();
        self.persist(&next).await?;
        save_json(self.store.as_ref(), KEY_SPACING_SETTINGS, spacing).await?;
        *current = next.clone();
        Ok(next)
    }

    /// Drops the saved panel values and applies the panel defaults.
    pub async fn reset_spacing(&self) -> Result<CustomizationSettings, StoreError> {
        let mut current = self.current.write().await;
        let next = current
            .merge_value(&SpacingSettings::default().to_patch())
            .normalize();
        self.persist(&next).await?;
        *current = next.clone();
        info!("Spacing reset to panel defaults");
        Ok(next)
    }

    /// Tightens spacing to the compact values (never loosens).
    pub async fn optimize_spacing(&self) -> Result<CustomizationSettings, StoreError> {
        let mut current = self.current.write().await;
        let next = current.compact_spacing();
        if next == *current {
            return Ok(next);
        }
        self.persist(&next).await?;
        *current = next.clone();
        info!(
            section_spacing = next.section_spacing,
            paragraph_spacing = next.paragraph_spacing,
            "Spacing optimized"
        );
        Ok(next)
    }

    // ── Presets ─────────────────────────────────────────────────────────────

    async fn presets(&self) -> BTreeMap<String, Value> {
        load_json(self.store.as_ref(), KEY_PRESETS)
            .await
            .unwrap_or_default()
    }

    pub async fn preset_names(&self) -> Vec<String> {
        self.presets().await.into_keys().collect()
    }

    /// Saves the current settings under `name`, overwriting any preset of that name.
    pub async fn save_preset(&self, name: &str) -> Result<(), StoreError> {
        let snapshot = self.snapshot().await;
        let mut presets = self.presets().await;
        presets.insert(name.to_string(), serde_json::to_value(&snapshot)?);
        save_json(self.store.as_ref(), KEY_PRESETS, &presets).await?;
        info!(preset = name, "Customization preset saved");
        Ok(())
    }

    /// Loads a preset over defaults and makes it current. `None` if it does not exist.
    pub async fn load_preset(
        &self,
        name: &str,
    ) -> Result<Option<CustomizationSettings>, StoreError> {
        let Some(raw) = self.presets().await.remove(name) else {
            return Ok(None);
        };
        let next = CustomizationSettings::from_value(&raw);

        let mut current = self.current.write().await;
        self.persist(&next).await?;
        *current = next.clone();
        Ok(Some(next))
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    /// Writes the settings object and mirrors the page count and margins to their
    /// dedicated keys for the export collaborator. Saved spacing panel values are
    /// superseded by any settings write and removed; `apply_spacing` re-records them.
    async fn persist(&self, settings: &CustomizationSettings) -> Result<(), StoreError> {
        let store = self.store.as_ref();
        save_json(store, KEY_CUSTOMIZATION, settings).await?;
        store.remove(KEY_SPACING_SETTINGS).await?;
        save_json(store, KEY_MAX_PAGES, &settings.max_pages).await?;
        save_json(store, KEY_MARGIN_TOP, &settings.page_margin_top).await?;
        save_json(store, KEY_MARGIN_BOTTOM, &settings.page_margin_bottom).await?;
        save_json(store, KEY_MARGIN_LEFT, &settings.page_margin_left).await?;
        save_json(store, KEY_MARGIN_RIGHT, &settings.page_margin_right).await?;
        Ok(())
    }
}
