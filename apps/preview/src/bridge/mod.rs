//! Render/Sync Bridge: re-runs the layout pipeline whenever form data, layout
//! preferences or customization change, and publishes the result.
//!
//! # Concurrency model
//! - Mutations call [`RenderBridge::request_regeneration`]. A single debounce worker
//!   coalesces bursts (trailing edge, cancel-and-reschedule) into one cycle.
//! - Cycles are strictly sequential (`cycle_lock`), and a result is only published if
//!   no later cycle has been published already.
//! - The pipeline is CPU-bound and runs on `spawn_blocking`; a panic there yields the
//!   single-page fallback instead of leaving observers with a half-updated preview.

pub mod handlers;
pub mod pipeline;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::customization::CustomizationManager;
use crate::layout::{BlockKind, LayoutPreferences};
use crate::models::form::RecruitmentBanner;
use crate::models::{validate_form, FormData, FormValidation};
use crate::store::{
    load_json, save_json, PreferenceStore, StoreError, KEY_FORM_DATA, KEY_RECRUITMENT_BANNER,
};

pub use pipeline::{
    fallback_preview, run_pipeline, PipelineFn, PipelineInputs, RenderedPage, RenderedPreview,
    SharedPreview,
};

const NOTICE_CAPACITY: usize = 32;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Render target the bridge reconciles each published preview into.
pub trait PreviewSurface: Send + Sync {
    fn present(&self, preview: &RenderedPreview);
}

/// Surface used by the service process: the watch channel already holds the preview
/// for HTTP readers, so presenting only records the cycle.
pub struct TracingSurface;

impl PreviewSurface for TracingSurface {
    fn present(&self, preview: &RenderedPreview) {
        info!(
            cycle = preview.cycle,
            pages = preview.pages.len(),
            fallback = preview.fallback,
            "Preview presented"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeKind {
    EnrichmentFailure,
}

/// Transient user-visible message. Never affects pagination state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: Uuid,
    pub kind: NoticeKind,
    /// Collaborator that failed, e.g. `summary-improvement`.
    pub source: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

pub struct RenderBridge {
    store: Arc<dyn PreferenceStore>,
    customization: Arc<CustomizationManager>,
    form: RwLock<FormData>,
    edit_mode: AtomicBool,
    /// Last cycle number handed out.
    cycle: AtomicU64,
    cycle_lock: Mutex<()>,
    surface: RwLock<Option<Arc<dyn PreviewSurface>>>,
    preview_tx: watch::Sender<Option<SharedPreview>>,
    notices: broadcast::Sender<Notice>,
    trigger: OnceLock<mpsc::UnboundedSender<()>>,
    debounce: Duration,
    pipeline: PipelineFn,
}

/// Only the recruitment banner can be pinned, and only when the user fixed it.
pub fn pinned_kind(form: &FormData) -> Option<BlockKind> {
    form.recruitment_banner
        .fixed
        .then_some(BlockKind::RecruitmentBanner)
}

impl RenderBridge {
    /// Restores the last form record (and the separately persisted banner bag).
    pub async fn load(
        store: Arc<dyn PreferenceStore>,
        customization: Arc<CustomizationManager>,
        debounce: Duration,
    ) -> Arc<Self> {
        Self::with_pipeline(store, customization, debounce, run_pipeline).await
    }

    pub async fn with_pipeline(
        store: Arc<dyn PreferenceStore>,
        customization: Arc<CustomizationManager>,
        debounce: Duration,
        pipeline: PipelineFn,
    ) -> Arc<Self> {
        // The form record carries its banner; the standalone banner key only seeds a
        // process that has no record yet.
        let form = match load_json::<FormData>(store.as_ref(), KEY_FORM_DATA).await {
            Some(form) => form,
            None => FormData {
                recruitment_banner: load_json::<RecruitmentBanner>(
                    store.as_ref(),
                    KEY_RECRUITMENT_BANNER,
                )
                .await
                .unwrap_or_default(),
                ..Default::default()
            },
        };

        let (preview_tx, _) = watch::channel(None);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Arc::new(Self {
            store,
            customization,
            form: RwLock::new(form),
            edit_mode: AtomicBool::new(false),
            cycle: AtomicU64::new(0),
            cycle_lock: Mutex::new(()),
            surface: RwLock::new(None),
            preview_tx,
            notices,
            trigger: OnceLock::new(),
            debounce,
            pipeline,
        })
    }

    // ── Observers ───────────────────────────────────────────────────────────

    pub async fn attach_surface(&self, surface: Arc<dyn PreviewSurface>) {
        *self.surface.write().await = Some(surface);
    }

    pub async fn detach_surface(&self) {
        *self.surface.write().await = None;
    }

    pub fn subscribe_preview(&self) -> watch::Receiver<Option<SharedPreview>> {
        self.preview_tx.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn latest(&self) -> Option<SharedPreview> {
        self.preview_tx.borrow().clone()
    }

    // ── State ───────────────────────────────────────────────────────────────

    pub async fn form(&self) -> FormData {
        self.form.read().await.clone()
    }

    /// Replaces the form record, persists it, and schedules a regeneration.
    /// Memory is only updated once the record is stored. Validation is advisory and
    /// returned to the caller.
    pub async fn set_form(&self, form: FormData) -> Result<FormValidation, StoreError> {
        let validation = validate_form(&form);
        let banner = form.recruitment_banner.clone();
        {
            let mut current = self.form.write().await;
            save_json(self.store.as_ref(), KEY_FORM_DATA, &form).await?;
            *current = form;
        }

        // Memory already matches the record; a failed mirror write is logged only.
        if let Err(e) = save_json(self.store.as_ref(), KEY_RECRUITMENT_BANNER, &banner).await {
            warn!(error = %e, "Failed to mirror the recruitment banner");
        }
        self.request_regeneration();
        Ok(validation)
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode.load(Ordering::SeqCst)
    }

    pub fn set_edit_mode(&self, enabled: bool) {
        let previous = self.edit_mode.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            self.request_regeneration();
        }
    }

    /// Persisted order/hidden set plus the pin derived from the current banner.
    pub async fn layout_preferences(&self) -> LayoutPreferences {
        let pinned = pinned_kind(&*self.form.read().await);
        LayoutPreferences::load(self.store.as_ref())
            .await
            .with_pinned(pinned)
    }

    /// Publishes a transient notice for a failed enrichment call. Pagination state is
    /// not touched.
    pub fn report_enrichment_failure(&self, source: &str, message: &str) -> Notice {
        let notice = Notice {
            id: Uuid::new_v4(),
            kind: NoticeKind::EnrichmentFailure,
            source: source.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        };
        warn!(source, message, "Enrichment failed");
        // No subscribers is fine; notices are fire-and-forget.
        let _ = self.notices.send(notice.clone());
        notice
    }

    // ── Scheduling ──────────────────────────────────────────────────────────

    /// Starts the debounce worker. Later calls are no-ops.
    pub fn spawn_debouncer(self: &Arc<Self>) {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.trigger.set(tx).is_err() {
            debug!("Debouncer already running");
            return;
        }
        tokio::spawn(debounce_loop(Arc::downgrade(self), rx, self.debounce));
        info!(window_ms = self.debounce.as_millis() as u64, "Preview debouncer started");
    }

    /// Schedules a regeneration at the trailing edge of the debounce window.
    pub fn request_regeneration(&self) {
        match self.trigger.get() {
            Some(tx) => {
                let _ = tx.send(());
            }
            None => debug!("Debouncer not running; regeneration request dropped"),
        }
    }

    // ── Regeneration ────────────────────────────────────────────────────────

    /// Runs one full cycle now. Returns `None` (keeping the previous preview) when no
    /// surface is attached or a later cycle already published.
    pub async fn regenerate(&self) -> Option<SharedPreview> {
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = self.cycle_lock.lock().await;

        let Some(surface) = self.surface.read().await.clone() else {
            warn!(cycle, "No preview surface attached; skipping regeneration");
            return None;
        };

        let form = self.form().await;
        let inputs = PipelineInputs {
            cycle,
            prefs: LayoutPreferences::load(self.store.as_ref())
                .await
                .with_pinned(pinned_kind(&form)),
            form,
            settings: self.customization.snapshot().await,
            edit_mode: self.edit_mode(),
        };

        let pipeline = self.pipeline;
        let task_inputs = inputs.clone();
        let preview = match tokio::task::spawn_blocking(move || pipeline(&task_inputs)).await {
            Ok(preview) => preview,
            Err(e) => {
                error!(cycle, error = %e, "Preview pipeline failed; rendering fallback");
                fallback_preview(&inputs)
            }
        };

        if preview.grew {
            match self
                .customization
                .grow_max_pages(preview.realized_max_pages)
                .await
            {
                Ok(Some(max_pages)) => info!(
                    cycle,
                    requested = inputs.settings.max_pages,
                    realized = preview.realized_max_pages,
                    max_pages,
                    "Content overflowed the page limit; raised it"
                ),
                Ok(None) => debug!(
                    cycle,
                    realized = preview.realized_max_pages,
                    "Page limit already settled; not raising it"
                ),
                Err(e) => warn!(cycle, error = %e, "Failed to persist grown page limit"),
            }
        }

        let preview = Arc::new(preview);
        if !self.publish(&preview) {
            debug!(cycle, "Dropping stale regeneration result");
            return None;
        }
        surface.present(&preview);
        debug!(cycle, pages = preview.pages.len(), "Preview regenerated");
        Some(preview)
    }

    /// Swaps in `preview` unless a newer cycle is already published.
    fn publish(&self, preview: &SharedPreview) -> bool {
        self.preview_tx.send_if_modified(|current| {
            let newer_published = current.as_ref().is_some_and(|p| p.cycle >= preview.cycle);
            if newer_published {
                false
            } else {
                *current = Some(Arc::clone(preview));
                true
            }
        })
    }
}

/// Waits for a trigger, then keeps restarting the window until it elapses quietly.
async fn debounce_loop(
    bridge: Weak<RenderBridge>,
    mut rx: mpsc::UnboundedReceiver<()>,
    window: Duration,
) {
    while rx.recv().await.is_some() {
        loop {
            match tokio::time::timeout(window, rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) | Err(_) => break,
            }
        }

        let Some(bridge) = bridge.upgrade() else {
            return;
        };
        bridge.regenerate().await;
    }
    debug!("Preview debouncer stopped");
}
