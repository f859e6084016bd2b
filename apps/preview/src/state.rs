use std::sync::Arc;

use crate::bridge::RenderBridge;
use crate::config::Config;
use crate::customization::CustomizationManager;
use crate::store::PreferenceStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Backend for layout preferences, form data and customization mirrors.
    pub store: Arc<dyn PreferenceStore>,
    pub customization: Arc<CustomizationManager>,
    pub bridge: Arc<RenderBridge>,
    pub config: Config,
}
