use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::customization::{CustomizationSettings, SpacingSettings};
use crate::errors::AppError;
use crate::state::AppState;

const MAX_PRESET_NAME_LEN: usize = 64;

fn validate_preset_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_PRESET_NAME_LEN {
        return Err(AppError::Validation(format!(
            "preset name must be 1-{MAX_PRESET_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

/// GET /api/v1/customization
pub async fn handle_get_customization(
    State(state): State<AppState>,
) -> Json<CustomizationSettings> {
    Json(state.customization.snapshot().await)
}

/// PATCH /api/v1/customization
///
/// Partial object; unknown keys are ignored, invalid values keep the current setting.
pub async fn handle_patch_customization(
    State(state): State<AppState>,
    Json(patch): Json<Value>,
) -> Result<Json<CustomizationSettings>, AppError> {
    if !patch.is_object() {
        return Err(AppError::Validation(
            "customization patch must be a JSON object".to_string(),
        ));
    }
    let settings = state.customization.update(&patch).await?;
    state.bridge.request_regeneration();
    Ok(Json(settings))
}

/// POST /api/v1/customization/reset
pub async fn handle_reset_customization(
    State(state): State<AppState>,
) -> Result<Json<CustomizationSettings>, AppError> {
    let settings = state.customization.reset().await?;
    state.bridge.request_regeneration();
    Ok(Json(settings))
}

/// GET /api/v1/customization/spacing
pub async fn handle_get_spacing(State(state): State<AppState>) -> Json<SpacingSettings> {
    Json(SpacingSettings::from_settings(
        &state.customization.snapshot().await,
    ))
}

/// PUT /api/v1/customization/spacing
pub async fn handle_apply_spacing(
    State(state): State<AppState>,
    Json(spacing): Json<SpacingSettings>,
) -> Result<Json<CustomizationSettings>, AppError> {
    let settings = state.customization.apply_spacing(&spacing).await?;
    state.bridge.request_regeneration();
    Ok(Json(settings))
}

/// POST /api/v1/customization/spacing/reset
pub async fn handle_reset_spacing(
    State(state): State<AppState>,
) -> Result<Json<CustomizationSettings>, AppError> {
    let settings = state.customization.reset_spacing().await?;
    state.bridge.request_regeneration();
    Ok(Json(settings))
}

/// POST /api/v1/customization/optimize-spacing
pub async fn handle_optimize_spacing(
    State(state): State<AppState>,
) -> Result<Json<CustomizationSettings>, AppError> {
    let settings = state.customization.optimize_spacing().await?;
    state.bridge.request_regeneration();
    Ok(Json(settings))
}

/// GET /api/v1/customization/presets
pub async fn handle_list_presets(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.customization.preset_names().await)
}

/// POST /api/v1/customization/presets/:name
pub async fn handle_save_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    let name = validate_preset_name(&name)?;
    state.customization.save_preset(name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/customization/presets/:name/load
pub async fn handle_load_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CustomizationSettings>, AppError> {
    let name = validate_preset_name(&name)?;
    let settings = state
        .customization
        .load_preset(name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Preset '{name}' not found")))?;
    state.bridge.request_regeneration();
    Ok(Json(settings))
}

/// POST /api/v1/pages/add
pub async fn handle_add_page(
    State(state): State<AppState>,
) -> Result<Json<CustomizationSettings>, AppError> {
    let settings = state.customization.add_page().await?;
    state.bridge.request_regeneration();
    Ok(Json(settings))
}

/// POST /api/v1/pages/remove
pub async fn handle_remove_page(
    State(state): State<AppState>,
) -> Result<Json<CustomizationSettings>, AppError> {
    let settings = state.customization.remove_page().await?;
    state.bridge.request_regeneration();
    Ok(Json(settings))
}
