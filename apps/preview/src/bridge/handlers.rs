use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html,
    },
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::bridge::{Notice, RenderedPage, RenderedPreview};
use crate::errors::AppError;
use crate::models::{FormData, FormValidation};
use crate::state::AppState;

/// GET /api/v1/form
pub async fn handle_get_form(State(state): State<AppState>) -> Json<FormData> {
    Json(state.bridge.form().await)
}

/// PUT /api/v1/form
pub async fn handle_put_form(
    State(state): State<AppState>,
    Json(form): Json<FormData>,
) -> Result<Json<FormValidation>, AppError> {
    let validation = state.bridge.set_form(form).await?;
    Ok(Json(validation))
}

/// GET /api/v1/preview
pub async fn handle_get_preview(
    State(state): State<AppState>,
) -> Result<Json<RenderedPreview>, AppError> {
    let preview = state
        .bridge
        .latest()
        .ok_or_else(|| AppError::NotFound("No preview has been rendered yet".to_string()))?;
    Ok(Json(preview.as_ref().clone()))
}

/// GET /api/v1/preview/html
pub async fn handle_get_preview_html(
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let preview = state
        .bridge
        .latest()
        .ok_or_else(|| AppError::NotFound("No preview has been rendered yet".to_string()))?;
    Ok(Html(format!(
        "<style>\n{}\n</style>\n{}",
        preview.css, preview.html
    )))
}

/// POST /api/v1/preview/regenerate
///
/// Runs a cycle immediately, bypassing the debounce window.
pub async fn handle_regenerate(
    State(state): State<AppState>,
) -> Result<Json<RenderedPreview>, AppError> {
    let preview = match state.bridge.regenerate().await {
        Some(preview) => preview,
        None => state.bridge.latest().ok_or_else(|| {
            AppError::NotFound("No preview surface is attached".to_string())
        })?,
    };
    Ok(Json(preview.as_ref().clone()))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditModeBody {
    pub enabled: bool,
}

/// PUT /api/v1/preview/edit-mode
pub async fn handle_set_edit_mode(
    State(state): State<AppState>,
    Json(body): Json<EditModeBody>,
) -> Json<EditModeBody> {
    state.bridge.set_edit_mode(body.enabled);
    Json(EditModeBody {
        enabled: state.bridge.edit_mode(),
    })
}

#[derive(Debug, Deserialize)]
pub struct EnrichmentFailureBody {
    pub source: String,
    pub message: String,
}

/// POST /api/v1/notices/enrichment-failure
pub async fn handle_enrichment_failure(
    State(state): State<AppState>,
    Json(body): Json<EnrichmentFailureBody>,
) -> Result<(StatusCode, Json<Notice>), AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }
    let source = match body.source.trim() {
        "" => "enrichment",
        s => s,
    };
    let notice = state
        .bridge
        .report_enrichment_failure(source, body.message.trim());
    Ok((StatusCode::ACCEPTED, Json(notice)))
}

/// Preview event payload: everything but the markup, which clients fetch from
/// `/api/v1/preview/html` when they need it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEvent {
    pub cycle: u64,
    pub pages: Vec<RenderedPage>,
    pub realized_max_pages: u32,
    pub grew: bool,
    pub edit_mode: bool,
    pub fallback: bool,
    pub generated_at: DateTime<Utc>,
}

impl From<&RenderedPreview> for PreviewEvent {
    fn from(preview: &RenderedPreview) -> Self {
        Self {
            cycle: preview.cycle,
            pages: preview.pages.clone(),
            realized_max_pages: preview.realized_max_pages,
            grew: preview.grew,
            edit_mode: preview.edit_mode,
            fallback: preview.fallback,
            generated_at: preview.generated_at,
        }
    }
}

/// GET /api/v1/events
///
/// Server-sent events: `preview` for the current and every later published cycle,
/// `notice` for each transient notice.
pub async fn handle_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let previews = WatchStream::new(state.bridge.subscribe_preview())
        .filter_map(|preview| preview)
        .map(|preview| {
            Event::default()
                .event("preview")
                .json_data(PreviewEvent::from(preview.as_ref()))
        });

    let notices = BroadcastStream::new(state.bridge.subscribe_notices())
        .filter_map(|notice| match notice {
            Ok(notice) => Some(notice),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "Notice subscriber lagged; dropping notices");
                None
            }
        })
        .map(|notice| Event::default().event("notice").json_data(notice));

    Sse::new(previews.merge(notices)).keep_alive(KeepAlive::default())
}
