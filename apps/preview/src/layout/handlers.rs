use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::layout::block::BlockKind;
use crate::layout::resolver::BlockListing;
use crate::state::AppState;

fn parse_kind(raw: &str) -> Result<BlockKind, AppError> {
    raw.parse::<BlockKind>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// GET /api/v1/layout/blocks
pub async fn handle_list_blocks(State(state): State<AppState>) -> Json<Vec<BlockListing>> {
    Json(state.bridge.layout_preferences().await.listing())
}

#[derive(Debug, Deserialize)]
pub struct OrderBody {
    pub order: Vec<String>,
}

/// PUT /api/v1/layout/order
///
/// Unlike persisted state, request bodies are strict: an unknown kind is rejected.
pub async fn handle_set_order(
    State(state): State<AppState>,
    Json(body): Json<OrderBody>,
) -> Result<Json<Vec<BlockListing>>, AppError> {
    let order = body
        .order
        .iter()
        .map(|raw| parse_kind(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut prefs = state.bridge.layout_preferences().await;
    prefs.set_order(order);
    prefs.persist_order(state.store.as_ref()).await?;
    state.bridge.request_regeneration();
    Ok(Json(prefs.listing()))
}

#[derive(Debug, Deserialize)]
pub struct HiddenBody {
    pub hidden: bool,
}

/// PUT /api/v1/layout/hidden/:kind
pub async fn handle_set_hidden(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<HiddenBody>,
) -> Result<Json<Vec<BlockListing>>, AppError> {
    let kind = kind
        .parse::<BlockKind>()
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    let mut prefs = state.bridge.layout_preferences().await;
    prefs.set_hidden(kind, body.hidden);
    prefs.persist_hidden(state.store.as_ref()).await?;
    state.bridge.request_regeneration();
    Ok(Json(prefs.listing()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBody {
    pub kind: String,
    pub to_index: usize,
}

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    /// `false` when the block is pinned and the move was ignored.
    pub moved: bool,
    pub blocks: Vec<BlockListing>,
}

/// POST /api/v1/layout/move
pub async fn handle_move_block(
    State(state): State<AppState>,
    Json(body): Json<MoveBody>,
) -> Result<Json<MoveResponse>, AppError> {
    let kind = parse_kind(&body.kind)?;

    let mut prefs = state.bridge.layout_preferences().await;
    let moved = prefs.move_kind(kind, body.to_index);
    if moved {
        prefs.persist_order(state.store.as_ref()).await?;
        state.bridge.request_regeneration();
    }
    Ok(Json(MoveResponse {
        moved,
        blocks: prefs.listing(),
    }))
}
