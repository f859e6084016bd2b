pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::bridge::handlers as bridge;
use crate::customization::handlers as customization;
use crate::layout::handlers as layout;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Form record
        .route(
            "/api/v1/form",
            get(bridge::handle_get_form).put(bridge::handle_put_form),
        )
        // Preview
        .route("/api/v1/preview", get(bridge::handle_get_preview))
        .route("/api/v1/preview/html", get(bridge::handle_get_preview_html))
        .route(
            "/api/v1/preview/regenerate",
            post(bridge::handle_regenerate),
        )
        .route(
            "/api/v1/preview/edit-mode",
            put(bridge::handle_set_edit_mode),
        )
        // Block order & visibility
        .route("/api/v1/layout/blocks", get(layout::handle_list_blocks))
        .route("/api/v1/layout/order", put(layout::handle_set_order))
        .route(
            "/api/v1/layout/hidden/:kind",
            put(layout::handle_set_hidden),
        )
        .route("/api/v1/layout/move", post(layout::handle_move_block))
        // Customization
        .route(
            "/api/v1/customization",
            get(customization::handle_get_customization)
                .patch(customization::handle_patch_customization),
        )
        .route(
            "/api/v1/customization/reset",
            post(customization::handle_reset_customization),
        )
        .route(
            "/api/v1/customization/spacing",
            get(customization::handle_get_spacing).put(customization::handle_apply_spacing),
        )
        .route(
            "/api/v1/customization/spacing/reset",
            post(customization::handle_reset_spacing),
        )
        .route(
            "/api/v1/customization/optimize-spacing",
            post(customization::handle_optimize_spacing),
        )
        .route(
            "/api/v1/customization/presets",
            get(customization::handle_list_presets),
        )
        .route(
            "/api/v1/customization/presets/:name",
            post(customization::handle_save_preset),
        )
        .route(
            "/api/v1/customization/presets/:name/load",
            post(customization::handle_load_preset),
        )
        .route("/api/v1/pages/add", post(customization::handle_add_page))
        .route(
            "/api/v1/pages/remove",
            post(customization::handle_remove_page),
        )
        // Notices and live updates
        .route(
            "/api/v1/notices/enrichment-failure",
            post(bridge::handle_enrichment_failure),
        )
        .route("/api/v1/events", get(bridge::handle_events))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::bridge::{RenderBridge, TracingSurface};
    use crate::config::{Config, StoreBackend};
    use crate::customization::CustomizationManager;
    use crate::store::{MemoryStore, PreferenceStore};

    async fn test_state() -> AppState {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryStore::new());
        let customization = Arc::new(CustomizationManager::load(store.clone()).await);
        let debounce = Duration::from_millis(400);
        let bridge = RenderBridge::load(store.clone(), customization.clone(), debounce).await;
        bridge.attach_surface(Arc::new(TracingSurface)).await;
        AppState {
            store,
            customization,
            bridge,
            config: Config {
                port: 0,
                rust_log: "debug".to_string(),
                store: StoreBackend::Memory,
                debounce,
            },
        }
    }

    async fn send(state: &AppState, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state().await;
        let (status, body) = send(&state, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_preview_not_found_before_first_cycle() {
        let state = test_state().await;
        let (status, body) = send(&state, Method::GET, "/api/v1/preview", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_put_form_then_regenerate() {
        let state = test_state().await;
        let form = json!({
            "fullName": "Ada Lovelace",
            "summary": "Analyst of the engine.",
            "experience": [{"title": "Analyst", "startDate": "1842-01", "current": true}]
        });
        let (status, body) = send(&state, Method::PUT, "/api/v1/form", Some(form)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["passed"], false);
        assert_eq!(body["issues"][0]["field"], "company");

        let (status, body) =
            send(&state, Method::POST, "/api/v1/preview/regenerate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pages"].as_array().unwrap().len(), 2);
        assert_eq!(body["pages"][0]["blockKinds"][0], "header");

        let (status, _) = send(&state, Method::GET, "/api/v1/preview", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_layout_order_hidden_and_move() {
        let state = test_state().await;

        let (status, body) = send(
            &state,
            Method::PUT,
            "/api/v1/layout/order",
            Some(json!({"order": ["skills", "header"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["kind"], "skills");

        let (status, body) = send(
            &state,
            Method::PUT,
            "/api/v1/layout/hidden/summary",
            Some(json!({"hidden": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let summary = body
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["kind"] == "summary")
            .unwrap();
        assert_eq!(summary["visible"], false);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/v1/layout/move",
            Some(json!({"kind": "projects", "toIndex": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["moved"], true);
        assert_eq!(body["blocks"][0]["kind"], "projects");
    }

    #[tokio::test]
    async fn test_layout_rejects_unknown_kinds() {
        let state = test_state().await;
        let (status, _) = send(
            &state,
            Method::PUT,
            "/api/v1/layout/order",
            Some(json!({"order": ["footer"]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &state,
            Method::PUT,
            "/api/v1/layout/hidden/footer",
            Some(json!({"hidden": true})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_customization_patch_presets_and_pages() {
        let state = test_state().await;

        let (status, body) = send(
            &state,
            Method::PATCH,
            "/api/v1/customization",
            Some(json!({"pageMarginTop": "22", "unknown": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pageMarginTop"], 22.0);

        let (status, _) = send(
            &state,
            Method::POST,
            "/api/v1/customization/presets/roomy",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&state, Method::GET, "/api/v1/customization/presets", None).await;
        assert_eq!(body, json!(["roomy"]));

        let (status, _) = send(
            &state,
            Method::POST,
            "/api/v1/customization/presets/missing/load",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&state, Method::POST, "/api/v1/pages/add", None).await;
        assert_eq!(body["maxPages"], 3);
        for _ in 0..5 {
            send(&state, Method::POST, "/api/v1/pages/remove", None).await;
        }
        let (_, body) = send(&state, Method::GET, "/api/v1/customization", None).await;
        assert_eq!(body["maxPages"], 1);
    }

    #[tokio::test]
    async fn test_spacing_panel_and_optimize() {
        let state = test_state().await;
        let (status, body) = send(
            &state,
            Method::PUT,
            "/api/v1/customization/spacing",
            Some(json!({"sectionSpacing": 8, "itemSpacing": 3, "pageMargins": 14, "lineHeight": 1.4})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sectionSpacing"], 8.0);
        assert_eq!(body["pageMarginRight"], 14.0);

        let (_, panel) = send(&state, Method::GET, "/api/v1/customization/spacing", None).await;
        assert_eq!(panel["itemSpacing"], 3.0);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/v1/customization/optimize-spacing",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sectionSpacing"], 1.5);
        assert_eq!(body["pageMarginTop"], 12.0);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/v1/customization/spacing/reset",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sectionSpacing"], 6.0);

        let (status, _) = send(
            &state,
            Method::PUT,
            "/api/v1/customization/spacing",
            Some(json!({"sectionSpacing": "wide"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_customization_patch_must_be_object() {
        let state = test_state().await;
        let (status, _) = send(
            &state,
            Method::PATCH,
            "/api/v1/customization",
            Some(json!([1, 2])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_enrichment_failure_notice() {
        let state = test_state().await;
        let mut notices = state.bridge.subscribe_notices();
        let (status, body) = send(
            &state,
            Method::POST,
            "/api/v1/notices/enrichment-failure",
            Some(json!({"source": "summary-improvement", "message": "upstream timeout"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["kind"], "enrichment-failure");
        assert_eq!(notices.recv().await.unwrap().message, "upstream timeout");
    }

    #[tokio::test]
    async fn test_event_stream_pushes_preview_and_notices() {
        use tokio_stream::StreamExt;

        let state = test_state().await;
        state.bridge.regenerate().await.unwrap();

        let request = Request::builder()
            .uri("/api/v1/events")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        let mut body = response.into_body().into_data_stream();

        state
            .bridge
            .report_enrichment_failure("summary-improvement", "upstream timeout");

        let mut received = String::new();
        while !(received.contains("event: preview") && received.contains("event: notice")) {
            let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            received.push_str(&String::from_utf8_lossy(&chunk));
        }
        assert!(received.contains(r#""cycle":1"#));
        assert!(received.contains("upstream timeout"));
        assert!(!received.contains("cv-page-footer"), "markup is not streamed");
    }

    #[tokio::test]
    async fn test_edit_mode_toggle() {
        let state = test_state().await;
        let (status, body) = send(
            &state,
            Method::PUT,
            "/api/v1/preview/edit-mode",
            Some(json!({"enabled": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enabled"], true);
        assert!(state.bridge.edit_mode());
    }
}
