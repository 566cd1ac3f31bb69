//! # REST API
//!
//! Builds the axum router that exposes the minting service over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path           | Description                              |
//! |--------|----------------|------------------------------------------|
//! | GET    | `/health`      | Liveness probe                           |
//! | GET    | `/status`      | Owner, network and initialization state  |
//! | POST   | `/badges/mint` | Init, Upgrade or Retire a badge          |
//!
//! Failures map by [`ErrorKind`]: validation 400, state 404, submission
//! 502, configuration and resolution 500.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use badge_protocol::{
    mint_badge, BadgeAction, BadgeContext, BadgeError, BadgeRequest, ErrorKind, MintResponse,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Minting context: config, owner, lazily-loaded scripts and ledger.
    pub ctx: Arc<BadgeContext>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/badges/mint", post(mint_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    pub network: String,
    /// Key hash every badge is minted for.
    pub owner_key_hash: String,
    pub max_level: u8,
    pub blueprint_loaded: bool,
    pub ledger_connected: bool,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Error body returned for every failed mint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    /// Error class, e.g. `validation` or `state`.
    pub error: String,
    pub message: String,
}

/// A [`BadgeError`] rendered as an HTTP response.
pub struct ApiError(pub BadgeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::State => StatusCode::NOT_FOUND,
            ErrorKind::Submission => StatusCode::BAD_GATEWAY,
            ErrorKind::Configuration | ErrorKind::Resolution => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.0.kind().to_string(),
            message: self.0.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.ctx.config();
    Json(StatusResponse {
        version: state.version.clone(),
        network: config.network.to_string(),
        owner_key_hash: state.ctx.owner_key_hash().to_hex(),
        max_level: config.max_level,
        blueprint_loaded: state.ctx.blueprint_loaded(),
        ledger_connected: state.ctx.ledger_connected(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn mint_handler(
    State(state): State<AppState>,
    payload: Result<Json<BadgeRequest>, JsonRejection>,
) -> Result<Json<MintResponse>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let e = BadgeError::MalformedRequest(rejection.body_text());
            state.metrics.record_request(None);
            state.metrics.record_failure(e.kind());
            tracing::warn!(error = %e, "mint request rejected");
            return Err(ApiError(e));
        }
    };
    let action = match request.action.as_deref() {
        Some(raw) => raw.parse::<BadgeAction>().ok(),
        None => Some(BadgeAction::default()),
    };
    state.metrics.record_request(action);
    let timer = state.metrics.mint_latency_seconds.start_timer();

    match mint_badge(&state.ctx, request).await {
        Ok(response) => {
            timer.observe_duration();
            tracing::info!(
                action = %response.action,
                level = response.level,
                tx_hash = %response.transaction_hash,
                "badge minted"
            );
            Ok(Json(response))
        }
        Err(e) => {
            timer.stop_and_discard();
            state.metrics.record_failure(e.kind());
            tracing::warn!(kind = %e.kind(), error = %e, "mint request failed");
            Err(ApiError(e))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use badge_protocol::blueprint::{BadgeScripts, Blueprint};
    use badge_protocol::crypto::CustodialKey;
    use badge_protocol::ledger::Emulator;
    use badge_protocol::{BadgeConfig, Network};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const SEED_HEX: &str = "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb";

    fn scripts() -> BadgeScripts {
        let json = serde_json::json!({
            "preamble": { "title": "test", "plutusVersion": "v3" },
            "validators": [
                { "title": "badge.badge_policy.mint", "compiledCode": "4e4d01000033222220051200120011" },
                { "title": "badge.badge_holder.spend", "compiledCode": "4e4d01000033222220051200120012" }
            ]
        });
        let bp = Blueprint::from_json(&json.to_string()).unwrap();
        BadgeScripts::resolve(&bp, "badge.badge_policy.mint", "badge.badge_holder.spend").unwrap()
    }

    fn config(blueprint_path: &str) -> BadgeConfig {
        BadgeConfig {
            signing_key: Some(SEED_HEX.into()),
            blueprint_path: blueprint_path.into(),
            ..BadgeConfig::default()
        }
    }

    /// App state over a fresh emulator with the scripts preloaded.
    fn test_app_state() -> (AppState, Arc<Emulator>) {
        let key = CustodialKey::parse(SEED_HEX).unwrap();
        let ledger = Arc::new(Emulator::new(Network::Testnet, key));
        let ctx = BadgeContext::new(config("plutus.json"), Arc::clone(&ledger))
            .unwrap()
            .with_scripts(scripts());
        let state = AppState {
            version: "0.1.0-test".into(),
            ctx: Arc::new(ctx),
            metrics: Arc::new(crate::metrics::BadgeMetrics::new()),
        };
        (state, ledger)
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    async fn mint(router: &Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = post_json(router, "/badges/mint", body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    // -- Health and status ---------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (state, _) = test_app_state();
        let router = create_router(state);
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_owner_and_lazy_ledger() {
        let (state, _) = test_app_state();
        let owner = state.ctx.owner_key_hash().to_hex();
        let router = create_router(state);

        let (status, body) = get(&router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.owner_key_hash, owner);
        assert_eq!(resp.network, "testnet");
        assert_eq!(resp.max_level, 4);
        assert!(resp.blueprint_loaded);
        assert!(!resp.ledger_connected);
    }

    // -- Mint ----------------------------------------------------------------

    #[tokio::test]
    async fn init_returns_mint_response() {
        let (state, _) = test_app_state();
        let owner = state.ctx.owner_key_hash().to_hex();
        let router = create_router(state);

        let (status, json) = mint(&router, serde_json::json!({ "level": 0 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["action"], "Init");
        assert_eq!(json["assetNameHex"], format!("5900{owner}"));
        let unit = json["unit"].as_str().unwrap();
        assert_eq!(json["mint"][unit], 1);
        assert_eq!(json["transactionHash"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn upgrade_after_init_over_http() {
        let (state, ledger) = test_app_state();
        let router = create_router(state);

        let (status, _) = mint(&router, serde_json::json!({ "level": 0, "action": "Init" })).await;
        assert_eq!(status, StatusCode::OK);
        let (status, json) = mint(&router, serde_json::json!({ "level": 1, "action": "Upgrade" })).await;
        assert_eq!(status, StatusCode::OK);

        let from = json["fromUnit"].as_str().unwrap();
        let to = json["toUnit"].as_str().unwrap();
        assert_eq!(json["mint"][from], -1);
        assert_eq!(json["mint"][to], 1);
        assert_eq!(ledger.history().len(), 2);
    }

    #[tokio::test]
    async fn validation_errors_are_400() {
        let (state, ledger) = test_app_state();
        let router = create_router(state);

        let (status, json) = mint(&router, serde_json::json!({ "level": 0, "action": "Upgrade" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "validation");
        assert!(json["message"].as_str().unwrap().contains("Upgrade requires"));

        let (status, _) = mint(&router, serde_json::json!({ "level": 1, "action": "Promote" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = mint(&router, serde_json::json!({ "level": 9 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(ledger.call_counts().submissions, 0);
    }

    #[tokio::test]
    async fn malformed_body_is_tagged_validation_error() {
        let (state, ledger) = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let (status, json) = mint(&router, serde_json::json!({ "action": "Init" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "validation");
        assert!(json["message"].as_str().unwrap().contains("level"));

        for body in [
            serde_json::json!({ "level": "1" }),
            serde_json::json!({ "level": 1.5 }),
        ] {
            let (status, json) = mint(&router, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "validation");
        }

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"badge_mint_failures_total{kind="validation"} 3"#));
        assert!(text.contains(r#"badge_mint_requests_total{action="unknown"} 3"#));
        assert_eq!(ledger.call_counts().lookups, 0);
    }

    #[tokio::test]
    async fn missing_locked_badge_is_404() {
        let (state, _) = test_app_state();
        let router = create_router(state);
        let (status, json) = mint(&router, serde_json::json!({ "level": 2, "action": "Retire" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "state");
    }

    #[tokio::test]
    async fn ledger_rejection_is_502() {
        let (state, ledger) = test_app_state();
        ledger.reject_submissions(Some("node offline".into()));
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let (status, json) = mint(&router, serde_json::json!({ "level": 1 })).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "submission");
        assert!(metrics
            .encode()
            .unwrap()
            .contains(r#"badge_mint_failures_total{kind="submission"} 1"#));
    }

    #[tokio::test]
    async fn unreadable_bundle_is_500() {
        let ledger = Arc::new(Emulator::new(
            Network::Testnet,
            CustodialKey::parse(SEED_HEX).unwrap(),
        ));
        let ctx = BadgeContext::new(config("/nonexistent/plutus.json"), ledger).unwrap();
        let state = AppState {
            version: "0.1.0-test".into(),
            ctx: Arc::new(ctx),
            metrics: Arc::new(crate::metrics::BadgeMetrics::new()),
        };
        let router = create_router(state);

        let (status, json) = mint(&router, serde_json::json!({ "level": 0 })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "resolution");
    }
}
