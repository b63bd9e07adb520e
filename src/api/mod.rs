//! Thin HTTP layer over the core services. No algorithmic content lives
//! here; handlers validate parameters, call one service, and shape JSON.

use crate::config::Config;
use crate::reporter::{Reporter, ReportOutcome};
use crate::resolver::{CheckOutcome, Resolver};
use crate::store::Store;
use crate::types::{parse_report_tag, Kind};
use crate::version::{TrackedList, VersionTracker};
use axum::{
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

const MAX_PER_PAGE: u32 = 1000;

struct ApiState {
    resolver: Resolver,
    reporter: Reporter,
    store: Arc<Store>,
    versions: VersionTracker,
}

pub async fn start_api_server(store: Arc<Store>, config: Config) {
    let state = Arc::new(ApiState {
        resolver: Resolver::new(store.clone()),
        reporter: Reporter::new(store.clone()),
        versions: VersionTracker::new(store.clone()),
        store,
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/check", get(check_item))
        .route("/api/report", post(report_item))
        .route("/api/blocklist", get(get_blocklist))
        .route("/api/whitelist", get(get_whitelist))
        .layer(cors_layer(&config))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("API Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received.");
        })
        .await
        .unwrap();
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allowed_origins == "*" {
        tracing::warn!("CORS configured to allow all origins (development only)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        tracing::info!("CORS configured for {} specific origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

#[derive(serde::Deserialize)]
struct CheckParams {
    #[serde(rename = "type")]
    item_type: String,
    value: String,
}

async fn check_item(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<CheckParams>,
) -> axum::response::Response {
    let started = Instant::now();
    let Some(kind) = Kind::parse(&params.item_type) else {
        return bad_request("Invalid or missing 'type' parameter. Must be 'domain' or 'email'.");
    };

    match state.resolver.check(kind, &params.value) {
        Ok(outcome) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let body = match outcome {
                CheckOutcome::Whitelisted(entry) => serde_json::json!({
                    "status": "whitelisted",
                    "details": entry,
                    "processing_time_ms": elapsed_ms,
                }),
                CheckOutcome::Blocked(entry) => serde_json::json!({
                    "status": "blocked",
                    "details": entry,
                    "processing_time_ms": elapsed_ms,
                }),
                CheckOutcome::Safe { invalid_format } => {
                    let details = if invalid_format {
                        serde_json::json!({ "invalid_format": true })
                    } else {
                        serde_json::json!({})
                    };
                    serde_json::json!({
                        "status": "safe",
                        "details": details,
                        "processing_time_ms": elapsed_ms,
                    })
                }
            };
            Json(body).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(serde::Deserialize)]
struct ReportBody {
    #[serde(rename = "type")]
    item_type: String,
    value: String,
    reason: Option<String>,
    source: Option<String>,
}

async fn report_item(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ReportBody>,
) -> axum::response::Response {
    let Some((kind, intent)) = parse_report_tag(&body.item_type) else {
        return bad_request(
            "Invalid or missing 'type'. Must be 'domain', 'email', \
             'false_positive_domain' or 'false_positive_email'.",
        );
    };

    let outcome = match state.reporter.report(
        kind,
        intent,
        &body.value,
        body.reason.as_deref(),
        body.source.as_deref(),
    ) {
        Ok(outcome) => outcome,
        Err(e) => return e.into_response(),
    };

    match outcome {
        ReportOutcome::InvalidValue => {
            bad_request(&format!("Invalid {} format: {}", kind, body.value))
        }
        ReportOutcome::IgnoredWhitelisted => Json(serde_json::json!({
            "status": "ignored_whitelisted",
            "message": "Item is whitelisted and cannot be reported.",
        }))
        .into_response(),
        ReportOutcome::IgnoredAlreadyBlocked => Json(serde_json::json!({
            "status": "ignored_already_blocked",
            "message": "Item is already actively blocked.",
        }))
        .into_response(),
        ReportOutcome::AlreadyReported => Json(serde_json::json!({
            "status": "already_reported",
            "message": "Report already exists and is pending review.",
        }))
        .into_response(),
        ReportOutcome::Created(report) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "status": "created",
                "message": "Report submitted successfully.",
                "report": report,
            })),
        )
            .into_response(),
        ReportOutcome::FlaggedForReview => Json(serde_json::json!({
            "status": "flagged_for_review",
            "message": "Block entry sent back for review.",
        }))
        .into_response(),
        ReportOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "No matching block entry." })),
        )
            .into_response(),
    }
}

#[derive(serde::Deserialize)]
struct ListParams {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    since: i64,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    100
}

async fn get_blocklist(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ListParams>,
) -> axum::response::Response {
    let Some(kind) = Kind::parse(&params.item_type) else {
        return bad_request("Invalid or missing 'type' parameter. Must be 'domain' or 'email'.");
    };
    let per_page = params.per_page.min(MAX_PER_PAGE);

    let items = state
        .store
        .list_active_blocks(kind, params.since, params.page, per_page);
    let version = state.versions.current(TrackedList::Blocklist, kind);

    match (items, version) {
        (Ok((items, total)), Ok(version)) => Json(serde_json::json!({
            "items": items,
            "total": total,
            "page": params.page,
            "per_page": per_page,
            "version": version,
        }))
        .into_response(),
        (Err(e), _) | (_, Err(e)) => e.into_response(),
    }
}

async fn get_whitelist(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ListParams>,
) -> axum::response::Response {
    let Some(kind) = Kind::parse(&params.item_type) else {
        return bad_request("Invalid or missing 'type' parameter. Must be 'domain' or 'email'.");
    };
    let per_page = params.per_page.min(MAX_PER_PAGE);

    let items = state
        .store
        .list_whitelisted(kind, params.since, params.page, per_page);
    let version = state.versions.current(TrackedList::Whitelist, kind);

    match (items, version) {
        (Ok((items, total)), Ok(version)) => Json(serde_json::json!({
            "items": items,
            "total": total,
            "page": params.page,
            "per_page": per_page,
            "version": version,
        }))
        .into_response(),
        (Err(e), _) | (_, Err(e)) => e.into_response(),
    }
}
