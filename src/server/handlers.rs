use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use super::models::{
    AnalyzeRequest, DatabaseNameQuery, DatabaseNameResponse, DatabaseSummary, ErrorResponse,
    HistoryQuery, SaveRequest, SaveResponse, SettingsInfo,
};
use super::state::ServerState;
use crate::analysis::{AnalysisResult, TARGET_LANGUAGES};
use crate::error::Error;
use crate::locales::LocaleCatalog;
use crate::settings::Settings;
use crate::store;

pub async fn run_server(settings: Settings, catalog: LocaleCatalog, addr: String) -> Result<()> {
    let state = Arc::new(ServerState { settings, catalog });
    let app = Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/save", post(save))
        .route("/history", get(history))
        .route("/statistics", get(statistics))
        .route("/database-name", get(database_name))
        .route("/settings", get(settings_info))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| "failed to bind server address")?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn analyze(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, (StatusCode, Json<ErrorResponse>)> {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "text is required".to_string(),
            }),
        ));
    }
    let result = crate::analyze_text(&state.settings, text, &payload.url)
        .await
        .map_err(error_reply)?;
    Ok(Json(result))
}

async fn save(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, (StatusCode, Json<ErrorResponse>)> {
    crate::save_analysis(
        &state.settings,
        &state.catalog,
        &payload.data,
        &payload.url,
        payload.database_id.as_deref(),
    )
    .await
    .map_err(error_reply)?;
    Ok(Json(SaveResponse {
        success: true,
        message: state
            .catalog
            .message(&state.settings.ui_language, "saved_success"),
    }))
}

async fn history(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<store::HistoryEntry>>, (StatusCode, Json<ErrorResponse>)> {
    let _ = state;
    let entries = match query.q.as_deref() {
        Some(q) => store::search_history(q),
        None => store::get_history(),
    }
    .map_err(internal_reply)?;
    Ok(Json(entries))
}

async fn statistics(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<store::UsageStatistics>, (StatusCode, Json<ErrorResponse>)> {
    let _ = state;
    let stats = store::get_statistics().map_err(internal_reply)?;
    Ok(Json(stats))
}

async fn database_name(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<DatabaseNameQuery>,
) -> Result<Json<DatabaseNameResponse>, (StatusCode, Json<ErrorResponse>)> {
    let database = state
        .settings
        .resolve_database(query.id.as_deref())
        .ok_or_else(|| {
            error_reply(Error::ConfigurationMissing(configure_message(
                &state.catalog,
                &state.settings,
            )))
        })?;
    let name = crate::notion::get_database_name(&database.token, &database.database_id)
        .await
        .map_err(error_reply)?;
    Ok(Json(DatabaseNameResponse { name }))
}

async fn settings_info(State(state): State<Arc<ServerState>>) -> Json<SettingsInfo> {
    let databases = state
        .settings
        .notion_databases
        .iter()
        .map(|db| DatabaseSummary {
            id: db.id.clone(),
            name: db.name.clone(),
            template: db.template.clone(),
            default: db.default,
        })
        .collect();
    Json(SettingsInfo {
        target_language: state.settings.target_language.clone(),
        ui_language: state.settings.ui_language.clone(),
        target_languages: TARGET_LANGUAGES.to_vec(),
        databases,
    })
}

fn configure_message(catalog: &LocaleCatalog, settings: &Settings) -> String {
    catalog.message(&settings.ui_language, "notion_configure")
}

fn error_reply(error: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match error {
        Error::ConfigurationMissing(_) => StatusCode::BAD_REQUEST,
        Error::UpstreamRequestFailed(_) | Error::ResponseMalformed(_) | Error::SaveRejected(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn internal_reply(error: anyhow::Error) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}
