//! HTTP API 服务
//!
//! 通过运动队列驱动 MotionPlayer:
//! 加载手势库、发起移动、取消、查询状态。

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::geometry::Point;
use crate::library;
use crate::player::MoveOutcome;
use crate::worker::MotionWorker;

/// API 服务共享状态
pub struct AppState {
    pub worker: MotionWorker,
    pub library_dir: PathBuf,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .route("/libraries", get(libraries))
        .route("/library", post(load_library))
        .route("/move", post(move_pointer))
        .route("/cancel", post(cancel))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

// ================================================================
// Handlers
// ================================================================

async fn index() -> &'static str {
    concat!("mimicmotion API v", env!("CARGO_PKG_VERSION"))
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.worker.status().await {
        Ok(status) => (StatusCode::OK, Json(serde_json::json!(status))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn libraries(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let dir = state.library_dir.clone();
    let names = tokio::task::spawn_blocking(move || library::list_libraries(&dir))
        .await
        .unwrap_or_default();
    Json(names)
}

#[derive(Deserialize)]
struct LoadRequest {
    name: String,
}

#[derive(Serialize)]
struct LoadResponse {
    success: bool,
    templates: usize,
    message: String,
}

async fn load_library(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadRequest>,
) -> impl IntoResponse {
    info!("📚 加载请求: {}", req.name);
    match state.worker.load_library(req.name.as_str()).await {
        Ok(Ok(templates)) => (
            StatusCode::OK,
            Json(LoadResponse {
                success: true,
                templates,
                message: format!("loaded '{}'", req.name),
            }),
        ),
        Ok(Err(message)) => (
            StatusCode::NOT_FOUND,
            Json(LoadResponse {
                success: false,
                templates: 0,
                message,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(LoadResponse {
                success: false,
                templates: 0,
                message: e.to_string(),
            }),
        ),
    }
}

#[derive(Deserialize)]
struct MoveRequest {
    x: i32,
    y: i32,
}

async fn move_pointer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MoveRequest>,
) -> impl IntoResponse {
    let target = Point::new(req.x, req.y);
    match state.worker.move_to(target).await {
        Ok(outcome) => {
            let code = match outcome {
                MoveOutcome::NoLibrary => StatusCode::CONFLICT,
                MoveOutcome::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::OK,
            };
            (code, Json(serde_json::json!(outcome)))
        }
        Err(e) => {
            warn!("⚠️ 移动请求失败: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

/// 取消执行中与已排队的运动，之后提交的运动照常执行
async fn cancel(State(state): State<Arc<AppState>>) -> StatusCode {
    state.worker.cancel();
    StatusCode::NO_CONTENT
}
