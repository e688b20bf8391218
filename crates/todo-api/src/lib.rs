//! HTTP API（axum）
//!
//! サービスの結果をステータスコードへ対応付けるだけの薄い層。

pub mod error;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use domain::{CreateTodo, Todo, TodoId, TodoPatch, UpdateOutcome};
use infrastructure::TodoService;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

pub use error::ApiError;

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    service: TodoService,
}

impl AppState {
    pub fn new(service: TodoService) -> Self {
        Self { service }
    }
}

/// ルータを構築して返します。
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/health", get(health))
        .route("/api/todos/:id", patch(update_todo).delete(delete_todo))
        .with_state(state)
}

/// フロントエンドのオリジンからのリクエストを許可する CORS レイヤー
pub fn cors_layer(allowed_origin: &str) -> Result<CorsLayer, header::InvalidHeaderValue> {
    let origin = HeaderValue::from_str(allowed_origin)?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::CONTENT_TYPE]))
}

/// POST /api/todos リクエスト
#[derive(Debug, Deserialize)]
struct CreateTodoRequest {
    title: String,
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = state.service.list().await?;
    Ok(Json(todos))
}

/// タイトルの空チェックはここで行う（サービスは検証しない）
async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(req) = payload?;
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    info!(title = %req.title, "Creating new todo");
    let todo = state.service.create(CreateTodo::new(req.title)).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<TodoPatch>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = TodoId::parse(&id)?;
    let Json(patch) = payload?;

    match state.service.update(&id, patch).await? {
        UpdateOutcome::Updated(todo) => Ok(Json(todo)),
        UpdateOutcome::NotFound => {
            warn!(todo_id = %id, "Todo not found");
            Err(ApiError::NotFound)
        }
        UpdateOutcome::NothingToUpdate => Err(ApiError::NothingToUpdate),
    }
}

async fn delete_todo(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let id = TodoId::parse(&id)?;

    if state.service.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        warn!(todo_id = %id, "Todo not found for deletion");
        Err(ApiError::NotFound)
    }
}

/// ヘルスチェック。ストアから一覧が取れるかを確認する
async fn health(State(state): State<AppState>) -> Response {
    match state.service.count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "message": "Successfully connected to the store",
                "todoCount": count,
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "status": "unhealthy", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
