use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::TodoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Todo not found")]
    NotFound,

    #[error("No fields to update")]
    NothingToUpdate,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Todo(#[from] TodoError),
}

/// JSON 本文の解析失敗も `{ "error": .. }` 形式の 400 で返す
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            // 更新内容なしは従来どおり 404 だが、メッセージで区別できるようにする
            ApiError::NotFound | ApiError::NothingToUpdate => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": self.to_string() }),
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": message }),
            ),
            ApiError::Todo(TodoError::InvalidTodoId(id)) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": format!("Invalid todo id: {id}") }),
            ),
            ApiError::Todo(e) => {
                tracing::error!(error = %e, "Backing store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Database error", "message": e.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
