use thiserror::Error;

/// ToDo 操作で発生するエラー
///
/// 対象が存在しないことはエラーではなく、戻り値（`UpdateOutcome` / `bool`）で表す。
#[derive(Debug, Clone, Error)]
pub enum TodoError {
    #[error("Invalid TodoId: {0}")]
    InvalidTodoId(String),

    #[error("Backing store error: {0}")]
    Store(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}

impl TodoError {
    /// ストア起因の失敗か（API 層では 500 系に対応）
    pub fn is_store_failure(&self) -> bool {
        matches!(self, TodoError::Store(_) | TodoError::MalformedRecord(_))
    }
}
