use crate::errors::TodoError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// ストアが払い出す ToDo の識別子（ULID 文字列）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// 新しい識別子を生成（ストアアダプタが挿入時に使用）
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// 外部から渡された文字列を検証して TodoId に変換
    ///
    /// 小文字表記なども受け付け、ストアの照合に使う正規形（大文字）に揃える。
    pub fn parse(s: &str) -> Result<Self, TodoError> {
        let ulid = Ulid::from_string(s).map_err(|_| TodoError::InvalidTodoId(s.to_string()))?;
        Ok(Self(ulid.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 永続化済みの ToDo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// まだ永続化されていない ToDo。id は挿入時にストアが払い出す
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl NewTodo {
    /// 作成入力から未完了の ToDo を組み立てる
    ///
    /// 作成日時はストアの保存精度に合わせてミリ秒に切り捨てる。
    pub fn from_input(input: CreateTodo, now: DateTime<Utc>) -> Self {
        Self {
            title: input.title,
            completed: false,
            created_at: now.trunc_subsecs(3),
        }
    }

    pub fn into_todo(self, id: TodoId) -> Todo {
        Todo {
            id,
            title: self.title,
            completed: self.completed,
            created_at: self.created_at,
        }
    }
}

/// 作成リクエストの入力
///
/// タイトルの空チェックは API 境界で行う。ここでは受け取った値をそのまま保存する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTodo {
    pub title: String,
}

impl CreateTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// 部分更新の入力
///
/// `None` は「変更しない」、`Some("")` や `Some(false)` は値そのものとして扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            completed: None,
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            title: None,
            completed: Some(completed),
        }
    }

    /// 更新対象のフィールドが一つも指定されていないか
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }

    /// 指定されたフィールドだけを既存の ToDo に適用
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}

/// 部分更新の結果
///
/// 「対象なし」と「更新内容なし」は呼び出し側が区別できるように別の値として返す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Todo),
    NotFound,
    NothingToUpdate,
}

impl UpdateOutcome {
    pub fn into_updated(self) -> Option<Todo> {
        match self {
            UpdateOutcome::Updated(todo) => Some(todo),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_todo() -> Todo {
        Todo {
            id: TodoId::generate(),
            title: "a".to_string(),
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_todo_id_generate_is_valid_ulid() {
        let id = TodoId::generate();
        assert_eq!(id.as_str().len(), 26);
        assert_eq!(TodoId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn test_todo_id_parse_normalizes_to_canonical_form() {
        let id = TodoId::generate();
        let lowercase = TodoId::parse(&id.as_str().to_lowercase()).unwrap();
        assert_eq!(lowercase, id);
        assert_eq!(lowercase.as_str(), id.as_str());
    }

    #[test]
    fn test_todo_id_parse_rejects_garbage() {
        let err = TodoId::parse("not-a-ulid").unwrap_err();
        assert!(matches!(err, TodoError::InvalidTodoId(s) if s == "not-a-ulid"));
    }

    #[test]
    fn test_new_todo_defaults_to_incomplete() {
        let now = Utc::now();
        let new_todo = NewTodo::from_input(CreateTodo::new("buy milk"), now);
        assert_eq!(new_todo.title, "buy milk");
        assert!(!new_todo.completed);
        assert!(new_todo.created_at <= now);
        assert_eq!(new_todo.created_at.timestamp_millis(), now.timestamp_millis());

        let id = TodoId::generate();
        let todo = new_todo.into_todo(id.clone());
        assert_eq!(todo.id, id);
    }

    #[test]
    fn test_patch_empty_detection() {
        assert!(TodoPatch::default().is_empty());
        assert!(!TodoPatch::title("").is_empty());
        assert!(!TodoPatch::completed(false).is_empty());
    }

    #[test]
    fn test_patch_applies_only_supplied_fields() {
        let mut todo = sample_todo();
        TodoPatch::completed(true).apply_to(&mut todo);
        assert_eq!(todo.title, "a");
        assert!(todo.completed);

        TodoPatch::title("b").apply_to(&mut todo);
        assert_eq!(todo.title, "b");
        assert!(todo.completed);
    }

    #[test]
    fn test_patch_deserialize_distinguishes_absent_and_false() {
        let absent: TodoPatch = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.completed, None);

        let explicit: TodoPatch = serde_json::from_str(r#"{"completed":false}"#).unwrap();
        assert_eq!(explicit.completed, Some(false));
        assert_eq!(explicit.title, None);

        let empty: TodoPatch = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_todo_serializes_camel_case() {
        let todo = sample_todo();
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["id"], todo.id.as_str());
        assert_eq!(json["completed"], false);
        assert!(json.get("createdAt").is_some());
    }
}
