use crate::dynamodb::{store_error, DynamoDbClient};
use crate::models::{
    item_to_todo, new_todo_to_item, ATTR_COMPLETED, ATTR_ID, ATTR_TITLE, ATTR_VERSION,
};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use domain::{NewTodo, Todo, TodoError, TodoId, TodoPatch};
use std::collections::HashMap;
use tracing::{debug, error};

/// ToDo コレクションへの単発操作
///
/// 各メソッドはストアへの 1 回の往復に対応し、失敗はそのまま `TodoError` で返す。
/// 実装は複数タスクから同時に呼ばれても安全でなければならない。
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// 全件取得（順序は保証しない）
    async fn find_all(&self) -> Result<Vec<Todo>, TodoError>;

    /// 挿入して、ストアが払い出した id 付きの ToDo を返す
    async fn insert(&self, todo: NewTodo) -> Result<Todo, TodoError>;

    /// 指定されたフィールドだけを原子的に更新。対象が無ければ `None`
    ///
    /// 空のパッチではストアを呼ばずに `None` を返す。「更新内容なし」の判定は呼び出し側で行う。
    async fn update(&self, id: &TodoId, patch: &TodoPatch) -> Result<Option<Todo>, TodoError>;

    /// 削除。削除した場合 `true`
    async fn delete(&self, id: &TodoId) -> Result<bool, TodoError>;
}

/// `UpdateItem` に渡す式と、式が参照する名前・値のプレースホルダ
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UpdateExpression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

/// パッチから更新式を組み立てる
///
/// 指定されたフィールドだけを SET し、`__v` を 1 増やす。未使用のプレースホルダは
/// DynamoDB に拒否されるため、使う名前・値だけを含める。空のパッチなら `None`。
pub(crate) fn update_expression(patch: &TodoPatch) -> Option<UpdateExpression> {
    if patch.is_empty() {
        return None;
    }

    let mut set_parts = Vec::new();
    let mut names = HashMap::from([
        ("#id".to_string(), ATTR_ID.to_string()),
        ("#v".to_string(), ATTR_VERSION.to_string()),
    ]);
    let mut values = HashMap::from([(":one".to_string(), AttributeValue::N("1".to_string()))]);

    if let Some(title) = &patch.title {
        set_parts.push("#title = :title");
        names.insert("#title".to_string(), ATTR_TITLE.to_string());
        values.insert(":title".to_string(), AttributeValue::S(title.clone()));
    }

    if let Some(completed) = patch.completed {
        set_parts.push("#completed = :completed");
        names.insert("#completed".to_string(), ATTR_COMPLETED.to_string());
        values.insert(":completed".to_string(), AttributeValue::Bool(completed));
    }

    Some(UpdateExpression {
        expression: format!("SET {} ADD #v :one", set_parts.join(", ")),
        names,
        values,
    })
}

/// DynamoDB テーブルを使った ToDo ストア
#[derive(Clone)]
pub struct DynamoDbTodoStore {
    db: DynamoDbClient,
}

impl DynamoDbTodoStore {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for DynamoDbTodoStore {
    async fn find_all(&self) -> Result<Vec<Todo>, TodoError> {
        let mut todos = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .db
                .client()
                .scan()
                .table_name(self.db.table_name())
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| store_error("Scan", e))?;

            for item in output.items() {
                todos.push(item_to_todo(item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(count = todos.len(), "Scanned todos");
        Ok(todos)
    }

    async fn insert(&self, todo: NewTodo) -> Result<Todo, TodoError> {
        let id = TodoId::generate();
        let item = new_todo_to_item(&id, &todo);

        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#id)")
            .expression_attribute_names("#id", ATTR_ID)
            .send()
            .await
            .map_err(|e| store_error("PutItem", e))?;

        debug!(todo_id = %id, "Todo item written");
        Ok(todo.into_todo(id))
    }

    async fn update(&self, id: &TodoId, patch: &TodoPatch) -> Result<Option<Todo>, TodoError> {
        let Some(update) = update_expression(patch) else {
            debug!(todo_id = %id, "Empty patch, skipping UpdateItem");
            return Ok(None);
        };

        let builder = self
            .db
            .client()
            .update_item()
            .table_name(self.db.table_name())
            .key(ATTR_ID, AttributeValue::S(id.as_str().to_string()))
            .condition_expression("attribute_exists(#id)")
            .update_expression(update.expression)
            .set_expression_attribute_names(Some(update.names))
            .set_expression_attribute_values(Some(update.values))
            .return_values(ReturnValue::AllNew);

        match builder.send().await {
            Ok(output) => output
                .attributes
                .map(|attributes| item_to_todo(&attributes))
                .transpose(),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                debug!(todo_id = %id, "Update target does not exist");
                Ok(None)
            }
            Err(err) => {
                let err = store_error("UpdateItem", err);
                error!(todo_id = %id, error = %err, "Todo update failed");
                Err(err)
            }
        }
    }

    async fn delete(&self, id: &TodoId) -> Result<bool, TodoError> {
        let output = self
            .db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .key(ATTR_ID, AttributeValue::S(id.as_str().to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| store_error("DeleteItem", e))?;

        Ok(output
            .attributes
            .is_some_and(|attributes| !attributes.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_keys(update: &UpdateExpression) -> Vec<&str> {
        let mut keys: Vec<&str> = update.names.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    fn value_keys(update: &UpdateExpression) -> Vec<&str> {
        let mut keys: Vec<&str> = update.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn test_update_expression_title_only() {
        let update = update_expression(&TodoPatch::title("new title")).unwrap();

        assert_eq!(update.expression, "SET #title = :title ADD #v :one");
        assert_eq!(name_keys(&update), vec!["#id", "#title", "#v"]);
        assert_eq!(value_keys(&update), vec![":one", ":title"]);
        assert_eq!(update.names["#title"], "title");
        assert_eq!(
            update.values[":title"],
            AttributeValue::S("new title".to_string())
        );
    }

    #[test]
    fn test_update_expression_completed_only() {
        let update = update_expression(&TodoPatch::completed(false)).unwrap();

        assert_eq!(update.expression, "SET #completed = :completed ADD #v :one");
        assert_eq!(name_keys(&update), vec!["#completed", "#id", "#v"]);
        assert_eq!(value_keys(&update), vec![":completed", ":one"]);
        assert_eq!(update.values[":completed"], AttributeValue::Bool(false));
    }

    #[test]
    fn test_update_expression_both_fields() {
        let patch = TodoPatch {
            title: Some(String::new()),
            completed: Some(true),
        };
        let update = update_expression(&patch).unwrap();

        assert_eq!(
            update.expression,
            "SET #title = :title, #completed = :completed ADD #v :one"
        );
        assert_eq!(name_keys(&update), vec!["#completed", "#id", "#title", "#v"]);
        assert_eq!(value_keys(&update), vec![":completed", ":one", ":title"]);
        assert_eq!(update.values[":title"], AttributeValue::S(String::new()));
        assert_eq!(update.names["#id"], "id");
        assert_eq!(update.names["#v"], "__v");
        assert_eq!(update.values[":one"], AttributeValue::N("1".to_string()));
    }

    #[test]
    fn test_update_expression_empty_patch_is_none() {
        assert_eq!(update_expression(&TodoPatch::default()), None);
    }
}
