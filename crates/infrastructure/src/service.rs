use crate::repositories::TodoStore;
use chrono::Utc;
use domain::{CreateTodo, NewTodo, Todo, TodoError, TodoId, TodoPatch, UpdateOutcome};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// ToDo の CRUD を提供するサービス
///
/// ストアハンドルは起動時に作成したものを注入する。サービス自体は状態もロックも持たず、
/// ストアの失敗はリトライせずに呼び出し側へ返す。
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    /// 全件を作成日時の新しい順で返す
    pub async fn list(&self) -> Result<Vec<Todo>, TodoError> {
        debug!("Fetching todos");

        let mut todos = self.store.find_all().await.map_err(|e| {
            error!(error = %e, "Error fetching todos");
            e
        })?;
        // 安定ソートなので同時刻のものはストアの返却順を保つ
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        info!(count = todos.len(), "Fetched todos");
        Ok(todos)
    }

    /// 未完了の ToDo を作成
    pub async fn create(&self, input: CreateTodo) -> Result<Todo, TodoError> {
        let new_todo = NewTodo::from_input(input, Utc::now());

        let todo = self.store.insert(new_todo).await.map_err(|e| {
            error!(error = %e, "Error creating todo");
            e
        })?;

        info!(todo_id = %todo.id, "Created todo");
        Ok(todo)
    }

    /// 指定されたフィールドだけを更新
    ///
    /// 何も指定されていなければストアを呼ばずに `NothingToUpdate` を返す。
    pub async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<UpdateOutcome, TodoError> {
        if patch.is_empty() {
            warn!(todo_id = %id, "Update request carried no fields");
            return Ok(UpdateOutcome::NothingToUpdate);
        }

        let updated = self.store.update(id, &patch).await.map_err(|e| {
            error!(todo_id = %id, error = %e, "Error updating todo");
            e
        })?;

        Ok(match updated {
            Some(todo) => {
                info!(todo_id = %id, "Updated todo");
                UpdateOutcome::Updated(todo)
            }
            None => {
                debug!(todo_id = %id, "Todo to update not found");
                UpdateOutcome::NotFound
            }
        })
    }

    /// 削除。対象が存在しなかった場合は `false`
    pub async fn delete(&self, id: &TodoId) -> Result<bool, TodoError> {
        let removed = self.store.delete(id).await.map_err(|e| {
            error!(todo_id = %id, error = %e, "Error deleting todo");
            e
        })?;

        if removed {
            info!(todo_id = %id, "Deleted todo");
        } else {
            debug!(todo_id = %id, "Todo to delete not found");
        }
        Ok(removed)
    }

    /// ヘルスチェック用。全件取得が通ることを確認し件数を返す
    pub async fn count(&self) -> Result<usize, TodoError> {
        Ok(self.list().await?.len())
    }
}
