use crate::repositories::TodoStore;
use async_trait::async_trait;
use domain::{NewTodo, Todo, TodoError, TodoId, TodoPatch};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// プロセス内メモリに保持する ToDo ストア（開発/テスト用）
///
/// 挿入順を保持する。`set_unavailable(true)` でストア障害を再現できる。
#[derive(Default)]
pub struct InMemoryTodoStore {
    todos: RwLock<Vec<Todo>>,
    // ストア呼び出し回数（テスト観測用）
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn begin_call(&self) -> Result<(), TodoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TodoError::Store("in-memory store is unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn find_all(&self) -> Result<Vec<Todo>, TodoError> {
        self.begin_call()?;
        Ok(self.todos.read().await.clone())
    }

    async fn insert(&self, todo: NewTodo) -> Result<Todo, TodoError> {
        self.begin_call()?;
        let todo = todo.into_todo(TodoId::generate());
        self.todos.write().await.push(todo.clone());
        Ok(todo)
    }

    async fn update(&self, id: &TodoId, patch: &TodoPatch) -> Result<Option<Todo>, TodoError> {
        if patch.is_empty() {
            return Ok(None);
        }
        self.begin_call()?;
        let mut todos = self.todos.write().await;
        Ok(todos.iter_mut().find(|t| &t.id == id).map(|todo| {
            patch.apply_to(todo);
            todo.clone()
        }))
    }

    async fn delete(&self, id: &TodoId) -> Result<bool, TodoError> {
        self.begin_call()?;
        let mut todos = self.todos.write().await;
        let before = todos.len();
        todos.retain(|t| &t.id != id);
        Ok(todos.len() != before)
    }
}
