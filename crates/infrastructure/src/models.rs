use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use domain::{NewTodo, Todo, TodoError, TodoId};
use std::collections::HashMap;

/// DynamoDB アイテムの属性名
pub const ATTR_ID: &str = "id";
pub const ATTR_TITLE: &str = "title";
pub const ATTR_COMPLETED: &str = "completed";
pub const ATTR_CREATED_AT: &str = "createdAt";
/// 書き込みごとに増えるストア内部のバージョン。ドメインには出さない
pub const ATTR_VERSION: &str = "__v";

pub type Item = HashMap<String, AttributeValue>;

/// 挿入用のアイテムを組み立てる（バージョンは 0 から開始）
pub fn new_todo_to_item(id: &TodoId, todo: &NewTodo) -> Item {
    let mut item = HashMap::new();

    item.insert(ATTR_ID.to_string(), AttributeValue::S(id.as_str().to_string()));
    item.insert(ATTR_TITLE.to_string(), AttributeValue::S(todo.title.clone()));
    item.insert(ATTR_COMPLETED.to_string(), AttributeValue::Bool(todo.completed));
    item.insert(
        ATTR_CREATED_AT.to_string(),
        AttributeValue::S(format_timestamp(&todo.created_at)),
    );
    item.insert(ATTR_VERSION.to_string(), AttributeValue::N("0".to_string()));

    item
}

/// DynamoDB アイテムから ToDo を復元
pub fn item_to_todo(item: &Item) -> Result<Todo, TodoError> {
    let id = string_attr(item, ATTR_ID)?;
    let id = TodoId::parse(id)
        .map_err(|_| TodoError::MalformedRecord(format!("invalid {ATTR_ID}: {id}")))?;

    let title = string_attr(item, ATTR_TITLE)?.clone();

    let completed = *item
        .get(ATTR_COMPLETED)
        .and_then(|v| v.as_bool().ok())
        .ok_or_else(|| missing(ATTR_COMPLETED))?;

    let created_at = parse_timestamp(string_attr(item, ATTR_CREATED_AT)?)?;

    Ok(Todo {
        id,
        title,
        completed,
        created_at,
    })
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TodoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TodoError::MalformedRecord(format!("invalid {ATTR_CREATED_AT} '{value}': {e}")))
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Result<&'a String, TodoError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| missing(name))
}

fn missing(name: &str) -> TodoError {
    TodoError::MalformedRecord(format!("missing or mistyped attribute: {name}"))
}
