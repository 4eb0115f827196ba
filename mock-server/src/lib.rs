use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub note: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    items: BTreeMap<u64, Item>,
}

pub type Db = Arc<RwLock<Store>>;

type Failure = (StatusCode, Json<Value>);

#[derive(Deserialize)]
pub struct ListFilter {
    pub name: Option<String>,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item).put(update_item).delete(delete_item))
        .route("/status/{code}", any(status))
        .route("/legacy", post(legacy))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn not_found() -> Failure {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "item not found" })),
    )
}

fn invalid(details: Vec<&str>) -> Failure {
    let errors: Vec<Value> = details
        .into_iter()
        .map(|detail| json!({ "title": "Invalid", "detail": detail }))
        .collect();
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "errors": errors })),
    )
}

fn envelope(item: &Item) -> Json<Value> {
    Json(json!({ "item": item }))
}

/// `Ok(None)` for an explicit null, `Err` for a non-string.
fn string_field(value: &Value) -> Result<Option<String>, ()> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(()),
    }
}

async fn list_items(State(db): State<Db>, Query(filter): Query<ListFilter>) -> Json<Vec<Item>> {
    let store = db.read().await;
    Json(
        store
            .items
            .values()
            .filter(|item| filter.name.as_ref().map_or(true, |name| &item.name == name))
            .cloned()
            .collect(),
    )
}

async fn create_item(
    State(db): State<Db>,
    Json(input): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut problems = Vec::new();
    let name = input.get("name").and_then(Value::as_str);
    if name.is_none() {
        problems.push("name is required");
    }
    let note = match input.get("note").map(string_field) {
        None | Some(Ok(None)) => None,
        Some(Ok(note)) => note,
        Some(Err(())) => {
            problems.push("note must be a string");
            None
        }
    };
    let Some(name) = name.filter(|_| problems.is_empty()) else {
        return Err(invalid(problems));
    };

    let mut store = db.write().await;
    store.next_id += 1;
    let item = Item {
        id: store.next_id,
        name: name.to_string(),
        note,
    };
    store.items.insert(item.id, item.clone());
    tracing::debug!(id = item.id, "item created");
    Ok((StatusCode::CREATED, envelope(&item)))
}

async fn get_item(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    store.items.get(&id).map(envelope).ok_or_else(not_found)
}

async fn update_item(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<Map<String, Value>>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let item = store.items.get_mut(&id).ok_or_else(not_found)?;

    let name = match input.get("name").map(string_field) {
        None => None,
        Some(Ok(Some(name))) => Some(name),
        Some(Ok(None)) => return Err(invalid(vec!["name cannot be null"])),
        Some(Err(())) => return Err(invalid(vec!["name must be a string"])),
    };
    let note = match input.get("note").map(string_field) {
        None => None,
        Some(Ok(note)) => Some(note),
        Some(Err(())) => return Err(invalid(vec!["note must be a string"])),
    };

    if let Some(name) = name {
        item.name = name;
    }
    if let Some(note) = note {
        item.note = note;
    }
    Ok(envelope(item))
}

async fn delete_item(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    store
        .items
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn legacy() -> Failure {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "errorsList": [
                { "title": "Legacy", "detail": "first legacy error" },
                { "title": "Legacy", "detail": "second legacy error" }
            ]
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_to_json() {
        let item = Item {
            id: 1,
            name: "Test".to_string(),
            note: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Test");
        assert!(json["note"].is_null());
    }

    #[test]
    fn envelope_wraps_under_item() {
        let item = Item {
            id: 2,
            name: "Wrapped".to_string(),
            note: Some("n".to_string()),
        };
        let Json(body) = envelope(&item);
        assert_eq!(body["item"]["name"], "Wrapped");
        assert_eq!(body["item"]["note"], "n");
    }

    #[test]
    fn string_field_distinguishes_null() {
        assert_eq!(string_field(&Value::Null), Ok(None));
        assert_eq!(string_field(&json!("x")), Ok(Some("x".to_string())));
        assert!(string_field(&json!(5)).is_err());
    }

    #[test]
    fn invalid_lists_every_problem() {
        let (status, Json(body)) = invalid(vec!["a", "b"]);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
        assert_eq!(body["errors"][0]["detail"], "a");
    }
}
