//! `vector-service` group.
//!
//! - `POST /api/vector/embed`: `{texts: [..]}` → embeddings
//! - `POST /api/vector/search`: `{query, collection?, top_k?}` → ranked documents
//! - `POST /api/vector/upsert`: `{collection?, documents: [..]}` → inserted count

use axum::{Router, extract::State, response::Json, routing::post};
use serde_json::{Value, json};
use subserver_vector::DocumentInput;
use subserver_vector::service::{DEFAULT_COLLECTION, SearchOutcome, UpsertOutcome};

use crate::error::{ApiError, bad_request, vector_error};
use crate::groups::ApiGroup;
use crate::state::SharedState;

pub fn group() -> ApiGroup {
    ApiGroup {
        name: "vector-service",
        description: "Text embeddings and similarity search",
        priority: 100,
        routes: &[
            ("POST", "/api/vector/embed"),
            ("POST", "/api/vector/search"),
            ("POST", "/api/vector/upsert"),
        ],
        router,
    }
}

fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/vector/embed", post(embed_handler))
        .route("/api/vector/search", post(search_handler))
        .route("/api/vector/upsert", post(upsert_handler))
}

/// `collection` when present must be a string; absent means the default.
fn collection_name(body: &Value) -> Result<&str, ApiError> {
    match body.get("collection") {
        None | Some(Value::Null) => Ok(DEFAULT_COLLECTION),
        Some(Value::String(name)) if !name.trim().is_empty() => Ok(name.as_str()),
        Some(_) => Err(bad_request("collection must be a non-empty string")),
    }
}

async fn embed_handler(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let texts: Vec<String> = body
        .get("texts")
        .and_then(Value::as_array)
        .filter(|texts| !texts.is_empty())
        .and_then(|texts| texts.iter().map(|t| t.as_str().map(str::to_string)).collect())
        .ok_or_else(|| bad_request("texts must be a non-empty list of strings"))?;

    let embeddings = state.vector.embed(texts).await.map_err(vector_error)?;
    Ok(Json(json!({
        "success": true,
        "embeddings": embeddings,
        "count": embeddings.len(),
    })))
}

async fn search_handler(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let query = body
        .get("query")
        .and_then(Value::as_str)
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| bad_request("query must be a non-empty string"))?;
    let collection = collection_name(&body)?;
    // Anything but a positive integer falls back to the default.
    let top_k = body.get("top_k").and_then(Value::as_u64).map(|k| k as usize);

    state
        .vector
        .search(query, collection, top_k)
        .await
        .map(Json)
        .map_err(vector_error)
}

async fn upsert_handler(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Json<UpsertOutcome>, ApiError> {
    let documents = body
        .get("documents")
        .filter(|docs| docs.as_array().is_some_and(|d| !d.is_empty()))
        .ok_or_else(|| bad_request("documents must be a non-empty list"))?;
    let documents: Vec<DocumentInput> = serde_json::from_value(documents.clone())
        .map_err(|e| bad_request(format!("invalid document: {e}")))?;
    let collection = collection_name(&body)?;

    state
        .vector
        .upsert(collection, documents)
        .await
        .map(Json)
        .map_err(vector_error)
}
