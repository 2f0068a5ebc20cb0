//! Route table and request handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use shared::{CreateTaskRequest, Task, UpdateTaskRequest};

use crate::error::ApiError;
use crate::store::{TaskFilter, TaskPatch, TaskStore};

pub type SharedStore = Arc<TaskStore>;

/// Builds the static route table over the injected store.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/:id/complete", patch(complete_task))
        .with_state(store)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
}

/// An id that does not parse can never be in the store, so it gets the
/// same answer as any other absent id.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.filter(|value| !value.is_empty())
}

async fn list_tasks(
    State(store): State<SharedStore>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Task>> {
    let filter = query.search.map(TaskFilter::search);
    Json(store.select(filter.as_ref()).await)
}

async fn get_task(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(store.get(&id).await?))
}

async fn create_task(
    State(store): State<SharedStore>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<StatusCode, ApiError> {
    let title = non_empty(payload.title.as_deref());
    let description = non_empty(payload.description.as_deref());
    let (Some(title), Some(description)) = (title, description) else {
        return Err(ApiError::InvalidCreate);
    };

    store
        .insert(Task::new(title.to_owned(), description.to_owned()))
        .await?;
    Ok(StatusCode::CREATED)
}

async fn update_task(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    // Existence decides before body validation: an unknown id with an
    // empty body is 404, not 400.
    if !store.id_exists(&id).await {
        return Err(ApiError::NotFound);
    }

    let title = non_empty(payload.title.as_deref());
    let description = non_empty(payload.description.as_deref());
    if title.is_none() && description.is_none() {
        return Err(ApiError::InvalidUpdate);
    }

    let patch = TaskPatch {
        title: title.map(str::to_owned),
        description: description.map(str::to_owned),
        completed_at: None,
    };
    store.update(&id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn complete_task(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if !store.id_exists(&id).await {
        return Err(ApiError::NotFound);
    }

    let patch = TaskPatch {
        completed_at: Some(Utc::now()),
        ..TaskPatch::default()
    };
    store.update(&id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_task(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if !store.id_exists(&id).await {
        return Err(ApiError::NotFound);
    }

    store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
