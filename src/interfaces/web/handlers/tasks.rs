use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::{error, info};

use super::super::AppState;
use crate::core::task::{Task, TaskInput};

type ApiResponse = (StatusCode, Json<Value>);

fn not_found() -> ApiResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Task not found" })))
}

fn internal(e: anyhow::Error) -> ApiResponse {
    error!("Task request failed: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

fn task_json(status: StatusCode, task: &Task) -> ApiResponse {
    match serde_json::to_value(task) {
        Ok(v) => (status, Json(v)),
        Err(e) => internal(e.into()),
    }
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResponse {
    match state.tasks.list().await {
        Ok(tasks) => (StatusCode::OK, Json(json!(tasks))),
        Err(e) => internal(e),
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> ApiResponse {
    let Json(input) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rejection.body_text() })),
            );
        }
    };
    let task = Task::create(input);
    match state.tasks.insert(&task).await {
        Ok(()) => {
            info!("Created task [{}] '{}'", task.id, task.name);
            task_json(StatusCode::CREATED, &task)
        }
        Err(e) => internal(e),
    }
}

pub async fn get_task(Path(id): Path<String>, State(state): State<AppState>) -> ApiResponse {
    match state.tasks.get(&id).await {
        Ok(Some(task)) => task_json(StatusCode::OK, &task),
        Ok(None) => not_found(),
        Err(e) => internal(e),
    }
}

pub async fn update_task(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> ApiResponse {
    let Json(input) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rejection.body_text() })),
            );
        }
    };
    let current = match state.tasks.get(&id).await {
        Ok(Some(task)) => task,
        Ok(None) => return not_found(),
        Err(e) => return internal(e),
    };
    let revised = current.revise(input);
    match state.tasks.replace(&id, &revised).await {
        Ok(true) => task_json(StatusCode::OK, &revised),
        Ok(false) => not_found(),
        Err(e) => internal(e),
    }
}

pub async fn delete_task(Path(id): Path<String>, State(state): State<AppState>) -> ApiResponse {
    match state.tasks.delete(&id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({ "message": "Task deleted successfully" })),
        ),
        Ok(false) => not_found(),
        Err(e) => internal(e),
    }
}

pub async fn start_task(Path(id): Path<String>, State(state): State<AppState>) -> ApiResponse {
    match state.runner.start(&id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({ "message": "Task started successfully" })),
        ),
        Ok(false) => not_found(),
        Err(e) => internal(e),
    }
}
