use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::error;

use super::super::AppState;
use crate::core::questionnaire::{NewQuestionnaire, QuestionnaireStatus};
use crate::core::service::ServiceError;

type ApiResponse = (StatusCode, Json<Value>);

fn to_json<T: serde::Serialize>(status: StatusCode, value: &T) -> ApiResponse {
    match serde_json::to_value(value) {
        Ok(v) => (status, Json(v)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

fn service_error(e: ServiceError) -> ApiResponse {
    let status = match &e {
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
        ServiceError::AlreadyRunning(_) => StatusCode::CONFLICT,
        ServiceError::Publish(_) | ServiceError::Storage(_) => {
            error!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": e.to_string() })))
}

fn bad_request(msg: String) -> ApiResponse {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg })))
}

pub async fn list_questionnaires(State(state): State<AppState>) -> ApiResponse {
    match state.questionnaires.list().await {
        Ok(all) => to_json(StatusCode::OK, &all),
        Err(e) => service_error(e),
    }
}

pub async fn create_questionnaire(
    State(state): State<AppState>,
    payload: Result<Json<NewQuestionnaire>, JsonRejection>,
) -> ApiResponse {
    let Json(input) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match state.questionnaires.create(input).await {
        Ok(q) => to_json(StatusCode::CREATED, &q),
        Err(e) => service_error(e),
    }
}

pub async fn get_questionnaire(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResponse {
    match state.questionnaires.get(&id).await {
        Ok(q) => to_json(StatusCode::OK, &q),
        Err(e) => service_error(e),
    }
}

pub async fn replace_questionnaire(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<NewQuestionnaire>, JsonRejection>,
) -> ApiResponse {
    let Json(input) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match state.questionnaires.replace(&id, input).await {
        Ok(q) => to_json(StatusCode::OK, &q),
        Err(e) => service_error(e),
    }
}

pub async fn delete_questionnaire(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResponse {
    match state.questionnaires.delete(&id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Questionnaire deleted successfully" })),
        ),
        Err(e) => service_error(e),
    }
}

#[derive(serde::Deserialize)]
pub struct StatusUpdateRequest {
    status: String,
}

pub async fn update_questionnaire_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResponse {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let Some(status) = QuestionnaireStatus::from_status(request.status.trim()) else {
        return bad_request(format!("Unknown status '{}'", request.status));
    };
    match state.questionnaires.update_status(&id, status).await {
        Ok(q) => to_json(StatusCode::OK, &q),
        Err(e) => service_error(e),
    }
}

pub async fn start_questionnaire(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResponse {
    match state.questionnaires.start(&id).await {
        Ok(report) => to_json(StatusCode::OK, &report),
        Err(e) => service_error(e),
    }
}

/// Accepts `{"answers": ...}` or a bare answers document.
pub async fn submit_questionnaire(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResponse {
    let document: Value = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => return bad_request(e.to_string()),
        }
    };
    let answers = match document {
        Value::Object(mut map) if map.contains_key("answers") => {
            map.remove("answers").unwrap_or(Value::Null)
        }
        other => other,
    };
    match state.questionnaires.submit(&id, &answers).await {
        Ok(report) => to_json(StatusCode::OK, &report),
        Err(e) => service_error(e),
    }
}
