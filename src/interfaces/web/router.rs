use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, patch, post},
};
use tower_http::cors::{Any, CorsLayer};

use super::AppState;
use super::handlers::{questionnaires, system, tasks};

/// The dashboard is served from another origin, so any origin may call the API.
fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

pub fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(system::health_endpoint))
        .route("/api/logs", get(super::sse_logs_endpoint))
        .route(
            "/api/questionnaires",
            get(questionnaires::list_questionnaires).post(questionnaires::create_questionnaire),
        )
        .route(
            "/api/questionnaires/{id}",
            get(questionnaires::get_questionnaire)
                .put(questionnaires::replace_questionnaire)
                .delete(questionnaires::delete_questionnaire),
        )
        .route(
            "/api/questionnaires/{id}/status",
            patch(questionnaires::update_questionnaire_status),
        )
        .route(
            "/api/questionnaires/{id}/start",
            post(questionnaires::start_questionnaire),
        )
        .route(
            "/api/questionnaires/{id}/submit",
            post(questionnaires::submit_questionnaire),
        )
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/api/tasks/{id}/start", post(tasks::start_task))
        .layer(middleware::from_fn(security_headers))
        .layer(build_cors())
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    response
}
