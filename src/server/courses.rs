use super::types::{CourseResponse, CourseStore};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// `GET /api/courses` — every course, reformatted to the external view's shape, as a JSON
/// array (matching the catalog tool's own `jsonify(formatted_courses)` list response).
/// 404 if the store is empty, matching the original tool's "no courses data found"
/// response.
pub async fn list_courses(State(store): State<Arc<CourseStore>>) -> Response {
    if store.records.is_empty() {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "No courses data found"}))).into_response();
    }
    let mut body: Vec<CourseResponse> = store
        .records
        .iter()
        .map(|(code, record)| CourseResponse::from_record(code, record))
        .collect();
    body.sort_by(|a, b| a.name.cmp(&b.name));
    Json(body).into_response()
}

/// `GET /api/courses/<code>` — a single course, 404 with a JSON error body if unknown.
pub async fn get_course(State(store): State<Arc<CourseStore>>, Path(code): Path<String>) -> Response {
    match store.records.get(&code) {
        Some(record) => Json(CourseResponse::from_record(&code, record)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Course {code} not found")})),
        )
            .into_response(),
    }
}
