mod courses;
mod types;

pub use types::{CourseRecord, CourseResponse, CourseStore};

use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// The external HTTP view: `GET /api/courses` and `GET /api/courses/<code>` over a
/// precomputed `prereq_structured.json` snapshot. This is the only network-facing
/// surface outside the crawler itself (see the system overview's out-of-core note).
pub fn create_router(store: Arc<CourseStore>) -> Router {
    Router::new()
        .route("/api/courses", get(courses::list_courses))
        .route("/api/courses/:code", get(courses::get_course))
        .with_state(store)
}
