use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::info;

use crate::{application::repos::HealthRepo, cache::ResultCache};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

/// State for the operator-facing listener.
#[derive(Clone)]
pub struct AdminState {
    pub cache: Arc<ResultCache>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/_health/db", get(admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn invalidate_cache(State(state): State<AdminState>) -> Response {
    let dropped = state.cache.invalidate_all();
    info!(
        target = "tidings::http::admin",
        dropped, "result cache invalidated"
    );
    StatusCode::NO_CONTENT.into_response()
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.health_check().await)
}
