mod admin;
mod middleware;
mod public;
mod views;

pub use admin::{AdminState, build_admin_router};
pub use public::{HttpState, build_router};

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::{
    error::ErrorReport,
    follow::FollowService,
    listing::{ListingLimits, ListingService},
    posts::PostService,
    repos::{RepoError, Store},
};
use crate::cache::{CacheConfig, ResultCache};
use crate::config::Settings;

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Wire the application services over one backing store and share a single
/// result cache between the public and admin listeners.
pub fn build_states<S>(store: Arc<S>, settings: &Settings) -> (HttpState, AdminState)
where
    S: Store + 'static,
{
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(ResultCache::new(&cache_config));

    let listings = Arc::new(ListingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        ListingLimits::from(&settings.listing),
    ));
    let posts = Arc::new(PostService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let follows = Arc::new(FollowService::new(store.clone(), store.clone()));

    let http = HttpState {
        listings,
        posts,
        follows,
        cache: cache.clone(),
        cache_config,
        auth: settings.auth.clone(),
        health: store.clone(),
    };
    let admin = AdminState {
        cache,
        health: store,
    };
    (http, admin)
}
