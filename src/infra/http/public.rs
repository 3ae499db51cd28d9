use std::sync::Arc;

use axum::{
    Extension, Form, Json, Router,
    body::Body,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    application::{
        error::HttpError,
        follow::{FollowError, FollowService},
        listing::{ListingContext, ListingError, ListingKind, ListingService},
        pagination::RequestedPage,
        posts::{PostActionError, PostDraft, PostService},
        repos::HealthRepo,
        viewer::Viewer,
    },
    cache::{CacheConfig, RenderedPage, ResultCache, ViewerVariant},
    config::AuthSettings,
};

use super::{
    db_health_response,
    middleware::{log_responses, resolve_viewer, set_request_context},
    views::{ListingView, PostDetailView},
};

#[derive(Clone)]
pub struct HttpState {
    pub listings: Arc<ListingService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub cache: Arc<ResultCache>,
    pub cache_config: CacheConfig,
    pub auth: AuthSettings,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(global_timeline))
        .route("/group/{slug}", get(group_timeline))
        .route("/profile/{username}", get(author_timeline))
        .route("/follow", get(follow_feed))
        .route("/posts/{id}", get(post_detail))
        .route("/create", post(create_post))
        .route("/posts/{id}/edit", post(edit_post))
        .route("/posts/{id}/comment", post(add_comment))
        .route("/profile/{username}/follow", post(follow_author))
        .route("/profile/{username}/unfollow", post(unfollow_author))
        .route("/_health/db", get(public_health))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_viewer))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostForm {
    text: String,
    group: Option<String>,
    image: Option<String>,
}

impl From<PostForm> for PostDraft {
    fn from(form: PostForm) -> Self {
        Self {
            text: form.text,
            group_slug: form.group,
            image: form.image,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentForm {
    text: String,
}

async fn global_timeline(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = match RequestedPage::parse(query.page.as_deref()) {
        Ok(page) => page,
        Err(err) => return HttpError::from(ListingError::from(err)).into_response(),
    };
    let context = ListingContext::new(ListingKind::Global, page, viewer);

    let variant = if state.cache_config.vary_on_viewer_token {
        ViewerVariant::from_token(cookie_value(
            &headers,
            &state.cache_config.viewer_token_cookie,
        ))
    } else {
        ViewerVariant::Shared
    };

    let rendered = match context.fingerprint(variant) {
        Some(fingerprint) => {
            state
                .cache
                .get_or_compute(fingerprint, state.cache_config.ttl(), || {
                    render_listing(&state.listings, &context)
                })
                .await
        }
        None => render_listing(&state.listings, &context).await,
    };

    match rendered {
        Ok(rendered) => rendered_response(rendered),
        Err(err) => listing_error_response(&state.auth, err, next_target(&uri)),
    }
}

async fn group_timeline(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    OriginalUri(uri): OriginalUri,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    listing_response(&state, ListingKind::ByGroup(slug), viewer, &query, next_target(&uri)).await
}

async fn author_timeline(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    OriginalUri(uri): OriginalUri,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    listing_response(
        &state,
        ListingKind::ByAuthor(username),
        viewer,
        &query,
        next_target(&uri),
    )
    .await
}

async fn follow_feed(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> Response {
    listing_response(&state, ListingKind::FollowFeed, viewer, &query, next_target(&uri)).await
}

async fn post_detail(State(state): State<HttpState>, Path(id): Path<Uuid>) -> Response {
    match state.posts.detail(id).await {
        Ok(detail) => Json(PostDetailView::from(detail)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn create_post(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<PostForm>,
) -> Response {
    match state.posts.create(viewer, form.into()).await {
        Ok(post) => Redirect::to(&profile_path(&post.author.username)).into_response(),
        Err(err) => post_action_error_response(&state.auth, err, next_target(&uri)),
    }
}

async fn edit_post(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
    Form(form): Form<PostForm>,
) -> Response {
    match state.posts.edit(viewer, id, form.into()).await {
        Ok(post) => Redirect::to(&detail_path(post.id)).into_response(),
        Err(err) => post_action_error_response(&state.auth, err, next_target(&uri)),
    }
}

async fn add_comment(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
    Form(form): Form<CommentForm>,
) -> Response {
    match state.posts.add_comment(viewer, id, &form.text).await {
        Ok(_) => Redirect::to(&detail_path(id)).into_response(),
        Err(err) => post_action_error_response(&state.auth, err, next_target(&uri)),
    }
}

async fn follow_author(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    OriginalUri(uri): OriginalUri,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(viewer, &username).await {
        Ok(_) => Redirect::to(&profile_path(&username)).into_response(),
        Err(err) => follow_error_response(&state.auth, err, next_target(&uri)),
    }
}

async fn unfollow_author(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    OriginalUri(uri): OriginalUri,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(viewer, &username).await {
        Ok(_) => Redirect::to(&profile_path(&username)).into_response(),
        Err(err) => follow_error_response(&state.auth, err, next_target(&uri)),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

async fn listing_response(
    state: &HttpState,
    kind: ListingKind,
    viewer: Viewer,
    query: &PageQuery,
    path: &str,
) -> Response {
    let page = match RequestedPage::parse(query.page.as_deref()) {
        Ok(page) => page,
        Err(err) => return HttpError::from(ListingError::from(err)).into_response(),
    };
    let context = ListingContext::new(kind, page, viewer);

    match render_listing(&state.listings, &context).await {
        Ok(rendered) => rendered_response(rendered),
        Err(err) => listing_error_response(&state.auth, err, path),
    }
}

async fn render_listing(
    listings: &ListingService,
    context: &ListingContext,
) -> Result<RenderedPage, ListingError> {
    let listing = listings.page(context).await?;
    let body = serde_json::to_vec(&ListingView::from(listing))
        .map_err(|err| ListingError::Render(err.to_string()))?;

    Ok(RenderedPage {
        status: StatusCode::OK.as_u16(),
        headers: vec![(CONTENT_TYPE.to_string(), "application/json".to_string())],
        body: Bytes::from(body),
    })
}

fn rendered_response(rendered: RenderedPage) -> Response {
    let mut response = Response::new(Body::from(rendered.body));
    *response.status_mut() = StatusCode::from_u16(rendered.status).unwrap_or(StatusCode::OK);
    for (name, value) in rendered.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(
                target = "tidings::http::public",
                header = %name,
                "dropping unrepresentable cached header"
            ),
        }
    }
    response
}

fn listing_error_response(auth: &AuthSettings, err: ListingError, path: &str) -> Response {
    match err {
        ListingError::Unauthorized(_) => login_redirect(auth, path),
        other => HttpError::from(other).into_response(),
    }
}

fn post_action_error_response(auth: &AuthSettings, err: PostActionError, path: &str) -> Response {
    match err {
        PostActionError::Unauthorized(_) => login_redirect(auth, path),
        PostActionError::Forbidden { post_id } => Redirect::to(&detail_path(post_id)).into_response(),
        other => HttpError::from(other).into_response(),
    }
}

fn follow_error_response(auth: &AuthSettings, err: FollowError, path: &str) -> Response {
    match err {
        FollowError::Unauthorized(_) => login_redirect(auth, path),
        other => HttpError::from(other).into_response(),
    }
}

/// Send an anonymous viewer to the login page, remembering where they were going.
fn login_redirect(auth: &AuthSettings, next: &str) -> Response {
    let next: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    Redirect::to(&format!("{}?next={next}", auth.login_path)).into_response()
}

/// Path and query of the original request, used as the post-login target.
fn next_target(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|target| target.as_str())
        .unwrap_or_else(|| uri.path())
}

fn profile_path(username: &str) -> String {
    let segment: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{}", segment.replace('+', "%20"))
}

fn detail_path(post_id: Uuid) -> String {
    format!("/posts/{post_id}")
}

/// Value of cookie `name` from the request's `Cookie` headers, if present.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_lookup_handles_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionid=abc123 ; other=1"),
        );
        assert_eq!(cookie_value(&headers, "sessionid"), Some("abc123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn profile_path_escapes_the_username() {
        assert_eq!(profile_path("alice"), "/profile/alice");
        assert_eq!(profile_path("ann lee"), "/profile/ann%20lee");
    }

    #[test]
    fn next_target_keeps_the_query() {
        let uri: Uri = "/follow?page=3".parse().unwrap();
        assert_eq!(next_target(&uri), "/follow?page=3");
    }

    #[test]
    fn login_redirect_encodes_next() {
        let auth = AuthSettings {
            viewer_header: "x-authenticated-user".into(),
            login_path: "/auth/login/".into(),
        };
        let response = login_redirect(&auth, "/profile/ann lee/follow");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(axum::http::header::LOCATION).unwrap(),
            "/auth/login/?next=%2Fprofile%2Fann+lee%2Ffollow"
        );
    }
}
