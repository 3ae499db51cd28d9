use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    application::{
        follow::FollowError, listing::ListingError, posts::PostActionError, repos::RepoError,
    },
    infra::error::InfraError,
};

/// Diagnostic chain attached to error responses for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    message: &'static str,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: self.status.as_u16(),
            message: self.public_message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Map a repository failure; used by every application error conversion.
pub fn repo_error_to_http(source: &'static str, err: &RepoError) -> HttpError {
    let (status, message) = match err {
        RepoError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
        RepoError::Duplicate { .. } => (StatusCode::CONFLICT, "Duplicate record"),
        RepoError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Invalid input"),
        RepoError::Integrity { .. } => (StatusCode::CONFLICT, "Integrity constraint violated"),
        RepoError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Database timeout"),
        RepoError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    };
    HttpError::from_error(source, status, message, err)
}

impl From<ListingError> for HttpError {
    fn from(error: ListingError) -> Self {
        const SOURCE: &str = "application::listing";
        match error {
            ListingError::NotFound { entity } => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Not found",
                format!("{entity} does not exist"),
            ),
            ListingError::InvalidPage(err) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Not found", &err)
            }
            ListingError::Unauthorized(err) => HttpError::from_error(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Authentication required",
                &err,
            ),
            ListingError::Repo(err) => repo_error_to_http(SOURCE, &err),
            ListingError::Render(detail) => HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                detail,
            ),
        }
    }
}

impl From<PostActionError> for HttpError {
    fn from(error: PostActionError) -> Self {
        const SOURCE: &str = "application::posts";
        match error {
            PostActionError::NotFound { entity } => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Not found",
                format!("{entity} does not exist"),
            ),
            PostActionError::Unauthorized(err) => HttpError::from_error(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Authentication required",
                &err,
            ),
            PostActionError::Forbidden { post_id } => HttpError::new(
                SOURCE,
                StatusCode::FORBIDDEN,
                "Not allowed",
                format!("viewer is not the author of post {post_id}"),
            ),
            PostActionError::Invalid(err) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &err,
            ),
            PostActionError::Repo(err) => repo_error_to_http(SOURCE, &err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "application::follow";
        match error {
            FollowError::AuthorNotFound => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Not found",
                "author does not exist",
            ),
            FollowError::Unauthorized(err) => HttpError::from_error(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Authentication required",
                &err,
            ),
            FollowError::Repo(err) => repo_error_to_http(SOURCE, &err),
        }
    }
}

/// Process-level failure reported by the binary before exiting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
