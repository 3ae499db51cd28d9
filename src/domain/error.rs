use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("`{field}` must not be blank")]
    BlankText { field: &'static str },
    #[error("user {user_id} cannot follow themselves")]
    SelfFollow { user_id: Uuid },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn blank(field: &'static str) -> Self {
        Self::BlankText { field }
    }
}

/// Trim user-supplied text, rejecting input that is empty after trimming.
pub fn require_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::blank(field));
    }
    Ok(trimmed.to_string())
}
