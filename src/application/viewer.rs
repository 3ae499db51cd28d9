//! Who is asking: the identity every listing and write action is evaluated for.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated(Uuid),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("an authenticated viewer is required")]
pub struct Unauthorized;

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(id) => Some(*id),
        }
    }

    /// Authorization guard for write actions and the follow feed.
    pub fn require_authenticated(&self) -> Result<Uuid, Unauthorized> {
        self.user_id().ok_or(Unauthorized)
    }
}
