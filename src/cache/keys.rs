//! Cache fingerprints.
//!
//! Two requests that could render different bytes must never share a fingerprint.

use std::fmt;

use crate::application::pagination::RequestedPage;

/// The listing a cached render belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Global,
    Group,
    Author,
    FollowFeed,
}

impl ViewKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Global => "global",
            ViewKind::Group => "group",
            ViewKind::Author => "author",
            ViewKind::FollowFeed => "follow",
        }
    }
}

/// The viewer-dependent part of a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewerVariant {
    /// The render is identical for every viewer.
    Shared,
    /// Varying by token, and the request carried none.
    NoToken,
    Token(String),
}

impl ViewerVariant {
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some(token) => Self::Token(token.to_string()),
            None => Self::NoToken,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    view: ViewKind,
    scope: String,
    page: usize,
    variant: ViewerVariant,
}

impl Fingerprint {
    pub fn new(view: ViewKind, scope: impl Into<String>, page: RequestedPage) -> Self {
        Self {
            view,
            scope: scope.into(),
            page: page.get(),
            variant: ViewerVariant::Shared,
        }
    }

    pub fn with_variant(mut self, variant: ViewerVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.view.as_str(), self.scope, self.page)?;
        match &self.variant {
            ViewerVariant::Shared => Ok(()),
            ViewerVariant::NoToken => write!(f, ":-"),
            // Tokens are opaque session material; never print them.
            ViewerVariant::Token(_) => write!(f, ":token"),
        }
    }
}
