//! Errors callers branch on. Everything else travels as plain `anyhow`.
//!
//! Both types are wrapped in `anyhow::Error`; recover them with
//! `err.downcast_ref::<AuthRequired>()`.

use std::fmt;

/// The backend rejected the session (HTTP 401/403 on a read).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequired {
    pub login_url: String,
}

impl fmt::Display for AuthRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authentication required; log in at {}", self.login_url)
    }
}

impl std::error::Error for AuthRequired {}

/// The session is valid but lacks the capability for an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forbidden {
    pub action: String,
}

impl fmt::Display for Forbidden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires admin rights", self.action)
    }
}

impl std::error::Error for Forbidden {}

/// Login URL if `err` (or anything in its chain) is an [`AuthRequired`].
pub fn login_url(err: &anyhow::Error) -> Option<&str> {
    err.chain()
        .find_map(|e| e.downcast_ref::<AuthRequired>())
        .map(|a| a.login_url.as_str())
}

/// Whether `err` (or anything in its chain) is a [`Forbidden`].
pub fn is_forbidden(err: &anyhow::Error) -> bool {
    err.chain().any(|e| e.downcast_ref::<Forbidden>().is_some())
}
