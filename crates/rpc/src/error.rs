//! Error types of the dispatch core.
//!
//! - [`RpcError`]: request-level failures, observed by transports through
//!   [`CallListener::on_fail`](crate::listener::CallListener::on_fail)
//! - [`BuildError`]: problems found while compiling the route table
//! - [`AlreadyResolved`]: a [`Task`](crate::Task) was resolved twice, which is a framework bug

use http::Method;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("not found: {reason}")]
    NotFound { reason: String },

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl RpcError {
    pub fn not_found<S: ToString>(str: S) -> Self {
        Self::NotFound { reason: str.to_string() }
    }

    pub fn no_route(method: &Method, path: &str, version: u32) -> Self {
        Self::NotFound { reason: format!("no route for {method} {path} at version {version}") }
    }

    pub fn unauthorized<S: ToString>(str: S) -> Self {
        Self::Unauthorized { reason: str.to_string() }
    }

    pub fn invalid_state<S: ToString>(str: S) -> Self {
        Self::InvalidState { reason: str.to_string() }
    }

    pub fn internal<S: ToString>(str: S) -> Self {
        Self::Internal { reason: str.to_string() }
    }

    /// Client-caused outcomes that observability collaborators must not count as server errors.
    #[inline]
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::NotFound { reason }
            | Self::Unauthorized { reason }
            | Self::InvalidState { reason }
            | Self::Internal { reason } => reason,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("duplicate route {method} {equivalence_path} at version {version}: '{first}' and '{second}'")]
    DuplicateRoute { method: Method, equivalence_path: String, version: u32, first: String, second: String },

    #[error("handler '{name}' has an invalid version suffix '{suffix}'")]
    InvalidVersion { name: String, suffix: String },

    #[error("route '{route}' has {captures} captured segments but {params} path parameters")]
    PathParamCountMismatch { route: String, captures: usize, params: usize },

    #[error("route '{route}' captures ':{param}' which is not declared as a path parameter")]
    UndeclaredPathParam { route: String, param: String },

    #[error("route '{route}' declares parameter '{param}' twice")]
    DuplicateParam { route: String, param: String },

    #[error("invalid path template '{path}' for route '{route}': {reason}")]
    InvalidPath { route: String, path: String, reason: String },

    #[error("plugin '{plugin}' rejected route '{route}': {reason}")]
    Plugin { plugin: String, route: String, reason: String },

    #[error("handler of route '{route}' does not fit its parameters: {reason}")]
    HandlerSignature { route: String, reason: String },

    #[error("route name '{name}' is registered twice")]
    DuplicateName { name: String },
}

impl BuildError {
    pub fn duplicate_route(
        method: &Method,
        equivalence_path: &str,
        version: u32,
        first: &str,
        second: &str,
    ) -> Self {
        Self::DuplicateRoute {
            method: method.clone(),
            equivalence_path: equivalence_path.to_string(),
            version,
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn invalid_version<S: ToString>(name: &str, suffix: S) -> Self {
        Self::InvalidVersion { name: name.to_string(), suffix: suffix.to_string() }
    }

    pub fn invalid_path<S: ToString>(route: &str, path: &str, reason: S) -> Self {
        Self::InvalidPath { route: route.to_string(), path: path.to_string(), reason: reason.to_string() }
    }

    pub fn plugin<S: ToString>(plugin: &str, route: &str, reason: S) -> Self {
        Self::Plugin { plugin: plugin.to_string(), route: route.to_string(), reason: reason.to_string() }
    }
}

/// Raised (as an error, or as a panic payload) when a [`Task`](crate::Task) that already left
/// the waiting state is resolved again.
///
/// This is never a request error: the dispatch panic guard re-raises it instead of turning it
/// into an [`RpcError`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("task already resolved")]
pub struct AlreadyResolved;
