//! Call lifecycle notifications.
//!
//! The dispatcher reports every call to a [`CallListener`]: `on_start` once the call begins,
//! then exactly one of `on_succeed` or `on_fail`. Metrics and access logs hang off this
//! interface.

use crate::dispatch::RouteContext;
use crate::error::RpcError;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

#[cfg_attr(test, mockall::automock)]
pub trait CallListener: Send + Sync {
    /// Returns the correlation id of the call.
    fn on_start(&self, call: &RouteContext) -> u64;

    fn on_succeed(&self, call: &RouteContext, result: &Value);

    fn on_fail(&self, call: &RouteContext, error: &RpcError);
}

/// Logs every call with `tracing` and numbers calls with an atomic counter.
///
/// Expected failures are logged at `warn`, unexpected ones at `error`.
#[derive(Debug, Default)]
pub struct TracingListener {
    next_id: AtomicU64,
}

impl TracingListener {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CallListener for TracingListener {
    fn on_start(&self, call: &RouteContext) -> u64 {
        let call_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(call_id, method = %call.method(), path = call.path(), version = call.version(), "call started");
        call_id
    }

    fn on_succeed(&self, call: &RouteContext, _result: &Value) {
        info!(call_id = call.call_id(), route = call.route_name(), "call succeeded");
    }

    fn on_fail(&self, call: &RouteContext, error: &RpcError) {
        if error.is_expected() {
            warn!(call_id = call.call_id(), route = call.route_name(), cause = %error, "call failed");
        } else {
            error!(call_id = call.call_id(), route = call.route_name(), cause = %error, "call failed unexpectedly");
        }
    }
}
