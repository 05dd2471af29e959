//! Route plugins.
//!
//! A [`Plugin`] is registered on the [`RouteTableBuilder`](crate::route::RouteTableBuilder) and
//! offered every route at build time. It may extend the route's signature and attach itself with
//! a per-route [`PluginContext`], or decline.
//!
//! At call time the attached plugins of a route run in registration order around the handler:
//! [`Plugin::modify_call`] before it, [`Plugin::modify_result`] after it. Each stage receives a
//! one-shot continuation ([`CallNext`] / [`ResultNext`]) that must be consumed exactly once,
//! either synchronously or after the plugin's own asynchronous work finished.
//!
//! ```
//! use micro_rpc::plugin::{CallNext, Plugin, PluginBinding, PluginContext};
//! use micro_rpc::route::{ParamSpec, RouteSignature};
//! use micro_rpc::{Args, BuildError, ParamType, RouteContext, RpcError};
//!
//! /// Injects the caller's name into every route that accepts a `user` parameter.
//! struct CurrentUser;
//!
//! impl Plugin for CurrentUser {
//!     fn name(&self) -> &str {
//!         "current-user"
//!     }
//!
//!     fn bind(&self, signature: &mut RouteSignature) -> Result<Option<PluginContext>, BuildError> {
//!         let slot = signature.add_param(ParamSpec::injected("user", ParamType::String));
//!         Ok(Some(PluginContext::new(slot)))
//!     }
//!
//!     fn modify_call(&self, binding: &PluginBinding, _call: &RouteContext, mut args: Args, next: CallNext) {
//!         match binding.context().get::<usize>() {
//!             Some(slot) => {
//!                 args.set(*slot, "alice");
//!                 next.proceed(args);
//!             }
//!             None => next.abort(RpcError::unauthorized("no user")),
//!         }
//!     }
//! }
//! ```

mod pipeline;

pub use pipeline::{CallNext, ResultNext};

pub(crate) use pipeline::run;

use crate::args::Args;
use crate::dispatch::RouteContext;
use crate::error::BuildError;
use crate::route::RouteSignature;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque per-route state a plugin computed at build time.
#[derive(Clone, Default)]
pub struct PluginContext {
    value: Option<Arc<dyn Any + Send + Sync>>,
}

impl PluginContext {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self { value: Some(Arc::new(value)) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.value.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext").field("present", &self.value.is_some()).finish()
    }
}

/// A plugin attached to one route.
#[derive(Clone)]
pub struct PluginBinding {
    plugin: Arc<dyn Plugin>,
    context: PluginContext,
    slots: Vec<usize>,
}

impl PluginBinding {
    pub(crate) fn new(plugin: Arc<dyn Plugin>, context: PluginContext, slots: Vec<usize>) -> Self {
        Self { plugin, context, slots }
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.plugin.as_ref()
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    /// Argument indices of the parameters this plugin added to the route.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }
}

impl fmt::Debug for PluginBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginBinding")
            .field("plugin", &self.plugin.name())
            .field("context", &self.context)
            .field("slots", &self.slots)
            .finish()
    }
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Offered each route once while the table is built.
    ///
    /// The plugin may add parameters or prefix the path through `signature`. Returning
    /// `Ok(None)` leaves the route untouched by this plugin at call time; an error aborts the
    /// build.
    fn bind(&self, signature: &mut RouteSignature) -> Result<Option<PluginContext>, BuildError> {
        let _ = signature;
        Ok(Some(PluginContext::empty()))
    }

    /// Runs before the handler with the bound arguments.
    fn modify_call(&self, binding: &PluginBinding, call: &RouteContext, args: Args, next: CallNext) {
        let _ = (binding, call);
        next.proceed(args);
    }

    /// Runs after the handler succeeded with its result.
    fn modify_result(&self, binding: &PluginBinding, call: &RouteContext, result: Value, next: ResultNext) {
        let _ = (binding, call);
        next.proceed(result);
    }
}
