//! Per-request dispatch.
//!
//! A transport hands each decoded request to [`Dispatcher::dispatch`] as a [`CallRequest`] and
//! gets back a [`Task`] with the call result. Dispatch matches the route, binds its parameters,
//! runs the plugin pipeline around the handler and reports the outcome to the
//! [`CallListener`] exactly once. Nothing unwinds out of `dispatch`: errors and panics of every
//! stage end up as the task's error.

use crate::args::{Args, TransportHandle};
use crate::config::DispatchConfig;
use crate::error::RpcError;
use crate::extract::{bind, QuerySources};
use crate::listener::{CallListener, TracingListener};
use crate::plugin;
use crate::route::{PathSegment, Route, RouteTable};
use crate::task::{guard, Task};
use arc_swap::ArcSwap;
use bytes::Bytes;
use http::Method;
use once_cell::unsync::OnceCell;
use serde_json::Value;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Where a call currently is.
///
/// `Received → Matched → ParameterBound → PluginCall(0..n) → HandlerExecuting →
/// PluginResult(0..n) → Succeeded`; `Failed` can follow any state. Both `Succeeded` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    Received,
    Matched,
    ParameterBound,
    /// `modify_call` of the plugin at this index
    PluginCall(usize),
    HandlerExecuting,
    /// `modify_result` of the plugin at this index
    PluginResult(usize),
    Succeeded,
    Failed,
}

impl CallStage {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, CallStage::Succeeded | CallStage::Failed)
    }
}

/// What a transport knows about one request.
pub struct CallRequest {
    method: Method,
    path: String,
    version: Option<u32>,
    form: Option<Bytes>,
    json: Option<Value>,
    transport: Option<TransportHandle>,
}

impl CallRequest {
    /// `path` may carry the URL query string after a `?`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), version: None, form: None, json: None, transport: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// The requested API version, `YYYYMMDD`.
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// An `application/x-www-form-urlencoded` body.
    pub fn form(mut self, body: impl Into<Bytes>) -> Self {
        self.form = Some(body.into());
        self
    }

    /// A JSON object body.
    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn transport(mut self, handle: TransportHandle) -> Self {
        self.transport = Some(handle);
        self
    }
}

impl fmt::Debug for CallRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("form", &self.form.as_ref().map(Bytes::len))
            .field("json", &self.json.is_some())
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

/// The per-call state shared by the dispatcher, the plugins and the listener.
pub struct RouteContext {
    call_id: Cell<u64>,
    method: Method,
    path: String,
    version: u32,
    route: OnceCell<Arc<Route>>,
    path_params: OnceCell<Vec<(Box<str>, String)>>,
    stage: Cell<CallStage>,
    transport: Option<TransportHandle>,
}

impl RouteContext {
    pub(crate) fn new(
        method: Method,
        path: impl Into<String>,
        version: u32,
        transport: Option<TransportHandle>,
    ) -> Self {
        Self {
            call_id: Cell::new(0),
            method,
            path: path.into(),
            version,
            route: OnceCell::new(),
            path_params: OnceCell::new(),
            stage: Cell::new(CallStage::Received),
            transport,
        }
    }

    /// The correlation id returned by [`CallListener::on_start`].
    pub fn call_id(&self) -> u64 {
        self.call_id.get()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path as the transport supplied it, query string included.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The requested version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The matched route; `None` until matching succeeded.
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.get()
    }

    pub fn route_name(&self) -> Option<&str> {
        self.route().map(|route| route.name())
    }

    /// Raw text of a path capture, by parameter name.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params()
            .iter()
            .find(|(param, _)| param.as_ref() == name)
            .map(|(_, text)| text.as_str())
    }

    pub fn path_params(&self) -> &[(Box<str>, String)] {
        self.path_params.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn stage(&self) -> CallStage {
        self.stage.get()
    }

    pub fn transport<T: 'static>(&self) -> Option<&T> {
        self.transport.as_ref()?.downcast_ref::<T>()
    }

    pub(crate) fn set_call_id(&self, call_id: u64) {
        self.call_id.set(call_id);
    }

    pub(crate) fn attach_route(&self, route: Arc<Route>) {
        let _ = self.route.set(route);
    }

    /// Moves the call to `stage`; a terminal stage is never left.
    pub(crate) fn enter(&self, stage: CallStage) {
        let current = self.stage.get();
        if current.is_terminal() {
            return;
        }
        trace!(call_id = self.call_id(), from = ?current, to = ?stage, "call stage");
        self.stage.set(stage);
    }
}

impl fmt::Debug for RouteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteContext")
            .field("call_id", &self.call_id())
            .field("method", &self.method)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("route", &self.route_name())
            .field("stage", &self.stage())
            .finish_non_exhaustive()
    }
}

/// Routes calls of one transport.
///
/// The dispatcher is `Send + Sync` and may be shared between event loops; every call it
/// produces lives on the thread that dispatched it.
pub struct Dispatcher {
    table: ArcSwap<RouteTable>,
    listener: Arc<dyn CallListener>,
    config: DispatchConfig,
}

#[derive(Error, Debug)]
pub enum DispatcherBuildError {
    #[error("route table must be set")]
    MissingTable,
}

pub struct DispatcherBuilder {
    table: Option<Arc<RouteTable>>,
    listener: Option<Arc<dyn CallListener>>,
    config: DispatchConfig,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self { table: None, listener: None, config: DispatchConfig::default() }
    }

    pub fn table(mut self, table: impl Into<Arc<RouteTable>>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Defaults to a [`TracingListener`].
    pub fn listener(mut self, listener: impl CallListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Dispatcher, DispatcherBuildError> {
        let table = self.table.ok_or(DispatcherBuildError::MissingTable)?;
        let listener = self.listener.unwrap_or_else(|| Arc::new(TracingListener::new()));
        Ok(Dispatcher::new(table, listener, self.config))
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("routes", &self.table.as_ref().map(|t| t.routes().len()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(table: Arc<RouteTable>, listener: Arc<dyn CallListener>, config: DispatchConfig) -> Self {
        Self { table: ArcSwap::new(table), listener, config }
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// The route table new calls are matched against.
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Installs a new route table; calls already dispatched keep their route.
    pub fn replace_table(&self, table: Arc<RouteTable>) -> Arc<RouteTable> {
        info!(routes = table.routes().len(), "replacing route table");
        self.table.swap(table)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Runs one call. The returned task resolves with the handler's result after every plugin
    /// stage, or with the first failure.
    pub fn dispatch(&self, request: CallRequest) -> Task<Value> {
        let CallRequest { method, path, version, form, json, transport } = request;
        let version = version.unwrap_or(self.config.default_version());
        let context = Rc::new(RouteContext::new(method, path, version, transport));

        let prepared = guard(|| {
            let call_id = self.listener.on_start(&context);
            context.set_call_id(call_id);
            self.prepare(&context, form, json)
        })
        .and_then(|prepared| prepared);

        let task = match prepared {
            Ok((route, args)) => plugin::run(route, Rc::clone(&context), args),
            Err(e) => {
                context.enter(CallStage::Failed);
                Task::failed(e)
            }
        };

        let listener = Arc::clone(&self.listener);
        task.map_maybe(move |outcome| {
            match &outcome {
                Ok(result) => listener.on_succeed(&context, result),
                Err(e) => listener.on_fail(&context, e),
            }
            outcome
        })
    }

    fn prepare(
        &self,
        context: &RouteContext,
        form: Option<Bytes>,
        json: Option<Value>,
    ) -> Result<(Arc<Route>, Args), RpcError> {
        let table = self.table.load();
        let path = context.path();
        let (route, captures) = table
            .router()
            .at(context.method(), path, context.version())
            .ok_or_else(|| RpcError::no_route(context.method(), path, context.version()))?
            .into_parts();

        context.attach_route(Arc::clone(route));
        let path_params = captures
            .iter()
            .filter_map(|capture| match route.segments().get(capture.depth) {
                Some(PathSegment::Capture { name, .. }) => Some((name.clone(), capture.text.to_string())),
                _ => None,
            })
            .collect();
        let _ = context.path_params.set(path_params);
        context.enter(CallStage::Matched);
        debug!(call_id = context.call_id(), route = route.name(), version = route.version(), "route matched");

        let mut sources = QuerySources::new();
        if let Some((_, query)) = path.split_once('?') {
            sources = sources.with_query(query)?;
        }
        if let Some(form) = form {
            sources = sources.with_form(&form)?;
        }
        if let Some(json) = json {
            sources = sources.with_json(json)?;
        }

        let values = bind(route, &captures, &sources, self.config.source_order(), self.config.parser())?;
        context.enter(CallStage::ParameterBound);

        let args = Args::new(Arc::clone(route.params()), values, context.transport.clone());
        Ok((Arc::clone(route), args))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.table.load().routes().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
