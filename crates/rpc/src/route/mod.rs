//! Route metadata: registration input and the immutable routes built from it.
//!
//! Routes are declared with [`RouteDefinition`] (usually through the method helpers such as
//! [`get`] and [`post`]) and compiled by [`RouteTable::builder`].
//!
//! ```
//! use micro_rpc::route::{get, ParamSpec, RouteTable};
//! use micro_rpc::{handler_fn, ParamType};
//!
//! fn get_item(id: i32, verbose: bool) -> String {
//!     format!("{id}:{verbose}")
//! }
//!
//! let table = RouteTable::builder()
//!     .route(
//!         get("get_item_2023_01_01", "/items/:id", handler_fn(get_item))
//!             .param(ParamSpec::path("id", ParamType::Int))
//!             .param(ParamSpec::query("verbose", ParamType::Bool).default_value(false)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(table.routes()[0].version(), 20230101);
//! ```

mod table;
mod version;

pub use table::{RouteTable, RouteTableBuilder};

pub(crate) use version::parse_version;

use crate::error::BuildError;
use crate::handler::RouteHandler;
use crate::plugin::PluginBinding;
use crate::router::segment_hash;
use crate::value::{ParamType, ParamValue};
use http::Method;
use std::fmt;
use std::sync::Arc;

/// Marker that replaces every capture in an equivalence path.
pub const WILDCARD_MARKER: &str = "*";

/// Where the binder looks for a parameter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    /// a `:name` capture of the path template
    Path,
    /// the URL query string, a form body or a JSON body
    Query,
    /// written by a plugin during `modify_call`
    Injected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    name: String,
    name_hash: u64,
    ty: ParamType,
    source: ParamSource,
    required: bool,
    default: ParamValue,
    description: String,
}

impl ParamSpec {
    fn new(name: impl Into<String>, ty: ParamType, source: ParamSource, required: bool) -> Self {
        let name = name.into();
        let name_hash = segment_hash(&name);
        Self { name, name_hash, ty, source, required, default: ParamValue::Null, description: String::new() }
    }

    /// A path capture; always required.
    pub fn path(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, ParamSource::Path, true)
    }

    /// An optional query parameter; see [`ParamSpec::required`] and [`ParamSpec::default_value`].
    pub fn query(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, ParamSource::Query, false)
    }

    pub fn injected(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, ParamSource::Injected, false)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = value.into();
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn name_hash(&self) -> u64 {
        self.name_hash
    }

    pub fn param_type(&self) -> ParamType {
        self.ty
    }

    pub fn source(&self) -> ParamSource {
        self.source
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> &ParamValue {
        &self.default
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// One `/`-delimited token of a route's path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(Box<str>),
    /// `:name`, bound to the parameter at `param` in the route's parameter list
    Capture { name: Box<str>, param: usize },
}

impl PathSegment {
    #[inline]
    pub fn is_capture(&self) -> bool {
        matches!(self, PathSegment::Capture { .. })
    }
}

/// Registration input for one handler.
pub struct RouteDefinition {
    name: String,
    method: Method,
    path: String,
    params: Vec<ParamSpec>,
    handler: Arc<dyn RouteHandler>,
}

impl RouteDefinition {
    pub fn new(
        method: Method,
        name: impl Into<String>,
        path: impl Into<String>,
        handler: impl RouteHandler + 'static,
    ) -> Self {
        Self { name: name.into(), method, path: path.into(), params: vec![], handler: Arc::new(handler) }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(mut self, specs: impl IntoIterator<Item = ParamSpec>) -> Self {
        self.params.extend(specs);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

macro_rules! method_route {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Declares a ", stringify!($upper_case_method), " route.")]
        pub fn $method(
            name: impl Into<String>,
            path: impl Into<String>,
            handler: impl RouteHandler + 'static,
        ) -> RouteDefinition {
            RouteDefinition::new(Method::$upper_case_method, name, path, handler)
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(patch, PATCH);

/// The mutable view of a route that plugins see while the table is being built.
#[derive(Debug)]
pub struct RouteSignature {
    pub name: String,
    pub method: Method,
    pub version: u32,
    pub path: String,
    pub params: Vec<ParamSpec>,
}

impl RouteSignature {
    pub fn add_param(&mut self, spec: ParamSpec) -> usize {
        self.params.push(spec);
        self.params.len() - 1
    }

    /// Prepends a path prefix such as `/:tenant`; the captures it introduces must be declared.
    pub fn prefix_path(&mut self, prefix: &str) {
        let prefix = prefix.trim_end_matches('/');
        self.path = format!("{prefix}/{}", self.path.trim_start_matches('/'));
    }
}

/// One versioned, callable endpoint.
pub struct Route {
    name: String,
    method: Method,
    version: u32,
    path_template: String,
    equivalence_path: String,
    segments: Vec<PathSegment>,
    params: Arc<[ParamSpec]>,
    plugins: Vec<PluginBinding>,
    handler: Arc<dyn RouteHandler>,
}

impl Route {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 0 for unversioned routes, `YYYYMMDD` otherwise.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    /// The path template with every capture replaced by [`WILDCARD_MARKER`].
    pub fn equivalence_path(&self) -> &str {
        &self.equivalence_path
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn params(&self) -> &Arc<[ParamSpec]> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }

    pub fn plugins(&self) -> &[PluginBinding] {
        &self.plugins
    }

    pub(crate) fn handler(&self) -> &dyn RouteHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("version", &self.version)
            .field("path", &self.path_template)
            .field("plugins", &self.plugins.len())
            .finish_non_exhaustive()
    }
}

/// Parses a path template into segments, linking each capture to its declared path parameter.
pub(crate) fn parse_path(route: &str, path: &str, params: &[ParamSpec]) -> Result<Vec<PathSegment>, BuildError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(vec![]);
    }

    let mut segments = Vec::new();
    for token in trimmed.split('/') {
        if token.is_empty() {
            return Err(BuildError::invalid_path(route, path, "empty segment"));
        }
        if token.contains(['?', '#', '*']) {
            return Err(BuildError::invalid_path(route, path, format!("illegal character in segment '{token}'")));
        }

        let Some(name) = token.strip_prefix(':') else {
            segments.push(PathSegment::Literal(token.into()));
            continue;
        };

        if name.is_empty() {
            return Err(BuildError::invalid_path(route, path, "capture without a name"));
        }
        let param = params
            .iter()
            .position(|spec| spec.source == ParamSource::Path && spec.name == name)
            .ok_or_else(|| BuildError::UndeclaredPathParam { route: route.to_string(), param: name.to_string() })?;
        if segments.iter().any(|s| matches!(s, PathSegment::Capture { param: p, .. } if *p == param)) {
            return Err(BuildError::invalid_path(route, path, format!("':{name}' captured twice")));
        }
        segments.push(PathSegment::Capture { name: name.into(), param });
    }

    let captures = segments.iter().filter(|s| s.is_capture()).count();
    let path_params = params.iter().filter(|spec| spec.source == ParamSource::Path).count();
    if captures != path_params {
        return Err(BuildError::PathParamCountMismatch { route: route.to_string(), captures, params: path_params });
    }

    Ok(segments)
}

pub(crate) fn equivalence_path(segments: &[PathSegment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }

    let mut path = String::new();
    for segment in segments {
        path.push('/');
        match segment {
            PathSegment::Literal(text) => path.push_str(text),
            PathSegment::Capture { .. } => path.push_str(WILDCARD_MARKER),
        }
    }
    path
}
