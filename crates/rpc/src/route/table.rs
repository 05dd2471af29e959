use crate::error::{BuildError, RpcError};
use crate::plugin::{Plugin, PluginBinding};
use crate::route::{equivalence_path, parse_path, parse_version, Route, RouteDefinition, RouteSignature};
use crate::router::{RouteMatch, Router};
use http::Method;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// The immutable set of routes of one server, plus the matcher built over them.
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    by_name: HashMap<String, usize>,
    router: Router,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::new()
    }

    /// Every route, in registration order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Looks a route up by its handler name, version suffix included.
    pub fn route(&self, name: &str) -> Option<&Arc<Route>> {
        self.by_name.get(name).map(|index| &self.routes[*index])
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Resolves a request, see [`Router::at`].
    pub fn find<'table, 'req>(
        &'table self,
        method: &Method,
        path: &'req str,
        version: u32,
    ) -> Result<RouteMatch<'table, 'req>, RpcError> {
        self.router.at(method, path, version).ok_or_else(|| RpcError::no_route(method, path, version))
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.routes.iter().map(|route| route.name())).finish()
    }
}

/// Collects route definitions and plugins, then compiles them into a [`RouteTable`].
pub struct RouteTableBuilder {
    plugins: Vec<Arc<dyn Plugin>>,
    definitions: Vec<RouteDefinition>,
}

impl RouteTableBuilder {
    fn new() -> Self {
        Self { plugins: vec![], definitions: vec![] }
    }

    /// Registers a plugin; plugins run in registration order.
    pub fn plugin(self, plugin: impl Plugin + 'static) -> Self {
        self.plugin_arc(Arc::new(plugin))
    }

    pub fn plugin_arc(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn route(mut self, definition: RouteDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn routes(mut self, definitions: impl IntoIterator<Item = RouteDefinition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    pub fn build(self) -> Result<RouteTable, BuildError> {
        let mut routes = Vec::with_capacity(self.definitions.len());
        let mut by_name = HashMap::with_capacity(self.definitions.len());
        let mut seen: HashMap<(Method, String, u32), String> = HashMap::new();

        for definition in self.definitions {
            let route = build_route(definition, &self.plugins)?;
            if by_name.contains_key(&route.name) {
                return Err(BuildError::DuplicateName { name: route.name });
            }

            let key = (route.method.clone(), route.equivalence_path.clone(), route.version);
            if let Some(first) = seen.get(&key) {
                return Err(BuildError::duplicate_route(
                    &route.method,
                    &route.equivalence_path,
                    route.version,
                    first,
                    &route.name,
                ));
            }
            seen.insert(key, route.name.clone());

            debug!(
                route = route.name(),
                method = %route.method(),
                path = route.path_template(),
                version = route.version(),
                plugins = route.plugins().len(),
                "route compiled"
            );
            by_name.insert(route.name.clone(), routes.len());
            routes.push(Arc::new(route));
        }

        let router = Router::build(&routes)?;
        info!(routes = routes.len(), plugins = self.plugins.len(), "route table built");
        Ok(RouteTable { routes, by_name, router })
    }
}

impl fmt::Debug for RouteTableBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTableBuilder")
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("definitions", &self.definitions)
            .finish()
    }
}

fn build_route(definition: RouteDefinition, plugins: &[Arc<dyn Plugin>]) -> Result<Route, BuildError> {
    let RouteDefinition { name, method, path, params, handler } = definition;
    let version = parse_version(&name)?;
    let mut signature = RouteSignature { name, method, version, path, params };

    let mut bindings = Vec::new();
    for plugin in plugins {
        let before = signature.params.len();
        if let Some(context) = plugin.bind(&mut signature)? {
            let slots = (before..signature.params.len()).collect();
            bindings.push(PluginBinding::new(Arc::clone(plugin), context, slots));
        } else if signature.params.len() != before {
            return Err(BuildError::plugin(plugin.name(), &signature.name, "declined the route but added parameters"));
        }
    }

    let RouteSignature { name, method, version, path, params } = signature;

    let mut names = HashSet::with_capacity(params.len());
    if let Some(duplicate) = params.iter().find(|spec| !names.insert(spec.name())) {
        return Err(BuildError::DuplicateParam { route: name, param: duplicate.name().to_string() });
    }

    handler.check(&params).map_err(|reason| BuildError::HandlerSignature { route: name.clone(), reason })?;

    let segments = parse_path(&name, &path, &params)?;
    let equivalence_path = equivalence_path(&segments);

    Ok(Route {
        name,
        method,
        version,
        path_template: path,
        equivalence_path,
        segments,
        params: params.into(),
        plugins: bindings,
        handler,
    })
}
