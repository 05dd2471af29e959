//! Segment matcher: the dispatch trie.
//!
//! Routes are grouped by method, then arranged in a tree keyed by path segment. Each node
//! holds the routes that end at its depth (literal and wildcard endpoints, newest version
//! first) and the subtrees of routes that continue past it.
//!
//! Matching walks the request path one segment at a time:
//! - a literal endpoint beats a wildcard endpoint at the same level
//! - a literal child is tried before the wildcard child; a failed branch is abandoned
//! - the newest route whose version does not exceed the requested one wins, and
//!   unversioned routes (version 0) are always eligible
//!
//! The cost of a match depends on the path depth and the branching at each level, never on
//! the total number of routes. The tree is immutable once built.

mod node;

use crate::error::BuildError;
use crate::route::Route;
use http::Method;
use node::Node;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// FNV-1a hash of a path segment or parameter name.
#[inline]
pub fn segment_hash(segment: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    segment.bytes().fold(OFFSET_BASIS, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

/// Path text captured by a wildcard segment, tagged with the depth it was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture<'req> {
    pub depth: usize,
    pub text: &'req str,
}

/// A matched route plus the path text its wildcards captured, in traversal order.
#[derive(Debug)]
pub struct RouteMatch<'router, 'req> {
    route: &'router Arc<Route>,
    captures: Vec<Capture<'req>>,
}

impl<'router, 'req> RouteMatch<'router, 'req> {
    pub fn route(&self) -> &'router Arc<Route> {
        self.route
    }

    pub fn captures(&self) -> &[Capture<'req>] {
        &self.captures
    }

    pub fn into_parts(self) -> (&'router Arc<Route>, Vec<Capture<'req>>) {
        (self.route, self.captures)
    }
}

#[derive(Debug, Default)]
pub struct Router {
    trees: HashMap<Method, MethodTree>,
}

#[derive(Debug, Default)]
struct MethodTree {
    /// routes registered on `/`, newest first
    root: Vec<Arc<Route>>,
    node: Node,
}

impl Router {
    pub fn build(routes: &[Arc<Route>]) -> Result<Self, BuildError> {
        let mut by_method: HashMap<Method, Vec<Arc<Route>>> = HashMap::new();
        for route in routes {
            by_method.entry(route.method().clone()).or_default().push(Arc::clone(route));
        }

        let mut trees = HashMap::with_capacity(by_method.len());
        for (method, routes) in by_method {
            let (mut root, nested): (Vec<_>, Vec<_>) = routes.into_iter().partition(|r| r.segments().is_empty());
            root.sort_by_key(|r| std::cmp::Reverse(r.version()));
            let node = Node::build(nested, 0)?;
            trees.insert(method, MethodTree { root, node });
        }

        Ok(Self { trees })
    }

    /// Resolves `(method, path, version)` to a route.
    ///
    /// `path` may carry a query string; matching stops at the first `?`.
    pub fn at<'router, 'req>(
        &'router self,
        method: &Method,
        path: &'req str,
        version: u32,
    ) -> Option<RouteMatch<'router, 'req>> {
        let tree = self.trees.get(method)?;
        let path = path.trim_start_matches('/');

        let mut captures = Vec::new();
        let route = if path.is_empty() || path.starts_with('?') {
            tree.root.iter().find(|r| r.version() <= version)
        } else {
            tree.node.find(path, 0, version, &mut captures)
        };

        trace!(%method, path, version, matched = route.map(|r| r.name()), "route lookup");
        route.map(|route| RouteMatch { route, captures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{get, post, ParamSpec, RouteDefinition, RouteTable};
    use crate::value::ParamType;
    use crate::{Args, Task};
    use serde_json::Value;

    fn noop(_args: Args) -> Task<Value> {
        Task::finished(Value::Null)
    }

    fn table(definitions: Vec<RouteDefinition>) -> RouteTable {
        definitions.into_iter().fold(RouteTable::builder(), |b, d| b.route(d)).build().unwrap()
    }

    fn matched(table: &RouteTable, method: Method, path: &str, version: u32) -> Option<(String, Vec<String>)> {
        table.router().at(&method, path, version).map(|m| {
            let captures = m.captures().iter().map(|c| c.text.to_string()).collect();
            (m.route().name().to_string(), captures)
        })
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(segment_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(segment_hash("users"), segment_hash("users"));
        assert_ne!(segment_hash("users"), segment_hash("user"));
    }

    #[test]
    fn literal_beats_wildcard() {
        let table = table(vec![
            get("by_id", "/users/:id", noop).param(ParamSpec::path("id", ParamType::Int)),
            get("list", "/users/list", noop),
        ]);

        assert_eq!(matched(&table, Method::GET, "/users/list", 0), Some(("list".into(), vec![])));
        assert_eq!(matched(&table, Method::GET, "/users/42", 0), Some(("by_id".into(), vec!["42".into()])));
    }

    #[test]
    fn version_resolution() {
        let table = table(vec![get("item", "/item", noop), get("item_2023_01_01", "/item", noop)]);

        assert_eq!(matched(&table, Method::GET, "/item", 20_220_101).unwrap().0, "item");
        assert_eq!(matched(&table, Method::GET, "/item", 20_240_101).unwrap().0, "item_2023_01_01");
        assert_eq!(matched(&table, Method::GET, "/item", 20_230_101).unwrap().0, "item_2023_01_01");
        assert_eq!(matched(&table, Method::GET, "/item", 0).unwrap().0, "item");
    }

    #[test]
    fn version_resolution_on_wildcards() {
        let table = table(vec![
            get("get_2021_06_01", "/things/:id", noop).param(ParamSpec::path("id", ParamType::String)),
            get("get_2023_01_01", "/things/:id", noop).param(ParamSpec::path("id", ParamType::String)),
        ]);

        assert_eq!(matched(&table, Method::GET, "/things/a", 20_220_101).unwrap().0, "get_2021_06_01");
        assert_eq!(matched(&table, Method::GET, "/things/a", 20_990_101).unwrap().0, "get_2023_01_01");
        assert_eq!(matched(&table, Method::GET, "/things/a", 20_200_101), None);
    }

    #[test]
    fn methods_are_separate() {
        let table = table(vec![get("read", "/doc", noop), post("write", "/doc", noop)]);

        assert_eq!(matched(&table, Method::GET, "/doc", 0).unwrap().0, "read");
        assert_eq!(matched(&table, Method::POST, "/doc", 0).unwrap().0, "write");
        assert_eq!(matched(&table, Method::DELETE, "/doc", 0), None);
    }

    #[test]
    fn backtracks_from_literal_branch_into_wildcard_branch() {
        let table = table(vec![
            get("settings", "/users/me/settings", noop),
            get("posts", "/users/:id/posts", noop).param(ParamSpec::path("id", ParamType::String)),
        ]);

        assert_eq!(matched(&table, Method::GET, "/users/me/posts", 0), Some(("posts".into(), vec!["me".into()])));
        assert_eq!(matched(&table, Method::GET, "/users/me/settings", 0), Some(("settings".into(), vec![])));
    }

    #[test]
    fn captures_are_tagged_with_depth() {
        let table = table(vec![
            get("comment", "/a/:x/b/:y", noop)
                .param(ParamSpec::path("y", ParamType::Int))
                .param(ParamSpec::path("x", ParamType::Int)),
        ]);

        let m = table.router().at(&Method::GET, "/a/1/b/2", 0).unwrap();
        assert_eq!(m.captures(), &[Capture { depth: 1, text: "1" }, Capture { depth: 3, text: "2" }]);
    }

    #[test]
    fn root_query_and_trailing_separators() {
        let table = table(vec![get("root", "/", noop), get("list", "/users/list", noop)]);

        assert_eq!(matched(&table, Method::GET, "/", 0).unwrap().0, "root");
        assert_eq!(matched(&table, Method::GET, "/?a=b", 0).unwrap().0, "root");
        assert_eq!(matched(&table, Method::GET, "//users/list/", 0).unwrap().0, "list");
        assert_eq!(matched(&table, Method::GET, "/users/list?limit=3", 0).unwrap().0, "list");
        assert_eq!(matched(&table, Method::GET, "/users/list/?limit=3", 0).unwrap().0, "list");
    }

    #[test]
    fn no_match() {
        let table = table(vec![get("list", "/users/list", noop)]);

        assert_eq!(matched(&table, Method::GET, "/users", 0), None);
        assert_eq!(matched(&table, Method::GET, "/users/list/extra", 0), None);
        assert_eq!(matched(&table, Method::GET, "/", 0), None);
    }

    #[test]
    fn every_route_matches_its_own_path() {
        let table = table(vec![
            get("a", "/a", noop),
            get("a_2022_03_04", "/a", noop),
            get("ab", "/a/:b", noop).param(ParamSpec::path("b", ParamType::String)),
            get("abc", "/a/:b/c", noop).param(ParamSpec::path("b", ParamType::String)),
            get("abd", "/a/b/d", noop),
            post("x", "/x/:y/:z", noop)
                .param(ParamSpec::path("y", ParamType::String))
                .param(ParamSpec::path("z", ParamType::String)),
        ]);

        for route in table.routes() {
            let concrete: String = route
                .segments()
                .iter()
                .map(|s| match s {
                    crate::route::PathSegment::Literal(text) => format!("/{text}"),
                    crate::route::PathSegment::Capture { name, .. } => format!("/{name}-value"),
                })
                .collect();
            let m = table.router().at(route.method(), &concrete, route.version()).unwrap();
            assert_eq!(m.route().name(), route.name(), "path {concrete}");

            let expected: Vec<String> = route
                .segments()
                .iter()
                .filter_map(|s| match s {
                    crate::route::PathSegment::Capture { name, .. } => Some(format!("{name}-value")),
                    crate::route::PathSegment::Literal(_) => None,
                })
                .collect();
            let captured: Vec<String> = m.captures().iter().map(|c| c.text.to_string()).collect();
            assert_eq!(captured, expected);
        }
    }
}
