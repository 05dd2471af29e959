use super::{segment_hash, Capture};
use crate::error::BuildError;
use crate::route::{PathSegment, Route};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct LiteralEndpoint {
    hash: u64,
    text: Box<str>,
    route: Arc<Route>,
}

/// One depth level of the trie.
///
/// Endpoint lists are sorted newest version first, so the first eligible entry is the answer.
#[derive(Debug, Default)]
pub(super) struct Node {
    literal_endpoints: Vec<LiteralEndpoint>,
    wildcard_endpoints: Vec<Arc<Route>>,
    literal_children: HashMap<u64, (Box<str>, Node)>,
    wildcard_child: Option<Box<Node>>,
}

impl Node {
    /// Builds the node for `depth` from routes that all have more than `depth` segments.
    pub(super) fn build(routes: Vec<Arc<Route>>, depth: usize) -> Result<Self, BuildError> {
        let mut node = Node::default();
        let mut literal_groups: HashMap<u64, (Box<str>, Vec<Arc<Route>>)> = HashMap::new();
        let mut wildcard_group = Vec::new();

        for route in routes {
            let is_last = route.segments().len() == depth + 1;
            match (&route.segments()[depth], is_last) {
                (PathSegment::Literal(text), true) => {
                    let endpoint = LiteralEndpoint { hash: segment_hash(text), text: text.clone(), route };
                    node.literal_endpoints.push(endpoint);
                }
                (PathSegment::Capture { .. }, true) => node.wildcard_endpoints.push(route),
                (PathSegment::Literal(text), false) => {
                    let (existing, group) =
                        literal_groups.entry(segment_hash(text)).or_insert_with(|| (text.clone(), vec![]));
                    if existing != text {
                        return Err(BuildError::invalid_path(
                            route.name(),
                            route.path_template(),
                            format!("segment '{text}' collides with '{existing}'"),
                        ));
                    }
                    group.push(route);
                }
                (PathSegment::Capture { .. }, false) => wildcard_group.push(route),
            }
        }

        node.literal_endpoints.sort_by_key(|e| Reverse(e.route.version()));
        node.wildcard_endpoints.sort_by_key(|r| Reverse(r.version()));

        for (hash, (text, group)) in literal_groups {
            node.literal_children.insert(hash, (text, Node::build(group, depth + 1)?));
        }
        if !wildcard_group.is_empty() {
            node.wildcard_child = Some(Box::new(Node::build(wildcard_group, depth + 1)?));
        }

        Ok(node)
    }

    /// `path` starts at the segment for this depth, without leading separators.
    pub(super) fn find<'node, 'req>(
        &'node self,
        path: &'req str,
        depth: usize,
        version: u32,
        captures: &mut Vec<Capture<'req>>,
    ) -> Option<&'node Arc<Route>> {
        let end = path.find(['/', '?']).unwrap_or(path.len());
        let segment = &path[..end];
        let rest = match path[end..].strip_prefix('/') {
            Some(rest) => rest.trim_start_matches('/'),
            None => "",
        };
        let hash = segment_hash(segment);

        if rest.is_empty() || rest.starts_with('?') {
            let literal = self
                .literal_endpoints
                .iter()
                .find(|e| e.hash == hash && &*e.text == segment && e.route.version() <= version);
            if let Some(endpoint) = literal {
                return Some(&endpoint.route);
            }

            let wildcard = self.wildcard_endpoints.iter().find(|r| r.version() <= version)?;
            captures.push(Capture { depth, text: segment });
            return Some(wildcard);
        }

        if let Some((text, child)) = self.literal_children.get(&hash)
            && &**text == segment
            && let Some(route) = child.find(rest, depth + 1, version, captures)
        {
            return Some(route);
        }

        let child = self.wildcard_child.as_ref()?;
        let mark = captures.len();
        captures.push(Capture { depth, text: segment });
        let route = child.find(rest, depth + 1, version, captures);
        if route.is_none() {
            captures.truncate(mark);
        }
        route
    }
}
