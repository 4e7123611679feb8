use crate::constants::WILDCARD;
use crate::regex_generator::literal_prefix;
use crate::route::Route;
use std::collections::{HashMap, HashSet};

/// A prefix bucket: the routes whose literal prefix is exactly this
/// bucket's key, plus links to the buckets directly below it.
#[derive(Debug, Default)]
struct Bucket {
    routes: HashSet<u64>,
    children: HashSet<String>,
}

/// Narrows the candidate set for a request path before any regex runs.
///
/// Routes are filed under their longest literal prefix; every ancestor
/// prefix down to `/` links to the bucket below it, so a lookup at any
/// ancestor reaches all descendants. Patterns with no usable literal
/// prefix (custom regexes, negated patterns, the wildcard sentinel) live
/// in a separate catch-all bucket that is always a candidate.
///
/// The index is append-only; it narrows the candidate set but never
/// decides matches, and never defines execution order.
#[derive(Debug, Default)]
pub(crate) struct RouteIndex {
    buckets: HashMap<String, Bucket>,
    catch_all: HashSet<u64>,
}

impl RouteIndex {
    pub(crate) fn add<E>(&mut self, route: &Route<E>) {
        let storage = if route.original_path == WILDCARD || route.original_path.is_empty() {
            WILDCARD.to_string()
        } else if route.path.starts_with('/') {
            route.path.clone()
        } else {
            format!("/{}", route.path)
        };

        let prefix = literal_prefix(&storage).to_string();

        // Negated patterns must stay candidates for every path: their
        // literal prefix names the paths they do NOT match.
        if prefix.is_empty() || route.is_custom_regex || route.is_negated {
            self.catch_all.insert(route.id);
            return;
        }

        self.buckets
            .entry(prefix.clone())
            .or_default()
            .routes
            .insert(route.id);

        // Link each ancestor to the bucket below it, stopping at the first
        // link that already exists: everything above it was wired up by an
        // earlier insertion.
        let mut child = prefix;
        while let Some(parent) = parent_prefix(&child) {
            let newly_linked = self
                .buckets
                .entry(parent.clone())
                .or_default()
                .children
                .insert(child.clone());
            if !newly_linked {
                break;
            }
            child = parent;
        }
    }

    /// The ids of all routes reachable from the longest non-empty prefix
    /// bucket of `uri`. Empty when no prefix bucket holds anything.
    pub(crate) fn find_possible_routes(&self, uri: &str) -> HashSet<u64> {
        let mut prefix = if uri.starts_with('/') {
            uri.to_string()
        } else {
            format!("/{}", uri)
        };

        loop {
            if let Some(bucket) = self.buckets.get(&prefix) {
                let mut found = HashSet::new();
                self.collect(bucket, &mut found);
                if !found.is_empty() {
                    return found;
                }
            }
            match parent_prefix(&prefix) {
                Some(parent) => prefix = parent,
                None => return HashSet::new(),
            }
        }
    }

    pub(crate) fn catch_all(&self) -> &HashSet<u64> {
        &self.catch_all
    }

    fn collect(&self, bucket: &Bucket, out: &mut HashSet<u64>) {
        out.extend(bucket.routes.iter().copied());
        for child in &bucket.children {
            if let Some(bucket) = self.buckets.get(child) {
                self.collect(bucket, out);
            }
        }
    }
}

/// Drops the trailing `/`-delimited segment of a prefix; the root `/` has
/// no parent. A trailing slash counts as an (empty) segment of its own.
fn parent_prefix(prefix: &str) -> Option<String> {
    if prefix == "/" {
        return None;
    }
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.len() < prefix.len() {
        return Some(if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        });
    }
    match trimmed.rfind('/') {
        Some(0) | None => Some("/".to_string()),
        Some(i) => Some(trimmed[..i].to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::tests::test_route;
    use hyper::Method;

    #[test]
    fn parent_chain_walks_segmentwise_to_root() {
        assert_eq!(parent_prefix("/a/b/c").as_deref(), Some("/a/b"));
        assert_eq!(parent_prefix("/a/b").as_deref(), Some("/a"));
        assert_eq!(parent_prefix("/a").as_deref(), Some("/"));
        assert_eq!(parent_prefix("/users/").as_deref(), Some("/users"));
        assert_eq!(parent_prefix("/"), None);
    }

    #[test]
    fn ancestor_buckets_reach_descendant_routes() {
        let mut index = RouteIndex::default();
        let route = test_route("", "/users/[i:id]", Some(vec![Method::GET]));
        index.add(&route);

        // The route is filed under "/users/" but reachable from both the
        // bare prefix and the root.
        assert!(index.find_possible_routes("/users/42").contains(&route.id));
        assert!(index.find_possible_routes("/users").contains(&route.id));
        assert!(index.find_possible_routes("/").contains(&route.id));
    }

    #[test]
    fn custom_regex_and_negated_routes_go_to_the_catch_all() {
        let mut index = RouteIndex::default();
        let custom = test_route("", "@\\.(json|csv)$", None);
        let negated = test_route("", "!/foo", None);
        let wildcard = test_route("", "*", None);
        index.add(&custom);
        index.add(&negated);
        index.add(&wildcard);

        assert!(index.catch_all().contains(&custom.id));
        assert!(index.catch_all().contains(&negated.id));
        assert!(index.catch_all().contains(&wildcard.id));
        assert!(index.find_possible_routes("/export/data.json").is_empty());
    }

    #[test]
    fn routes_sharing_a_prefix_coexist_in_one_bucket() {
        let mut index = RouteIndex::default();
        let first = test_route("", "/users/[i:id]", Some(vec![Method::GET]));
        let second = test_route("", "/users/[a:slug]", Some(vec![Method::GET]));
        index.add(&first);
        index.add(&second);

        let found = index.find_possible_routes("/users/42");
        assert!(found.contains(&first.id));
        assert!(found.contains(&second.id));
    }

    #[test]
    fn longest_prefix_bucket_wins() {
        let mut index = RouteIndex::default();
        let shallow = test_route("", "/users", Some(vec![Method::GET]));
        let deep = test_route("", "/users/settings/privacy", Some(vec![Method::GET]));
        index.add(&shallow);
        index.add(&deep);

        // The deepest prefix with content is selected; the shallow route
        // does not widen the candidate set.
        let found = index.find_possible_routes("/users/settings/privacy");
        assert!(found.contains(&deep.id));
        assert!(!found.contains(&shallow.id));
    }

    #[test]
    fn radix_selectivity_over_many_static_routes() {
        let mut index = RouteIndex::default();
        let mut routes = Vec::new();
        for a in 0..15 {
            for b in 0..10 {
                for c in 0..10 {
                    let path = format!("/seg{}/part{}/leaf{}", a, b, c);
                    let route = test_route("", &path, Some(vec![Method::GET]));
                    routes.push((path, route));
                }
            }
        }
        for (_, route) in &routes {
            index.add(route);
        }
        assert_eq!(routes.len(), 1500);

        for (path, route) in &routes {
            let found = index.find_possible_routes(path);
            assert!(found.contains(&route.id), "missing candidate for {}", path);
            // A full literal path is its own longest prefix, so the bucket
            // holds exactly the routes registered at that path.
            assert_eq!(found.len(), 1);
        }

        // A partial path collects exactly the subtree below it.
        let subtree = index.find_possible_routes("/seg3/part4");
        assert_eq!(subtree.len(), 10);
    }
}
