use crate::route::Route;
use std::collections::HashMap;

/// The ordered registry of all routes of a router.
///
/// Iteration order is registration order, always; that order is what the
/// dispatcher trusts. Named lookup becomes available after the one-shot
/// [`prepare_named`](#method.prepare_named) pass, and any later mutation
/// drops the prepared state until the pass runs again.
pub(crate) struct RouteCollection<E> {
    routes: Vec<Route<E>>,
    named: HashMap<String, usize>,
    prepared: bool,
}

impl<E> RouteCollection<E> {
    pub(crate) fn new() -> RouteCollection<E> {
        RouteCollection {
            routes: Vec::new(),
            named: HashMap::new(),
            prepared: false,
        }
    }

    pub(crate) fn add(&mut self, route: Route<E>) {
        self.routes.push(route);
        self.prepared = false;
    }

    /// Re-keys every route that carries a name. A name registered twice
    /// resolves to the later route.
    pub(crate) fn prepare_named(&mut self) {
        self.named = self
            .routes
            .iter()
            .enumerate()
            .filter_map(|(position, route)| route.name.clone().map(|name| (name, position)))
            .collect();
        self.prepared = true;
    }

    #[allow(dead_code)]
    pub(crate) fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub(crate) fn get_named(&self, name: &str) -> Option<&Route<E>> {
        self.named.get(name).map(|position| &self.routes[*position])
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Route<E>> {
        self.routes.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Outcome;
    use crate::route::{Handler, Route};
    use hyper::Method;
    use std::convert::Infallible;

    fn named_route(path: &str, name: Option<&str>) -> Route<Infallible> {
        let handler: Handler<Infallible> =
            Box::new(move |_| Box::new(async move { Ok(Outcome::Next) }));
        Route::new_with_boxed_handler(
            "",
            path,
            Some(vec![Method::GET]),
            handler,
            name.map(|n| n.to_string()),
        )
        .unwrap()
    }

    #[test]
    fn iteration_keeps_registration_order() {
        let mut collection = RouteCollection::new();
        collection.add(named_route("/b", None));
        collection.add(named_route("/a", None));
        collection.add(named_route("/c", None));
        let order: Vec<_> = collection.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(order, vec!["/b", "/a", "/c"]);
    }

    #[test]
    fn prepare_named_enables_lookup_and_mutation_invalidates_it() {
        let mut collection = RouteCollection::new();
        collection.add(named_route("/users", Some("user-list")));
        assert!(!collection.is_prepared());

        collection.prepare_named();
        assert!(collection.is_prepared());
        assert_eq!(
            collection.get_named("user-list").map(|r| r.path.as_str()),
            Some("/users")
        );
        assert!(collection.get_named("missing").is_none());

        collection.add(named_route("/extra", None));
        assert!(!collection.is_prepared());
    }

    #[test]
    fn later_route_wins_a_name_collision() {
        let mut collection = RouteCollection::new();
        collection.add(named_route("/first", Some("dup")));
        collection.add(named_route("/second", Some("dup")));
        collection.prepare_named();
        assert_eq!(
            collection.get_named("dup").map(|r| r.path.as_str()),
            Some("/second")
        );
    }
}
