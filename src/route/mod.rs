use crate::constants::WILDCARD;
use crate::error::{Error, RouteError};
use crate::flow::Outcome;
use crate::helpers;
use crate::regex_generator::{compile_route, literal_prefix, CompiledPattern};
use crate::types::HandlerArgs;
use hyper::Method;
use regex::Regex;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) type Handler<E> = Box<dyn Fn(HandlerArgs) -> HandlerReturn<E> + Send + Sync + 'static>;
pub(crate) type HandlerReturn<E> = Box<dyn Future<Output = Result<Outcome, E>> + Send + 'static>;

/// The raw (still percent-encoded) captures of a single path match, in
/// group order. `None` names are unnamed groups destined for positional
/// keys.
pub(crate) type RawCaptures = Vec<(Option<String>, String)>;

static NEXT_ROUTE_ID: AtomicU64 = AtomicU64::new(1);

/// Represents a single route.
///
/// A route bundles a compiled path pattern, an optional method constraint
/// and a handler. It shouldn't be created directly; use the
/// [RouterBuilder](./struct.RouterBuilder.html) methods to register one.
///
/// Routes are immutable once built. The `E` type parameter is the error
/// type shared by all handlers of a router and must convert into a boxed
/// error, exactly as it does for the whole [Router](./struct.Router.html).
pub struct Route<E> {
    /// Unique within the process; the index keys buckets by it.
    pub(crate) id: u64,
    /// The pattern exactly as the user wrote it.
    pub(crate) original_path: String,
    /// Namespace-prefixed pattern with the `!`/`@` markers stripped.
    pub(crate) path: String,
    /// `None` means the route matches every method.
    pub(crate) methods: Option<Vec<Method>>,
    pub(crate) is_custom_regex: bool,
    pub(crate) is_negated: bool,
    #[allow(dead_code)]
    pub(crate) is_negated_custom_regex: bool,
    pub(crate) is_dynamic: bool,
    /// Whether a match by this route counts as "a route was matched" when
    /// deciding on a 404. False for the wildcard sentinel and the empty
    /// pattern.
    pub(crate) count_match: bool,
    pub(crate) compiled: CompiledPattern,
    pub(crate) name: Option<String>,
    pub(crate) handler: Handler<E>,
}

impl<E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static> Route<E> {
    pub(crate) fn new_with_boxed_handler<P: Into<String>>(
        namespace: &str,
        path: P,
        methods: Option<Vec<Method>>,
        handler: Handler<E>,
        name: Option<String>,
    ) -> crate::Result<Route<E>> {
        let original_path = path.into();

        if let Some(ref methods) = methods {
            for method in methods {
                if !helpers::is_canonical_method(method) {
                    return Err(Error::InvalidArgument(format!(
                        "{} is not a canonical HTTP method",
                        method
                    ))
                    .into());
                }
            }
        }

        let compiled = compile_route(namespace, &original_path)?;
        let count_match = !(original_path == WILDCARD || original_path.is_empty());

        Ok(Route {
            id: NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed),
            original_path,
            path: compiled.path,
            methods,
            is_custom_regex: compiled.is_custom_regex,
            is_negated: compiled.is_negated,
            is_negated_custom_regex: compiled.is_negated_custom_regex,
            is_dynamic: compiled.is_dynamic,
            count_match,
            compiled: compiled.pattern,
            name,
            handler,
        })
    }

    /// Whether `method` passes this route's method constraint. A `HEAD`
    /// request is served by `GET` routes as well.
    pub(crate) fn is_match_method(&self, method: &Method) -> bool {
        match &self.methods {
            None => true,
            Some(methods) => methods
                .iter()
                .any(|m| m == method || (*method == Method::HEAD && *m == Method::GET)),
        }
    }

    /// Tests the route against a request path, negation already applied.
    /// `Some` carries the raw captures; a negated route that effectively
    /// matches captures nothing.
    pub(crate) fn match_path(&self, uri: &str) -> Option<RawCaptures> {
        let raw = self.raw_match(uri);
        // A `!` on a plain pattern or a bare custom regex inverts the raw
        // outcome; the namespaced negated form is already baked into the
        // compiled artifact.
        let invert =
            self.is_negated && !matches!(self.compiled, CompiledPattern::NegatedCustom { .. });
        if invert {
            match raw {
                Some(_) => None,
                None => Some(Vec::new()),
            }
        } else {
            raw
        }
    }

    fn raw_match(&self, uri: &str) -> Option<RawCaptures> {
        if let CompiledPattern::Wildcard = self.compiled {
            return Some(Vec::new());
        }

        if !self.is_dynamic && !self.is_custom_regex {
            let lhs = uri.strip_prefix('/').unwrap_or(uri);
            let rhs = self.path.strip_prefix('/').unwrap_or(&self.path);
            if lhs == rhs {
                return Some(Vec::new());
            }
        }

        if !self.is_custom_regex {
            // Cheap reject before touching the regex: the URI must start
            // with the pattern's literal prefix.
            let prefix = literal_prefix(&self.path).trim_matches('/');
            if !prefix.is_empty() && !uri.trim_start_matches('/').starts_with(prefix) {
                return None;
            }
        }

        match &self.compiled {
            CompiledPattern::Regex(re) => capture_all(re, uri),
            CompiledPattern::NegatedCustom { base, full } => {
                if base.is_match(uri) && !full.is_match(uri) {
                    Some(Vec::new())
                } else {
                    None
                }
            }
            CompiledPattern::Wildcard => Some(Vec::new()),
        }
    }

    pub(crate) async fn process(&self, args: HandlerArgs) -> Result<Outcome, RouteError> {
        Pin::from((self.handler)(args)).await.map_err(Into::into)
    }
}

fn capture_all(re: &Regex, uri: &str) -> Option<RawCaptures> {
    let caps = re.captures(uri)?;
    let mut out = Vec::new();
    for (i, name) in re.capture_names().enumerate().skip(1) {
        match name {
            Some(n) => {
                if let Some(m) = caps.name(n) {
                    out.push((Some(n.to_string()), m.as_str().to_string()));
                }
            }
            None => {
                if let Some(m) = caps.get(i) {
                    out.push((None, m.as_str().to_string()));
                }
            }
        }
    }
    Some(out)
}

impl<E> Debug for Route<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ path: {:?}, original_path: {:?}, methods: {:?}, name: {:?} }}",
            self.path, self.original_path, self.methods, self.name
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::convert::Infallible;

    pub(crate) fn test_route(
        namespace: &str,
        path: &str,
        methods: Option<Vec<Method>>,
    ) -> Route<Infallible> {
        let handler: Handler<Infallible> =
            Box::new(move |_| Box::new(async move { Ok(Outcome::Next) }));
        Route::new_with_boxed_handler(namespace, path, methods, handler, None).unwrap()
    }

    fn captured<'a>(caps: &'a RawCaptures, name: &str) -> Option<&'a str> {
        caps.iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn head_is_served_by_get_routes() {
        let route = test_route("", "/", Some(vec![Method::GET]));
        assert!(route.is_match_method(&Method::GET));
        assert!(route.is_match_method(&Method::HEAD));
        assert!(!route.is_match_method(&Method::POST));
    }

    #[test]
    fn unconstrained_route_accepts_every_method() {
        let route = test_route("", "/", None);
        assert!(route.is_match_method(&Method::DELETE));
        assert!(route.is_match_method(&Method::TRACE));
    }

    #[test]
    fn non_canonical_method_is_rejected() {
        let handler: Handler<Infallible> =
            Box::new(move |_| Box::new(async move { Ok(Outcome::Next) }));
        let err = Route::new_with_boxed_handler(
            "",
            "/",
            Some(vec![Method::from_bytes(b"BREW").unwrap()]),
            handler,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("canonical"));
    }

    #[test]
    fn typed_placeholder_captures_by_name() {
        let route = test_route("", "/[i:age]", Some(vec![Method::GET]));
        let caps = route.match_path("/987").unwrap();
        assert_eq!(captured(&caps, "age"), Some("987"));
        assert!(route.match_path("/blue").is_none());
    }

    #[test]
    fn literal_route_matches_by_equality() {
        let route = test_route("", "/users/profile", Some(vec![Method::GET]));
        assert!(route.match_path("/users/profile").is_some());
        assert!(route.match_path("/users/profiles").is_none());
        assert!(!route.is_dynamic);
    }

    #[test]
    fn optional_trailing_block_accepts_bare_path() {
        let route = test_route("", "/users/[i:id]?", Some(vec![Method::GET]));
        assert!(route.match_path("/users").is_some());
        let caps = route.match_path("/users/42").unwrap();
        assert_eq!(captured(&caps, "id"), Some("42"));
    }

    #[test]
    fn lazy_and_following_placeholder_split() {
        let route = test_route("", "/posts/[*:title][i:id]", Some(vec![Method::GET]));
        let caps = route.match_path("/posts/some-title-42").unwrap();
        assert_eq!(captured(&caps, "title"), Some("some-title-"));
        assert_eq!(captured(&caps, "id"), Some("42"));
    }

    #[test]
    fn greedy_wildcard_swallows_separators() {
        let route = test_route("", "/sub-dir/[**:rest]", Some(vec![Method::GET]));
        let caps = route.match_path("/sub-dir/a/b/c").unwrap();
        assert_eq!(captured(&caps, "rest"), Some("a/b/c"));
    }

    #[test]
    fn negated_plain_route_inverts_the_match() {
        let route = test_route("", "!/foo", None);
        assert!(route.match_path("/foo").is_none());
        assert!(route.match_path("/bar").is_some());
    }

    #[test]
    fn negated_custom_regex_without_namespace_inverts_the_match() {
        let route = test_route("", "!@^/admin/", None);
        assert!(route.match_path("/admin/panel").is_none());
        assert!(route.match_path("/public").is_some());
    }

    #[test]
    fn mixed_literals_and_optional_format_blocks() {
        let route = test_route("", "/[a:site].[:format]?/[:id].[:format2]?", None);
        let caps = route.match_path("/blog.json/42.csv").unwrap();
        assert_eq!(captured(&caps, "site"), Some("blog"));
        assert_eq!(captured(&caps, "format"), Some("json"));
        assert_eq!(captured(&caps, "id"), Some("42"));
        assert_eq!(captured(&caps, "format2"), Some("csv"));
        let caps = route.match_path("/blog/42").unwrap();
        assert_eq!(captured(&caps, "site"), Some("blog"));
        assert_eq!(captured(&caps, "id"), Some("42"));
    }

    #[test]
    fn unnamed_groups_capture_positionally() {
        let route = test_route("", "/[i]/[a]", None);
        let caps = route.match_path("/12/ab").unwrap();
        assert_eq!(caps.len(), 2);
        assert_eq!(caps[0], (None, "12".to_string()));
        assert_eq!(caps[1], (None, "ab".to_string()));
    }

    #[test]
    fn wildcard_sentinel_matches_without_counting() {
        let route = test_route("", "*", None);
        assert!(route.match_path("/anything/at/all").is_some());
        assert!(!route.count_match);
        let route = test_route("", "", None);
        assert!(route.match_path("/").is_some());
        assert!(!route.count_match);
    }
}
