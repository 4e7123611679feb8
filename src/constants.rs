use hyper::Method;

/// The nine canonical HTTP methods a route may be constrained to.
/// Anything outside this list is rejected at registration.
pub(crate) const CANONICAL_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::TRACE,
    Method::CONNECT,
];

/// Characters that end the literal prefix of a route pattern. Everything
/// before the first occurrence of one of these is safe to treat as plain
/// text when indexing and pre-filtering.
pub(crate) const META_STARTERS: [char; 7] = ['[', '(', '.', '?', '+', '*', '{'];

/// The pattern that matches any request path.
pub(crate) const WILDCARD: &str = "*";
