use crate::error::RouteError;
use crate::regex_generator::substitute_params;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Represents the decoded route parameters accumulated over a dispatch.
///
/// Named captures overwrite an existing entry with the same name; unnamed
/// captures are appended under ascending numeric keys. Iteration yields the
/// entries in insertion order.
#[derive(Debug, Clone, Default)]
pub struct RouteParams {
    inner: Vec<(String, String)>,
    positional: usize,
}

impl RouteParams {
    pub fn new() -> RouteParams {
        RouteParams::default()
    }

    pub fn with_capacity(capacity: usize) -> RouteParams {
        RouteParams {
            inner: Vec::with_capacity(capacity),
            positional: 0,
        }
    }

    /// Sets a named parameter, replacing any previous value under the name.
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.inner.push((name, value)),
        }
    }

    /// Appends an unnamed capture under the next numeric key.
    pub fn push_positional<V: Into<String>>(&mut self, value: V) {
        let key = self.positional.to_string();
        self.positional += 1;
        self.inner.push((key, value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A type-keyed bag of shared values.
///
/// The router carries two of these into every handler: the `app` context,
/// populated once through [`RouterBuilder::data`](./struct.RouterBuilder.html#method.data),
/// and the `service` context, created fresh for each request so handlers in
/// the same dispatch can pass values to each other. Values are stored under
/// their type; one value per type.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    pub fn set<T: Send + Sync + 'static>(&self, value: T) {
        self.inner
            .lock()
            .expect("Context state lock is poisoned")
            .insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.inner
            .lock()
            .expect("Context state lock is poisoned")
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub fn has<T: Send + Sync + 'static>(&self) -> bool {
        self.inner
            .lock()
            .expect("Context state lock is poisoned")
            .contains_key(&TypeId::of::<T>())
    }

    pub fn remove<T: Send + Sync + 'static>(&self) -> bool {
        self.inner
            .lock()
            .expect("Context state lock is poisoned")
            .remove(&TypeId::of::<T>())
            .is_some()
    }

    /// Copies every entry of `other` into this context, overwriting on type
    /// collision. Used when a scoped router is merged into its parent.
    pub(crate) fn absorb(&self, other: &Context) {
        let other_entries: Vec<_> = other
            .inner
            .lock()
            .expect("Context state lock is poisoned")
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        let mut map = self.inner.lock().expect("Context state lock is poisoned");
        for (k, v) in other_entries {
            map.insert(k, v);
        }
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let len = self
            .inner
            .lock()
            .expect("Context state lock is poisoned")
            .len();
        write!(f, "Context {{ entries: {} }}", len)
    }
}

#[derive(Debug)]
struct ReplyState {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    locked: bool,
}

/// The per-request response under construction.
///
/// Every handler in a dispatch shares the same `Reply` through cheap clones
/// of a handle. The body grows by appending; once the reply is locked,
/// appends become silent no-ops. The dispatcher locks the reply after the
/// HTTP-error chain has run.
#[derive(Clone)]
pub struct Reply {
    inner: Arc<Mutex<ReplyState>>,
}

impl Reply {
    pub(crate) fn new() -> Reply {
        Reply {
            inner: Arc::new(Mutex::new(ReplyState {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Vec::new(),
                locked: false,
            })),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ReplyState> {
        self.inner.lock().expect("Reply state lock is poisoned")
    }

    pub fn status(&self) -> StatusCode {
        self.state().status
    }

    pub fn set_status(&self, status: StatusCode) {
        self.state().status = status;
    }

    /// Inserts a response header, replacing any previous value.
    pub fn header(&self, name: HeaderName, value: HeaderValue) {
        self.state().headers.insert(name, value);
    }

    pub fn header_value(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.state().headers.get(name).cloned()
    }

    /// Appends `text` to the response body. A no-op while the reply is
    /// locked.
    pub fn append(&self, text: &str) {
        let mut state = self.state();
        if state.locked {
            return;
        }
        state.body.extend_from_slice(text.as_bytes());
    }

    pub fn is_locked(&self) -> bool {
        self.state().locked
    }

    pub fn lock(&self) {
        self.state().locked = true;
    }

    pub fn unlock(&self) {
        self.state().locked = false;
    }

    pub(crate) fn clear_body(&self) {
        self.state().body.clear();
    }

    /// Replaces the reply wholesale with a handler-built response.
    pub(crate) async fn replace_with(&self, res: Response<Full<Bytes>>) {
        let (parts, body) = res.into_parts();
        let bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };
        let mut state = self.state();
        state.status = parts.status;
        state.headers = parts.headers;
        state.body = bytes.to_vec();
    }

    /// Renders the final hyper response. A HEAD request keeps the headers
    /// and status but sends no body.
    pub(crate) fn finalize(&self, head_request: bool) -> Response<Full<Bytes>> {
        let state = self.state();
        let body = if head_request {
            Bytes::new()
        } else {
            Bytes::from(state.body.clone())
        };
        let mut res = Response::new(Full::new(body));
        *res.status_mut() = state.status;
        *res.headers_mut() = state.headers.clone();
        res
    }
}

impl Debug for Reply {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state();
        write!(
            f,
            "Reply {{ status: {}, body_len: {}, locked: {} }}",
            state.status,
            state.body.len(),
            state.locked
        )
    }
}

/// The routes that have matched and run so far in the current dispatch.
/// Only routes whose pattern participates in match counting appear here.
#[derive(Debug, Clone, Default)]
pub struct MatchedRoutes {
    ids: Vec<u64>,
    paths: Vec<String>,
}

impl MatchedRoutes {
    pub(crate) fn add(&mut self, id: u64, path: &str) {
        self.ids.push(id);
        self.paths.push(path.to_string());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The normalized paths of the matched routes, in execution order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

/// Request metadata the service layer records before dispatch begins.
#[derive(Debug, Clone)]
pub(crate) struct RequestMeta {
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl RequestMeta {
    pub(crate) fn with_remote_addr(remote_addr: SocketAddr) -> RequestMeta {
        RequestMeta {
            remote_addr: Some(remote_addr),
        }
    }
}

pub(crate) struct NamedRoute {
    pub(crate) original_path: String,
    pub(crate) is_custom_regex: bool,
}

/// A cheap, clonable view of the router handed to every handler; currently
/// its single job is reverse routing.
#[derive(Clone, Default)]
pub struct RouterHandle {
    named: Arc<HashMap<String, NamedRoute>>,
}

impl RouterHandle {
    pub(crate) fn new(named: HashMap<String, NamedRoute>) -> RouterHandle {
        RouterHandle { named: Arc::new(named) }
    }

    /// Builds the path for a named route, substituting each placeholder
    /// block with its entry in `params`. Blocks without a matching entry
    /// are erased when optional and kept literally when required. Custom
    /// regex routes with no substitutions flatten to `/`.
    pub fn path_for(&self, name: &str, params: &[(&str, &str)]) -> crate::Result<String> {
        self.path_for_with(name, params, true)
    }

    /// Like [`path_for`](#method.path_for), but `flatten_regex` controls
    /// whether an untouched custom regex route yields `/` or its original
    /// pattern text.
    pub fn path_for_with(
        &self,
        name: &str,
        params: &[(&str, &str)],
        flatten_regex: bool,
    ) -> crate::Result<String> {
        let route = self
            .named
            .get(name)
            .ok_or_else(|| crate::Error::NamedRouteNotFound(name.to_string()))?;
        Ok(substitute_params(
            &route.original_path,
            params,
            route.is_custom_regex,
            flatten_regex,
        ))
    }
}

impl Debug for RouterHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RouterHandle {{ named_routes: {} }}", self.named.len())
    }
}

/// Everything a route handler receives, in the canonical argument order:
/// the request, the response under construction, the two context bags, the
/// router view, and the match bookkeeping of the dispatch so far.
///
/// `params` travels next to `request` because the request itself is shared
/// immutably between handlers; the decoded captures accumulated up to this
/// route are snapshotted here.
#[derive(Debug, Clone)]
pub struct HandlerArgs {
    pub request: Arc<Request<Bytes>>,
    pub params: RouteParams,
    pub response: Reply,
    pub service: Context,
    pub app: Context,
    pub router: RouterHandle,
    pub matched: MatchedRoutes,
    pub methods_matched: Vec<Method>,
}

/// Everything an HTTP-error handler receives: the status code being
/// surfaced, the response to write into, the router view, the match
/// bookkeeping, and the originating error when one exists.
#[derive(Debug, Clone)]
pub struct HttpErrorArgs {
    pub code: StatusCode,
    pub response: Reply,
    pub router: RouterHandle,
    pub matched: MatchedRoutes,
    pub methods_matched: Vec<Method>,
    pub error: Option<Arc<RouteError>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_params_named_overwrite_positional_append() {
        let mut params = RouteParams::new();
        params.set("id", "1");
        params.set("id", "2");
        params.push_positional("a");
        params.push_positional("b");
        assert_eq!(params.get("id"), Some("2"));
        assert_eq!(params.get("0"), Some("a"));
        assert_eq!(params.get("1"), Some("b"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn locked_reply_ignores_appends() {
        let reply = Reply::new();
        reply.append("kept");
        reply.lock();
        reply.append("dropped");
        reply.unlock();
        reply.append("-tail");
        assert_eq!(
            format!("{:?}", reply),
            "Reply { status: 200 OK, body_len: 9, locked: false }"
        );
    }

    #[test]
    fn context_set_get_remove() {
        let ctx = Context::new();
        ctx.set(42_u32);
        assert!(ctx.has::<u32>());
        assert_eq!(ctx.get::<u32>(), Some(42));
        assert!(ctx.remove::<u32>());
        assert!(!ctx.has::<u32>());
    }
}
