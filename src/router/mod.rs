use crate::error::{Error, RouteError};
use crate::flow::Outcome;
use crate::helpers;
use crate::index::RouteIndex;
use crate::router::collection::RouteCollection;
use crate::types::{
    Context, HandlerArgs, HttpErrorArgs, MatchedRoutes, Reply, RouteParams, RouterHandle,
};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use self::builder::RouterBuilder;

mod builder;
pub(crate) mod collection;

pub(crate) type HttpErrorHandler<E> =
    Box<dyn Fn(HttpErrorArgs) -> HttpErrorHandlerReturn<E> + Send + Sync + 'static>;
pub(crate) type HttpErrorHandlerReturn<E> =
    Box<dyn Future<Output = Result<(), E>> + Send + 'static>;

pub(crate) type ErrorHandler =
    Box<dyn Fn(Reply, Arc<RouteError>) -> ErrorHandlerReturn + Send + Sync + 'static>;
pub(crate) type ErrorHandlerReturn = Box<dyn Future<Output = bool> + Send + 'static>;

pub(crate) type AfterDispatchHandler<E> =
    Box<dyn Fn(Reply) -> AfterDispatchReturn<E> + Send + Sync + 'static>;
pub(crate) type AfterDispatchReturn<E> = Box<dyn Future<Output = Result<(), E>> + Send + 'static>;

/// How the dispatch loop ended, when it ended early.
enum LoopExit {
    Completed,
    Http(StatusCode, Option<Arc<RouteError>>),
    Unknown(RouteError),
}

/// The router: an ordered set of compiled routes, a prefix index over
/// them, and the dispatch loop that runs handlers against a request.
///
/// A router is built once through [`RouterBuilder`](./struct.RouterBuilder.html)
/// and never mutated afterwards, so it can be shared freely between
/// connection tasks. Each call to [`dispatch`](#method.dispatch) owns its
/// per-request state; within one request, handlers run strictly one after
/// another in registration order.
///
/// The `E` type parameter is the error type route handlers fail with; it
/// must convert into a boxed error.
pub struct Router<E> {
    pub(crate) collection: RouteCollection<E>,
    pub(crate) index: RouteIndex,
    pub(crate) app: Context,
    pub(crate) handle: RouterHandle,
    pub(crate) http_error_handlers: Vec<HttpErrorHandler<E>>,
    pub(crate) error_handlers: Vec<ErrorHandler>,
    pub(crate) after_dispatch: Vec<AfterDispatchHandler<E>>,
}

impl<E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static> Router<E> {
    /// Return a [RouterBuilder](./struct.RouterBuilder.html) instance to
    /// build a `Router`.
    pub fn builder() -> RouterBuilder<E> {
        RouterBuilder::new()
    }

    /// A clonable view of this router for reverse routing.
    pub fn handle(&self) -> RouterHandle {
        self.handle.clone()
    }

    /// Builds the path for a named route. See
    /// [`RouterHandle::path_for`](./struct.RouterHandle.html#method.path_for).
    pub fn path_for(&self, name: &str, params: &[(&str, &str)]) -> crate::Result<String> {
        self.handle.path_for(name, params)
    }

    /// Runs the request through the dispatch loop and renders the
    /// response.
    ///
    /// Candidate routes come from the prefix index plus the catch-all
    /// bucket; they are then visited in registration order, so the index
    /// only ever narrows the set. An error that no callback claims is
    /// returned to the caller after the response state is reset to a 500.
    pub async fn dispatch(&self, req: Request<Bytes>) -> crate::Result<Response<Full<Bytes>>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let request = Arc::new(req);
        let reply = Reply::new();
        let service = Context::new();
        let mut params = RouteParams::new();
        let mut matched = MatchedRoutes::default();
        let mut methods_matched: Vec<Method> = Vec::new();
        let mut skip_remaining: usize = 0;

        let mut candidates = self.index.find_possible_routes(&path);
        candidates.extend(self.index.catch_all().iter().copied());

        tracing::debug!(
            method = %method,
            path = %path,
            candidates = candidates.len(),
            "dispatching request"
        );

        let mut exit = LoopExit::Completed;

        'routes: for route in self.collection.iter() {
            if !candidates.contains(&route.id) {
                continue;
            }
            if skip_remaining > 0 {
                skip_remaining -= 1;
                continue;
            }

            let method_ok = route.is_match_method(&method);
            let captures = match route.match_path(&path) {
                Some(captures) => captures,
                None => continue,
            };

            tracing::trace!(route = %route.path, method_ok, "route path matched");

            // Every counting route that matched path-wise contributes its
            // methods to the Allow bookkeeping, found or not.
            if route.count_match {
                if let Some(methods) = &route.methods {
                    for m in methods {
                        if !methods_matched.contains(m) {
                            methods_matched.push(m.clone());
                        }
                    }
                }
            }

            if !method_ok {
                continue;
            }

            for (name, raw) in captures {
                let decoded = match helpers::percent_decode(&raw) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        exit = LoopExit::Http(StatusCode::BAD_REQUEST, Some(Arc::new(err)));
                        break 'routes;
                    }
                };
                match name {
                    Some(name) => params.set(name, decoded),
                    None => params.push_positional(decoded),
                }
            }

            let args = HandlerArgs {
                request: request.clone(),
                params: params.clone(),
                response: reply.clone(),
                service: service.clone(),
                app: self.app.clone(),
                router: self.handle.clone(),
                matched: matched.clone(),
                methods_matched: methods_matched.clone(),
            };

            match route.process(args).await {
                Ok(Outcome::Next) => {}
                Ok(Outcome::Text(text)) => reply.append(&text),
                Ok(Outcome::Response(res)) => reply.replace_with(res).await,
                Ok(Outcome::SkipThis) => continue 'routes,
                Ok(Outcome::SkipNext(n)) => skip_remaining = n,
                Ok(Outcome::SkipRemaining) => break 'routes,
                Ok(Outcome::Abort(Some(code))) => {
                    exit = LoopExit::Http(code, None);
                    break 'routes;
                }
                Ok(Outcome::Abort(None)) => break 'routes,
                Err(err) => {
                    // An HTTP-kind error from a handler behaves like an
                    // abort with that status; anything else leaves the
                    // loop for the unknown-error callbacks.
                    exit = match err.downcast::<Error>() {
                        Ok(own) => match own.status_code() {
                            Some(code) => {
                                let boxed: RouteError = own;
                                LoopExit::Http(code, Some(Arc::new(boxed)))
                            }
                            None => {
                                let boxed: RouteError = own;
                                LoopExit::Unknown(boxed)
                            }
                        },
                        Err(other) => LoopExit::Unknown(other),
                    };
                    break 'routes;
                }
            }

            if route.count_match {
                matched.add(route.id, &route.path);
            }
        }

        match exit {
            LoopExit::Completed => {
                if matched.is_empty() && !methods_matched.is_empty() {
                    let allow = helpers::join_allow(&methods_matched);
                    if let Ok(value) = HeaderValue::from_str(&allow) {
                        reply.header(header::ALLOW, value);
                    }
                    // For OPTIONS the Allow header itself is the answer.
                    if method != Method::OPTIONS {
                        self.http_error(
                            StatusCode::METHOD_NOT_ALLOWED,
                            &reply,
                            &matched,
                            &methods_matched,
                            None,
                        )
                        .await?;
                    }
                } else if matched.is_empty() {
                    self.http_error(StatusCode::NOT_FOUND, &reply, &matched, &methods_matched, None)
                        .await?;
                }
            }
            LoopExit::Http(code, error) => {
                self.http_error(code, &reply, &matched, &methods_matched, error)
                    .await?;
            }
            LoopExit::Unknown(err) => {
                self.unknown_error(err, &reply).await?;
            }
        }

        for callback in &self.after_dispatch {
            if let Err(err) = Pin::from(callback(reply.clone())).await {
                self.unknown_error(err.into(), &reply).await?;
            }
        }

        Ok(reply.finalize(method == Method::HEAD))
    }

    /// Surfaces an HTTP-kind failure: sets the status, runs the HTTP-error
    /// chain against a temporarily unlocked reply, and locks the reply for
    /// good. A chain callback that itself fails becomes an unhandled
    /// error.
    async fn http_error(
        &self,
        code: StatusCode,
        reply: &Reply,
        matched: &MatchedRoutes,
        methods_matched: &[Method],
        error: Option<Arc<RouteError>>,
    ) -> crate::Result<()> {
        tracing::debug!(code = %code, "raising HTTP error");
        reply.set_status(code);
        reply.unlock();

        let mut chain_failure: Option<RouteError> = None;
        for callback in &self.http_error_handlers {
            let args = HttpErrorArgs {
                code,
                response: reply.clone(),
                router: self.handle.clone(),
                matched: matched.clone(),
                methods_matched: methods_matched.to_vec(),
                error: error.clone(),
            };
            if let Err(err) = Pin::from(callback(args)).await {
                chain_failure = Some(err.into());
                break;
            }
        }

        reply.lock();

        if let Some(err) = chain_failure {
            reply.set_status(StatusCode::INTERNAL_SERVER_ERROR);
            reply.clear_body();
            return Err(Error::Unhandled(err.to_string()).into());
        }
        Ok(())
    }

    /// Routes an error nobody converted to an HTTP response through the
    /// unknown-error callbacks. The first callback to return `true` claims
    /// it; with no claimant the dispatch fails with a 500-state reply.
    async fn unknown_error(&self, err: RouteError, reply: &Reply) -> crate::Result<()> {
        tracing::debug!(error = %err, "routing unhandled error");
        let err = Arc::new(err);
        for callback in &self.error_handlers {
            if Pin::from(callback(reply.clone(), err.clone())).await {
                return Ok(());
            }
        }
        reply.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        reply.clear_body();
        Err(Error::Unhandled(err.to_string()).into())
    }
}

impl<E> Debug for Router<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Router {{ routes: {}, http_error_handlers: {}, error_handlers: {}, after_dispatch: {} }}",
            self.collection.len(),
            self.http_error_handlers.len(),
            self.error_handlers.len(),
            self.after_dispatch.len()
        )
    }
}
