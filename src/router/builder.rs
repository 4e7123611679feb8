use crate::error::Error;
use crate::flow::Outcome;
use crate::index::RouteIndex;
use crate::route::{Handler, Route};
use crate::router::collection::RouteCollection;
use crate::router::{AfterDispatchHandler, ErrorHandler, HttpErrorHandler, Router};
use crate::types::{Context, HandlerArgs, HttpErrorArgs, NamedRoute, Reply, RouterHandle};
use hyper::Method;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

struct PendingRoute<E> {
    namespace: String,
    path: String,
    methods: Option<Vec<Method>>,
    handler: Handler<E>,
    name: Option<String>,
}

/// Builder for the [Router](./struct.Router.html) type.
///
/// Routes are recorded in call order and that order is what dispatch
/// follows. Pattern compilation happens in [`build`](#method.build), which
/// reports the first broken pattern together with the path as it was
/// written.
///
/// # Examples
///
/// ```
/// use switchback::{Outcome, Router};
/// use std::convert::Infallible;
///
/// # fn run() -> Router<Infallible> {
/// let router = Router::builder()
///     .get("/users/[i:id]", |args| async move {
///         let id = args.params.get("id").unwrap_or("?").to_string();
///         Ok(Outcome::Text(format!("user {}", id)))
///     })
///     .build()
///     .unwrap();
/// # router
/// # }
/// # run();
/// ```
pub struct RouterBuilder<E> {
    pending: Vec<PendingRoute<E>>,
    data: Context,
    http_error_handlers: Vec<HttpErrorHandler<E>>,
    error_handlers: Vec<ErrorHandler>,
    after_dispatch: Vec<AfterDispatchHandler<E>>,
    registration_error: Option<Error>,
}

impl<E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static> RouterBuilder<E> {
    pub fn new() -> RouterBuilder<E> {
        RouterBuilder {
            pending: Vec::new(),
            data: Context::new(),
            http_error_handlers: Vec::new(),
            error_handlers: Vec::new(),
            after_dispatch: Vec::new(),
            registration_error: None,
        }
    }

    fn add_route<P, H, R>(mut self, methods: Option<Vec<Method>>, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        let handler: Handler<E> = Box::new(move |args| Box::new(handler(args)));
        self.pending.push(PendingRoute {
            namespace: String::new(),
            path: path.into(),
            methods,
            handler,
            name: None,
        });
        self
    }

    /// Adds a route constrained to the given method set. The methods must
    /// be canonical HTTP methods; anything else fails the build with an
    /// invalid-argument error.
    pub fn methods<P, H, R>(self, methods: Vec<Method>, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(methods), path, handler)
    }

    /// Adds a route that matches every request method.
    pub fn any<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(None, path, handler)
    }

    pub fn get<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(vec![Method::GET]), path, handler)
    }

    pub fn post<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(vec![Method::POST]), path, handler)
    }

    pub fn put<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(vec![Method::PUT]), path, handler)
    }

    pub fn delete<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(vec![Method::DELETE]), path, handler)
    }

    pub fn head<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(vec![Method::HEAD]), path, handler)
    }

    pub fn options<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(vec![Method::OPTIONS]), path, handler)
    }

    pub fn patch<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(vec![Method::PATCH]), path, handler)
    }

    pub fn trace<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(vec![Method::TRACE]), path, handler)
    }

    pub fn connect<P, H, R>(self, path: P, handler: H) -> Self
    where
        P: Into<String>,
        H: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<Outcome, E>> + Send + 'static,
    {
        self.add_route(Some(vec![Method::CONNECT]), path, handler)
    }

    /// Names the most recently added route for reverse routing.
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        match self.pending.last_mut() {
            Some(entry) => entry.name = Some(name.into()),
            None => {
                if self.registration_error.is_none() {
                    self.registration_error = Some(Error::InvalidArgument(
                        "name() called before any route was added".to_string(),
                    ));
                }
            }
        }
        self
    }

    /// Mounts every route of `other` under the `prefix` namespace. The
    /// scoped router's data, error handlers and after-dispatch callbacks
    /// are merged into this one.
    pub fn scope<P: Into<String>>(mut self, prefix: P, other: RouterBuilder<E>) -> Self {
        let prefix = prefix.into();
        for mut entry in other.pending {
            entry.namespace = format!("{}{}", prefix, entry.namespace);
            self.pending.push(entry);
        }
        self.data.absorb(&other.data);
        self.http_error_handlers.extend(other.http_error_handlers);
        self.error_handlers.extend(other.error_handlers);
        self.after_dispatch.extend(other.after_dispatch);
        if self.registration_error.is_none() {
            self.registration_error = other.registration_error;
        }
        self
    }

    /// Shares a value with every handler through the `app` context. One
    /// value per type.
    pub fn data<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.data.set(value);
        self
    }

    /// Registers an HTTP-error handler. The whole chain runs, in
    /// registration order, whenever the dispatcher surfaces an HTTP-kind
    /// error such as a 404, a 405 or an abort.
    pub fn on_http_error<H, R>(mut self, handler: H) -> Self
    where
        H: Fn(HttpErrorArgs) -> R + Send + Sync + 'static,
        R: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.http_error_handlers
            .push(Box::new(move |args| Box::new(handler(args))));
        self
    }

    /// Registers a callback for errors that are not HTTP-kind. Callbacks
    /// run in registration order until one returns `true`; if none does,
    /// dispatch fails with an unhandled error.
    pub fn on_error<H, R>(mut self, handler: H) -> Self
    where
        H: Fn(Reply, Arc<crate::RouteError>) -> R + Send + Sync + 'static,
        R: Future<Output = bool> + Send + 'static,
    {
        self.error_handlers
            .push(Box::new(move |reply, err| Box::new(handler(reply, err))));
        self
    }

    /// Queues a callback to run after the dispatch loop, before the
    /// response is sent. Callbacks run in FIFO order; an error from one of
    /// them is routed to the unknown-error callbacks.
    pub fn after_dispatch<H, R>(mut self, handler: H) -> Self
    where
        H: Fn(Reply) -> R + Send + Sync + 'static,
        R: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.after_dispatch
            .push(Box::new(move |reply| Box::new(handler(reply))));
        self
    }

    /// Compiles every registered pattern and assembles the router. Fails
    /// on the first pattern that does not compile, on a non-canonical
    /// method constraint, or on an earlier registration mistake.
    pub fn build(self) -> crate::Result<Router<E>> {
        if let Some(err) = self.registration_error {
            return Err(err.into());
        }

        let mut collection = RouteCollection::new();
        let mut index = RouteIndex::default();

        for entry in self.pending {
            let route = Route::new_with_boxed_handler(
                &entry.namespace,
                entry.path,
                entry.methods,
                entry.handler,
                entry.name,
            )?;
            index.add(&route);
            collection.add(route);
        }
        collection.prepare_named();

        let mut named: HashMap<String, NamedRoute> = HashMap::new();
        for route in collection.iter() {
            if let Some(name) = &route.name {
                named.insert(
                    name.clone(),
                    NamedRoute {
                        original_path: route.original_path.clone(),
                        is_custom_regex: route.is_custom_regex,
                    },
                );
            }
        }

        tracing::debug!(routes = collection.len(), "router built");

        Ok(Router {
            collection,
            index,
            app: self.data,
            handle: RouterHandle::new(named),
            http_error_handlers: self.http_error_handlers,
            error_handlers: self.error_handlers,
            after_dispatch: self.after_dispatch,
        })
    }
}

impl<E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static> Default for RouterBuilder<E> {
    fn default() -> Self {
        RouterBuilder::new()
    }
}

impl<E> Debug for RouterBuilder<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RouterBuilder {{ routes: {}, http_error_handlers: {}, error_handlers: {}, after_dispatch: {} }}",
            self.pending.len(),
            self.http_error_handlers.len(),
            self.error_handlers.len(),
            self.after_dispatch.len()
        )
    }
}
