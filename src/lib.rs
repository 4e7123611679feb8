//! `switchback` is a lightweight, composable HTTP request router for the Rust
//! HTTP library [hyper](https://hyper.rs/), built around expressive path
//! patterns and a cooperative dispatch loop.
//!
//! Core features:
//!
//! - 🧭 Typed path placeholders (`/users/[i:id]`, `/posts/[s:slug]`), custom
//!   regex patterns (`@\.(json|csv)$`) and negated patterns (`!/admin`)
//!
//! - 🚀 Candidate narrowing through a literal-prefix index, so a request only
//!   ever runs the regexes that share its path prefix
//!
//! - 🔁 Multiple handlers per request in registration order, with
//!   skip/abort flow control between them
//!
//! - ❗ HTTP error semantics handled for you: 404, 405 with an `Allow`
//!   header, `HEAD` served by `GET` routes, and error-handler chains
//!
//! - 🧵 Reverse routing from route names back to paths
//!
//! ## Basic Example
//!
//! A simple example using `switchback` with `hyper` would look like the
//! following:
//!
//! ```no_run
//! use hyper::body::Incoming;
//! use hyper::service::Service;
//! use hyper_util::rt::{TokioExecutor, TokioIo};
//! use hyper_util::server::conn::auto::Builder;
//! use switchback::{Outcome, Router, RouterService};
//! use std::convert::Infallible;
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! fn router() -> Router<Infallible> {
//!     Router::builder()
//!         .get("/", |_| async move { Ok(Outcome::text("Home page")) })
//!         .get("/users/[i:id]", |args| async move {
//!             let id = args.params.get("id").unwrap_or("?").to_string();
//!             Ok(Outcome::Text(format!("Hello user {}", id)))
//!         })
//!         .build()
//!         .unwrap()
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let service: Arc<RouterService<Incoming, _>> = Arc::new(RouterService::new(router()));
//!
//!     let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
//!     let listener = TcpListener::bind(addr).await?;
//!     println!("App is running on: {}", addr);
//!
//!     loop {
//!         let (stream, _) = listener.accept().await?;
//!         let service = service.clone();
//!
//!         tokio::spawn(async move {
//!             let request_service = service.call(&stream).await.unwrap();
//!             let io = TokioIo::new(stream);
//!             let builder = Builder::new(TokioExecutor::new());
//!             if let Err(err) = builder.serve_connection(io, request_service).await {
//!                 eprintln!("Error serving connection: {:?}", err);
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! ## Route Patterns
//!
//! A route path is matched literally unless it contains placeholder blocks
//! or starts with a marker character:
//!
//! ```txt
//! /users/profile              literal
//! /users/[i:id]               decimal digits, captured as "id"
//! /posts/[s:slug]             slug characters, captured as "slug"
//! /colors/[h:hex]             hex digits
//! /users/[:name]              anything up to the next slash
//! /users/[i:id]?              the whole last segment is optional
//! /files/[**:path]            the rest of the path, slashes included
//! @\.(json|csv)$              custom regex, used as written
//! !/admin                     matches everything EXCEPT /admin
//! *                           matches every path
//! ```
//!
//! Captured values are percent-decoded and land in
//! [`HandlerArgs::params`](./struct.HandlerArgs.html); a `+` stays a `+`,
//! and an encoded `%2F` decodes to a slash without splitting the segment.
//!
//! ## Dispatch
//!
//! Unlike routers that stop at the first hit, the dispatcher runs *every*
//! matching route in registration order. Handlers cooperate through their
//! return value: contribute body text, replace the response wholesale, or
//! steer the loop with [`Outcome::SkipThis`](./enum.Outcome.html),
//! [`Outcome::SkipNext`](./enum.Outcome.html),
//! [`Outcome::SkipRemaining`](./enum.Outcome.html) and
//! [`Outcome::Abort`](./enum.Outcome.html). When no counting route matched,
//! the dispatcher raises a 404; when only the method kept routes from
//! running, it raises a 405 carrying an `Allow` header (or, for an
//! `OPTIONS` request, just answers with the header).
//!
//! ## Scoping
//!
//! A router mounts into another router under a path namespace:
//!
//! ```
//! use switchback::{Outcome, Router, RouterBuilder};
//! use std::convert::Infallible;
//!
//! fn api() -> RouterBuilder<Infallible> {
//!     Router::builder()
//!         .get("/books", |_| async move { Ok(Outcome::text("List of books")) })
//!         .get("/books/[i:id]", |args| async move {
//!             let id = args.params.get("id").unwrap_or("?").to_string();
//!             Ok(Outcome::Text(format!("Show book: {}", id)))
//!         })
//! }
//!
//! # fn run() -> Router<Infallible> {
//! let router = Router::builder()
//!     // Mounts the API routes under the "/api" prefix.
//!     .scope("/api", api())
//!     .build()
//!     .unwrap();
//! # router
//! # }
//! # run();
//! ```
//!
//! ## Error Handling
//!
//! HTTP-kind errors (404, 405, handler aborts) run the chain registered
//! with [`RouterBuilder::on_http_error`](./struct.RouterBuilder.html#method.on_http_error);
//! any other handler error runs the
//! [`on_error`](./struct.RouterBuilder.html#method.on_error) callbacks in
//! order until one claims it. An unclaimed error fails the dispatch with a
//! 500-state response.
//!
//! ```
//! use hyper::StatusCode;
//! use switchback::{Outcome, Router};
//!
//! # fn run() -> Router<switchback::Error> {
//! let router = Router::builder()
//!     .get("/teapot", |_| async move { Ok(Outcome::abort(StatusCode::IM_A_TEAPOT)) })
//!     .on_http_error(|args| async move {
//!         args.response.append(&format!("oops: {}", args.code));
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//! # router
//! # }
//! # run();
//! ```

pub use self::error::{Error, RouteError};
pub use self::flow::Outcome;
pub use self::route::Route;
pub use self::router::{Router, RouterBuilder};
#[doc(hidden)]
pub use self::service::RequestService;
pub use self::service::RequestServiceBuilder;
pub use self::service::RouterService;
pub use self::types::{
    Context, HandlerArgs, HttpErrorArgs, MatchedRoutes, Reply, RouteParams, RouterHandle,
};

mod constants;
mod error;
pub mod ext;
mod flow;
mod helpers;
mod index;
pub mod prelude;
mod regex_generator;
mod route;
mod router;
mod service;
mod types;

/// A Result type often returned from methods that can have switchback
/// errors.
pub type Result<T> = std::result::Result<T, RouteError>;
