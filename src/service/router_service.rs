use crate::router::Router;
use crate::service::request_service::{RequestService, RequestServiceBuilder};
use hyper::service::Service;
use std::convert::Infallible;
use std::future::{ready, Ready};
use tokio::net::TcpStream;

/// A [`Service`](https://docs.rs/hyper/1/hyper/service/trait.Service.html)
/// over incoming connections: for each accepted `TcpStream` it produces
/// the per-connection [`RequestService`](./struct.RequestService.html).
///
/// # Examples
///
/// ```no_run
/// use hyper::body::Incoming;
/// use hyper::service::Service;
/// use hyper_util::rt::{TokioExecutor, TokioIo};
/// use hyper_util::server::conn::auto::Builder;
/// use switchback::{Outcome, Router, RouterService};
/// use std::net::SocketAddr;
/// use std::sync::Arc;
/// use tokio::net::TcpListener;
///
/// fn router() -> Router<std::convert::Infallible> {
///     Router::builder()
///         .get("/", |_| async move { Ok(Outcome::text("Home page")) })
///         .build()
///         .unwrap()
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     let service: Arc<RouterService<Incoming, _>> = Arc::new(RouterService::new(router()));
///
///     let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
///     let listener = TcpListener::bind(addr).await?;
///     println!("App is running on: {}", addr);
///
///     loop {
///         let (stream, _) = listener.accept().await?;
///         let service = service.clone();
///
///         tokio::spawn(async move {
///             let request_service = service.call(&stream).await.unwrap();
///             let io = TokioIo::new(stream);
///             let builder = Builder::new(TokioExecutor::new());
///             if let Err(err) = builder.serve_connection(io, request_service).await {
///                 eprintln!("Error serving connection: {:?}", err);
///             }
///         });
///     }
/// }
/// ```
#[derive(Debug)]
pub struct RouterService<T, E> {
    builder: RequestServiceBuilder<T, E>,
}

impl<T, E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static> RouterService<T, E> {
    pub fn new(router: Router<E>) -> RouterService<T, E> {
        RouterService {
            builder: RequestServiceBuilder::new(router),
        }
    }
}

impl<T, E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static> Service<&TcpStream>
    for RouterService<T, E>
{
    type Response = RequestService<T, E>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, conn: &TcpStream) -> Self::Future {
        let addr = match conn.peer_addr() {
            Ok(addr) => addr,
            Err(_) => std::net::SocketAddr::from(([0, 0, 0, 0], 0)),
        };
        ready(Ok(self.builder.build(addr)))
    }
}
