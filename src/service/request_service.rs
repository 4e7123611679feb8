use crate::helpers;
use crate::router::Router;
use crate::types::RequestMeta;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::{service::Service, Request, Response};
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

/// A hyper [`Service`](https://docs.rs/hyper/1/hyper/service/trait.Service.html)
/// that feeds one connection's requests into the router.
pub struct RequestService<T, E> {
    pub(crate) router: Arc<Router<E>>,
    pub(crate) remote_addr: SocketAddr,
    pub(crate) _body: PhantomData<fn(T)>,
}

impl<T, E> Service<Request<T>> for RequestService<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
    T: Body + Send + 'static,
    T::Data: Send,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = crate::RouteError;
    #[allow(clippy::type_complexity)]
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<T>) -> Self::Future {
        let router = self.router.clone();
        let remote_addr = self.remote_addr;

        let fut = async move {
            let (mut parts, body) = req.into_parts();

            // Buffer the body up front: several handlers may run for one
            // request and each gets the same immutable view of it.
            let bytes = body
                .collect()
                .await
                .map_err(|e| -> crate::RouteError { Box::new(e) })?
                .to_bytes();

            helpers::update_req_meta_in_extensions(
                &mut parts.extensions,
                RequestMeta::with_remote_addr(remote_addr),
            );

            router.dispatch(Request::from_parts(parts, bytes)).await
        };

        Box::pin(fut)
    }
}

impl<T, E> Debug for RequestService<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RequestService {{ remote_addr: {} }}", self.remote_addr)
    }
}

/// Builds a [`RequestService`](./struct.RequestService.html) per
/// connection over one shared router.
#[derive(Debug)]
pub struct RequestServiceBuilder<T, E> {
    router: Arc<Router<E>>,
    _body: PhantomData<fn(T)>,
}

impl<T, E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static> RequestServiceBuilder<T, E> {
    pub fn new(router: Router<E>) -> Self {
        Self {
            router: Arc::new(router),
            _body: PhantomData,
        }
    }

    pub fn build(&self, remote_addr: SocketAddr) -> RequestService<T, E> {
        RequestService {
            router: self.router.clone(),
            remote_addr,
            _body: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Outcome, RequestServiceBuilder, Router};
    use http::Method;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::{service::Service, Request, Response};
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::str::FromStr;

    #[tokio::test]
    async fn should_route_request() {
        const RESPONSE_TEXT: &str = "Hello world!";
        let remote_addr = SocketAddr::from_str("0.0.0.0:8080").unwrap();
        let router: Router<Infallible> = Router::builder()
            .get("/", |_| async move { Ok(Outcome::text(RESPONSE_TEXT)) })
            .build()
            .unwrap();
        let req: Request<Full<Bytes>> = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let builder = RequestServiceBuilder::new(router);
        let service = builder.build(remote_addr);

        let resp: Response<Full<Bytes>> = service.call(req).await.unwrap();
        let body_bytes = BodyExt::collect(resp.into_body()).await.unwrap().to_bytes();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(RESPONSE_TEXT, body)
    }
}
