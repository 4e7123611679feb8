#![allow(dead_code)]

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::service::Service;
use hyper::{Request, Response};
use std::net::SocketAddr;
use std::str::FromStr;
use switchback::{RequestService, RequestServiceBuilder, Router};

/// Drives the request service directly, without sockets: every test
/// request goes through the same body-buffering and dispatch path a real
/// connection would.
pub struct TestClient<E> {
    service: RequestService<Full<Bytes>, E>,
}

impl<E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static> TestClient<E> {
    pub fn new(router: Router<E>) -> TestClient<E> {
        let builder = RequestServiceBuilder::new(router);
        let remote_addr = SocketAddr::from_str("127.0.0.1:9999").unwrap();
        TestClient {
            service: builder.build(remote_addr),
        }
    }

    pub fn new_request(&self, method: &str, route: &str) -> http::request::Builder {
        http::request::Request::builder()
            .method(method.to_ascii_uppercase().as_str())
            .uri(route)
    }

    pub async fn request(&self, method: &str, route: &str) -> Response<Full<Bytes>> {
        self.try_request(method, route)
            .await
            .expect("dispatch returned an error")
    }

    pub async fn try_request(
        &self,
        method: &str,
        route: &str,
    ) -> switchback::Result<Response<Full<Bytes>>> {
        let req: Request<Full<Bytes>> = self
            .new_request(method, route)
            .body(Full::new(Bytes::new()))
            .unwrap();
        self.service.call(req).await
    }
}

pub async fn into_text<B>(body: B) -> String
where
    B: hyper::body::Body<Data = Bytes> + Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    String::from_utf8_lossy(&body.collect().await.unwrap().to_bytes()).to_string()
}
