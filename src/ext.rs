//! Extension traits over the hyper request for metadata the service layer
//! records before dispatch.

use crate::types::RequestMeta;
use std::net::SocketAddr;

pub trait RequestExt {
    /// The peer address of the connection this request arrived on, when
    /// the service layer recorded one. `None` for requests dispatched
    /// without going through the service.
    fn remote_addr(&self) -> Option<SocketAddr>;
}

impl<T> RequestExt for hyper::Request<T> {
    fn remote_addr(&self) -> Option<SocketAddr> {
        self.extensions()
            .get::<RequestMeta>()
            .and_then(|meta| meta.remote_addr)
    }
}
