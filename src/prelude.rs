//! A "prelude" for handler code: the types nearly every handler touches.

pub use crate::ext::RequestExt;
pub use crate::flow::Outcome;
pub use crate::types::{Context, HandlerArgs, Reply, RouteParams};
