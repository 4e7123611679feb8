use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

/// What a route handler hands back to the dispatch loop.
///
/// The first three variants contribute to the response; the rest steer the
/// loop itself. Handlers that want to both write output and skip ahead
/// append through [`Reply`](./struct.Reply.html) first and then return a
/// flow variant.
///
/// # Examples
///
/// ```
/// use switchback::{Outcome, Router};
/// use std::convert::Infallible;
///
/// # fn run() -> Router<Infallible> {
/// let router = Router::builder()
///     .get("/greet/[:name]", |args| async move {
///         let name = args.params.get("name").unwrap_or("stranger").to_string();
///         Ok(Outcome::Text(format!("Hello {}", name)))
///     })
///     .build()
///     .unwrap();
/// # router
/// # }
/// # run();
/// ```
#[derive(Debug)]
pub enum Outcome {
    /// Nothing to contribute; move on to the next candidate route.
    Next,

    /// Append this text to the current response body. Appending to a locked
    /// response is a silent no-op.
    Text(String),

    /// Replace the current response wholesale.
    Response(Response<Full<Bytes>>),

    /// Abandon this route's contribution and resume with the next route.
    SkipThis,

    /// Skip the next `n` candidate routes after this one.
    SkipNext(usize),

    /// Stop the dispatch loop entirely. Routes already run keep their
    /// contributions.
    SkipRemaining,

    /// With a code, raise an HTTP error of that status; without one, halt
    /// dispatch like [`SkipRemaining`](#variant.SkipRemaining) does.
    Abort(Option<StatusCode>),
}

impl Outcome {
    /// Appends `text` to the response body.
    pub fn text<T: Into<String>>(text: T) -> Outcome {
        Outcome::Text(text.into())
    }

    /// Skips the single next candidate route.
    pub fn skip_next() -> Outcome {
        Outcome::SkipNext(1)
    }

    /// Raises an HTTP error with the given status code.
    pub fn abort(code: StatusCode) -> Outcome {
        Outcome::Abort(Some(code))
    }
}

impl From<String> for Outcome {
    fn from(text: String) -> Outcome {
        Outcome::Text(text)
    }
}

impl From<&str> for Outcome {
    fn from(text: &str) -> Outcome {
        Outcome::Text(text.to_string())
    }
}

impl From<Response<Full<Bytes>>> for Outcome {
    fn from(res: Response<Full<Bytes>>) -> Outcome {
        Outcome::Response(res)
    }
}
