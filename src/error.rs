use hyper::StatusCode;
use std::fmt::{self, Display, Formatter};

/// The error type produced by the router itself.
///
/// Errors raised by route handlers keep their own type and are boxed into
/// [`RouteError`](./type.RouteError.html); this enum covers the failures the
/// router can detect on its own, both at registration time
/// ([`PatternCompilation`](#variant.PatternCompilation),
/// [`InvalidArgument`](#variant.InvalidArgument)) and during dispatch
/// ([`Http`](#variant.Http), [`Unhandled`](#variant.Unhandled)).
#[derive(Debug)]
pub enum Error {
    /// An HTTP-level failure carrying a status code: a 404 or 405 raised by
    /// the dispatcher, or an explicit abort from a handler.
    Http {
        code: StatusCode,
        message: Option<String>,
    },

    /// A route pattern did not compile. Carries the pattern as the user
    /// wrote it and the underlying regex engine message.
    PatternCompilation { path: String, message: String },

    /// A registration-time misuse, e.g. a method name outside the canonical
    /// HTTP method set.
    InvalidArgument(String),

    /// Reverse routing was asked for a name no route carries.
    NamedRouteNotFound(String),

    /// An error escaped a handler and no error callback claimed it.
    Unhandled(String),
}

impl Error {
    /// Creates an HTTP error with the given status code and no message.
    pub fn http(code: StatusCode) -> Error {
        Error::Http { code, message: None }
    }

    /// Creates an HTTP error with a status code and a message.
    pub fn http_with_message<M: Into<String>>(code: StatusCode, message: M) -> Error {
        Error::Http {
            code,
            message: Some(message.into()),
        }
    }

    /// The status code, if this is an HTTP-kind error.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Error::Http { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http { code, message } => match message {
                Some(msg) => write!(f, "HTTP {}: {}", code, msg),
                None => write!(f, "HTTP {}", code),
            },
            Error::PatternCompilation { path, message } => {
                write!(f, "Could not compile the route pattern {:?}: {}", path, message)
            }
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::NamedRouteNotFound(name) => {
                write!(f, "No route is registered under the name {:?}", name)
            }
            Error::Unhandled(msg) => write!(f, "Unhandled error escaped dispatch: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// The boxed error type the router moves around internally. Route handlers
/// may fail with any error type; it is converted into this alias before the
/// error callbacks see it, and the original error stays accessible through
/// downcasting.
pub type RouteError = Box<dyn std::error::Error + Send + Sync + 'static>;
