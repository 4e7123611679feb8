use crate::error::{Error, RouteError};
use crate::types::RequestMeta;
use http::Extensions;
use hyper::Method;
use percent_encoding::percent_decode_str;

/// Decodes the `%HH` escapes in a captured parameter value per RFC 3986.
/// `+` is deliberately left alone: it is a valid path character, not a
/// space, outside of query strings.
pub(crate) fn percent_decode(value: &str) -> Result<String, RouteError> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| -> RouteError {
            Error::http_with_message(
                hyper::StatusCode::BAD_REQUEST,
                format!("Couldn't percent decode the captured parameter {:?}: {}", value, e),
            )
            .into()
        })
}

/// Joins a method set into an `Allow` header value. The order carries no
/// meaning; clients should test membership.
pub(crate) fn join_allow(methods: &[Method]) -> String {
    methods
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn is_canonical_method(method: &Method) -> bool {
    crate::constants::CANONICAL_METHODS.contains(method)
}

pub(crate) fn update_req_meta_in_extensions(ext: &mut Extensions, req_meta: RequestMeta) {
    ext.insert(req_meta);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_percent_escapes() {
        assert_eq!(percent_decode("and%2For").unwrap(), "and/or");
        assert_eq!(percent_decode("caf%C3%A9").unwrap(), "café");
    }

    #[test]
    fn should_leave_plus_alone() {
        assert_eq!(percent_decode("Knife+Party").unwrap(), "Knife+Party");
    }

    #[test]
    fn should_reject_invalid_utf8() {
        assert!(percent_decode("%FF%FE").is_err());
    }

    #[test]
    fn should_join_methods_for_allow() {
        let joined = join_allow(&[Method::GET, Method::POST]);
        assert!(joined.contains("GET"));
        assert!(joined.contains("POST"));
        assert!(joined.contains(", "));
    }
}
