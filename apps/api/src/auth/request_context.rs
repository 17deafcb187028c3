use axum::http::HeaderMap;

/// Extracts the originating client IP from proxy headers.
///
/// Takes the first entry of `x-forwarded-for`; the deployment terminates TLS
/// behind a trusted reverse proxy that sets the header.
pub(super) fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::client_ip;

    #[test]
    fn first_forwarded_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn missing_header_yields_none() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn empty_header_yields_none() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        assert_eq!(client_ip(&headers), None);
    }
}
