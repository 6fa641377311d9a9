//! Plaintext HTTP to HTTPS redirect handler.
//!
//! Served on the secondary listener. Every request gets a permanent redirect
//! to the same host and path on the HTTPS port.

use axum::{
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};

/// Router answering every request with a redirect to `https_port`.
pub fn router(https_port: u16) -> Router {
    Router::new().fallback(move |headers: HeaderMap, uri: Uri| async move {
        redirect(&headers, &uri, https_port)
    })
}

fn redirect(headers: &HeaderMap, uri: &Uri, https_port: u16) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .map(strip_port)
        .filter(|h| !h.is_empty());

    let Some(host) = host else {
        return (StatusCode::BAD_REQUEST, "missing Host header").into_response();
    };

    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let location = if https_port == 443 {
        format!("https://{host}{path}")
    } else {
        format!("https://{host}:{https_port}{path}")
    };

    tracing::debug!(location = %location, "Redirecting to HTTPS");
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

/// `example.com:80` → `example.com`, `[::1]:80` → `[::1]`.
fn strip_port(host: &str) -> &str {
    match host.rfind(':') {
        Some(i) if !host[i..].contains(']') && (!host[..i].contains(':') || host[..i].ends_with(']')) => {
            &host[..i]
        }
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn location(app: Router, host: Option<&str>, uri: &str) -> (StatusCode, Option<String>) {
        let mut req = Request::builder().uri(uri);
        if let Some(host) = host {
            req = req.header(header::HOST, host);
        }
        let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let loc = res
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        (res.status(), loc)
    }

    #[tokio::test]
    async fn redirects_to_default_https_port() {
        let (status, loc) = location(router(443), Some("example.com:80"), "/a/b?c=d").await;
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(loc.as_deref(), Some("https://example.com/a/b?c=d"));
    }

    #[tokio::test]
    async fn keeps_non_default_port() {
        let (_, loc) = location(router(8443), Some("[::1]:8080"), "/").await;
        assert_eq!(loc.as_deref(), Some("https://[::1]:8443/"));
    }

    #[tokio::test]
    async fn missing_host_is_bad_request() {
        let (status, loc) = location(router(443), None, "/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(loc.is_none());
    }

    #[test]
    fn strips_ports() {
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("[::1]"), "[::1]");
        assert_eq!(strip_port("[::1]:80"), "[::1]");
    }
}
