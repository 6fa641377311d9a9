//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the caller's router with request tracing
//! - Apply read (request body) and write (whole response) timeouts
//!
//! # Design Decisions
//! - Timeouts are layers rather than socket options, so they behave the same
//!   for plaintext and TLS serving
//! - A timed out request is answered with 408 by tower-http

use axum::Router;
use tower_http::{
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use crate::config::TimeoutConfig;

/// Apply the standard serving layers to `router`.
#[allow(deprecated)]
pub fn wrap(router: Router, timeouts: &TimeoutConfig) -> Router {
    router
        .layer(RequestBodyTimeoutLayer::new(timeouts.read()))
        .layer(TimeoutLayer::new(timeouts.write()))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}, routing::get};
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out() {
        let timeouts = TimeoutConfig {
            write_secs: 1,
            ..TimeoutConfig::default()
        };
        let app = wrap(
            Router::new().route(
                "/",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            ),
            &timeouts,
        );

        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn fast_handler_passes() {
        let app = wrap(
            Router::new().route("/", get(|| async { "ok" })),
            &TimeoutConfig::default(),
        );
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
