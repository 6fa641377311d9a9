//! Admission control middleware backed by a sliding-window store.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::config::{KeyStrategy, RateLimitConfig};
use crate::error::Error;
use crate::observability::metrics;
use crate::security::real_ip::{peer_ip, real_ip};
use crate::security::window::{GrantResult, Policy, WindowStore};

pub const X_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-rate-limit-limit");
pub const X_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-rate-limit-remaining");
pub const X_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-rate-limit-reset");

/// Body sent with a 429 when no message is configured.
pub const DEFAULT_MESSAGE: &str = "rate limited exceeded";

/// Maps a request to the client key it is counted against.
pub type KeyFn = Arc<dyn Fn(&Request<Body>) -> String + Send + Sync>;

/// Maps a request to the policy that applies to it.
pub type PolicyFn = Arc<dyn Fn(&Request<Body>) -> Policy + Send + Sync>;

/// Per-request admission decision in front of downstream handlers.
///
/// The gate holds no counters itself; every decision goes through the
/// injected [`WindowStore`].
#[derive(Clone)]
pub struct AdmissionGate {
    store: Arc<dyn WindowStore>,
    key_of: KeyFn,
    policy_of: PolicyFn,
    message: String,
    max_period: Option<Duration>,
}

/// Everything the middleware needs to answer one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub key: String,
    pub policy: Policy,
    pub result: GrantResult,
}

impl AdmissionGate {
    pub fn new<K, P>(store: Arc<dyn WindowStore>, key_of: K, policy_of: P) -> Self
    where
        K: Fn(&Request<Body>) -> String + Send + Sync + 'static,
        P: Fn(&Request<Body>) -> Policy + Send + Sync + 'static,
    {
        Self {
            store,
            key_of: Arc::new(key_of),
            policy_of: Arc::new(policy_of),
            message: DEFAULT_MESSAGE.to_string(),
            max_period: None,
        }
    }

    /// Build a gate from the `[rate_limit]` config section.
    pub fn from_config(config: &RateLimitConfig, store: Arc<dyn WindowStore>) -> Result<Self, Error> {
        let policies = RoutePolicies::from_config(config)?;
        let max_period = policies.max_period();
        let key_of: fn(&Request<Body>) -> String = match config.key {
            KeyStrategy::PeerIp => peer_ip,
            KeyStrategy::RealIp => real_ip,
        };

        let mut gate = Self::new(store, key_of, move |req: &Request<Body>| {
            policies.policy_for(req.uri().path())
        });
        gate.max_period = Some(max_period);
        Ok(if config.message.is_empty() {
            gate
        } else {
            gate.with_message(config.message.clone())
        })
    }

    /// Replace the plain-text body of 429 responses.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Longest period any policy of this gate uses.
    ///
    /// Only known for gates built by [`from_config`](Self::from_config).
    pub fn max_period(&self) -> Option<Duration> {
        self.max_period
    }

    /// Consult the store for this request.
    pub fn admit(&self, req: &Request<Body>) -> Admission {
        let key = (self.key_of)(req);
        let policy = (self.policy_of)(req);
        let result = self.store.grant(&key, policy);
        Admission { key, policy, result }
    }

    /// Put the gate in front of every route of `router`.
    pub fn protect<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self, admission_middleware))
    }
}

/// Always returns the same policy.
pub fn fixed_policy(policy: Policy) -> impl Fn(&Request<Body>) -> Policy + Send + Sync + Clone {
    move |_| policy
}

/// Path-prefix based policy selection.
///
/// The longest matching prefix wins; unmatched paths get the default.
#[derive(Debug, Clone)]
pub struct RoutePolicies {
    default: Policy,
    routes: Vec<(String, Policy)>,
}

impl RoutePolicies {
    pub fn new(default: Policy) -> Self {
        Self {
            default,
            routes: Vec::new(),
        }
    }

    pub fn route(mut self, prefix: impl Into<String>, policy: Policy) -> Self {
        self.routes.push((prefix.into(), policy));
        self.routes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    pub fn from_config(config: &RateLimitConfig) -> Result<Self, Error> {
        let default = Policy::new(config.limit, Duration::from_secs(config.period_secs))?;
        config.routes.iter().try_fold(Self::new(default), |acc, route| {
            let policy = Policy::new(route.limit, Duration::from_secs(route.period_secs))?;
            Ok(acc.route(route.path_prefix.clone(), policy))
        })
    }

    pub fn policy_for(&self, path: &str) -> Policy {
        self.routes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, policy)| *policy)
            .unwrap_or(self.default)
    }

    /// Longest period across all policies; bounds how long history matters.
    pub fn max_period(&self) -> Duration {
        self.routes
            .iter()
            .map(|(_, p)| p.period())
            .fold(self.default.period(), Duration::max)
    }
}

/// Axum middleware applying an [`AdmissionGate`].
pub async fn admission_middleware(
    State(gate): State<AdmissionGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let admission = gate.admit(&request);
    metrics::record_admission(admission.result.granted);

    if !admission.result.granted {
        tracing::warn!(
            client = %admission.key,
            policy = %admission.policy,
            reset_secs = admission.result.reset_secs,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            gate.message.clone(),
        )
            .into_response();
        set_rate_headers(response.headers_mut(), &admission);
        return response;
    }

    tracing::debug!(
        client = %admission.key,
        remaining = admission.result.remaining,
        "Request admitted"
    );
    let mut response = next.run(request).await;
    set_rate_headers(response.headers_mut(), &admission);
    response
}

fn set_rate_headers(headers: &mut HeaderMap, admission: &Admission) {
    headers.insert(X_RATE_LIMIT_LIMIT, HeaderValue::from(admission.policy.limit()));
    headers.insert(X_RATE_LIMIT_REMAINING, HeaderValue::from(admission.result.remaining));
    headers.insert(X_RATE_LIMIT_RESET, HeaderValue::from(admission.result.reset_secs));
}
