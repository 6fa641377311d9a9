//! Admission control over real sockets.

use std::sync::Arc;

use axum::{routing::get, Router};
use edgeguard::config::RouteLimitConfig;
use edgeguard::security::real_ip::peer_ip;
use edgeguard::security::{fixed_policy, AdmissionGate, MemoryStore, Policy, WindowStore};

mod common;

fn app() -> Router {
    Router::new()
        .route("/", get(|| async { "handler" }))
        .route("/login", get(|| async { "login" }))
}

fn header(res: &reqwest::Response, name: &str) -> u64 {
    res.headers()[name].to_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn rejects_after_limit_with_headers() {
    let store: Arc<dyn WindowStore> = Arc::new(MemoryStore::new());
    let gate = AdmissionGate::new(store, peer_ip, fixed_policy(Policy::per_seconds(2, 2).unwrap()))
        .with_message("oh noes");
    let (handle, _) = common::start(common::local_config(), gate.protect(app())).await;
    let client = common::client();

    for want_remaining in [1, 0] {
        let res = client.get(common::url(&handle, "/")).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(header(&res, "x-rate-limit-limit"), 2);
        assert_eq!(header(&res, "x-rate-limit-remaining"), want_remaining);
    }

    let res = client.get(common::url(&handle, "/")).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert_eq!(header(&res, "x-rate-limit-remaining"), 0);
    assert_eq!(header(&res, "x-rate-limit-reset"), 2);
    assert_eq!(res.text().await.unwrap(), "oh noes");

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
    let res = client.get(common::url(&handle, "/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(header(&res, "x-rate-limit-remaining"), 1);

    handle.stop();
    handle.stopped().await;
}

#[tokio::test]
async fn concurrent_clients_get_exactly_the_limit() {
    let store: Arc<dyn WindowStore> = Arc::new(MemoryStore::new());
    let gate = AdmissionGate::new(store, peer_ip, fixed_policy(Policy::per_seconds(5, 60).unwrap()));
    let (handle, _) = common::start(common::local_config(), gate.protect(app())).await;

    let client = common::client();
    let requests: Vec<_> = (0..20)
        .map(|_| tokio::spawn(client.get(common::url(&handle, "/")).send()))
        .collect();

    let mut ok = 0;
    let mut limited = 0;
    for request in requests {
        match request.await.unwrap().unwrap().status().as_u16() {
            200 => ok += 1,
            429 => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!((ok, limited), (5, 15));

    handle.stop();
    handle.stopped().await;
}

#[tokio::test]
async fn configured_gate_uses_route_policies() {
    let mut config = common::local_config();
    config.rate_limit.enabled = true;
    config.rate_limit.limit = 100;
    config.rate_limit.message = "too many".into();
    config.rate_limit.routes.push(RouteLimitConfig {
        path_prefix: "/login".into(),
        limit: 1,
        period_secs: 60,
    });

    let store: Arc<dyn WindowStore> = Arc::new(MemoryStore::new());
    let gate = AdmissionGate::from_config(&config.rate_limit, store).unwrap();
    let (handle, _) = common::start(config, gate.protect(app())).await;
    let client = common::client();

    assert_eq!(client.get(common::url(&handle, "/login")).send().await.unwrap().status(), 200);
    let res = client.get(common::url(&handle, "/login")).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert_eq!(header(&res, "x-rate-limit-limit"), 1);
    assert_eq!(res.text().await.unwrap(), "too many");

    let res = client.get(common::url(&handle, "/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(header(&res, "x-rate-limit-limit"), 100);

    handle.stop();
    handle.stopped().await;
}
