//! Shared utilities for integration tests.
#![allow(dead_code)]

use axum::Router;
use edgeguard::{LifecycleHandle, LifecycleManager, ServeConfig, Shutdown};

/// Config bound to an ephemeral loopback port.
pub fn local_config() -> ServeConfig {
    let mut config = ServeConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

/// Start `app` and wait until it is ready.
pub async fn start(config: ServeConfig, app: Router) -> (LifecycleHandle, Shutdown) {
    let shutdown = Shutdown::new();
    let handle = LifecycleManager::new(config, shutdown.clone())
        .start(app)
        .await
        .expect("server should start");
    handle.ready().await;
    (handle, shutdown)
}

/// Client that never pools, proxies or follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

pub fn url(handle: &LifecycleHandle, path: &str) -> String {
    format!("http://{}{}", handle.local_addr(), path)
}
