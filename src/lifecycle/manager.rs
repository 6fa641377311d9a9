//! Startup and shutdown orchestration.
//!
//! # Responsibilities
//! - Bind the listener set and launch the serving tasks
//! - Publish readiness once serving can begin
//! - Translate the first shutdown trigger into a graceful drain
//! - Publish completion once the primary socket is closed
//!
//! # Design Decisions
//! - Fail fast: primary bind and TLS errors abort startup
//! - Serving tasks wait for `Listening` before accepting
//! - One `axum_server::Handle` drains and force-closes both plaintext and TLS
//! - Shutdown errors are logged; `Stopped` is always reached

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use crate::config::ServeConfig;
use crate::error::Error;
use crate::http::{self, redirect};
use crate::lifecycle::state::StateCell;
use crate::lifecycle::{LifecycleState, Shutdown};
use crate::net::{tls::load_tls_config, ListenerSet};

/// Extra time the supervisor allows past the drain deadline before aborting.
const FORCE_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Drives a server from `Created` to `Stopped`.
pub struct LifecycleManager {
    config: ServeConfig,
    shutdown: Shutdown,
    state: StateCell,
}

impl LifecycleManager {
    pub fn new(config: ServeConfig, shutdown: Shutdown) -> Self {
        Self {
            config,
            shutdown,
            state: StateCell::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Observe state transitions, including those before [`start`](Self::start) returns.
    pub fn watch_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Bind the listeners and start serving `app`.
    ///
    /// Returns once the server is `Listening`. An error means nothing is
    /// being served and the state stays `Created`.
    pub async fn start(self, app: Router) -> Result<LifecycleHandle, Error> {
        let Self {
            config,
            shutdown,
            state,
        } = self;

        let tls = match &config.listener.tls {
            Some(tls) => Some(load_tls_config(tls).await?),
            None => None,
        };

        let listeners = ListenerSet::bind(&config.listener).await?;
        let local_addr = listeners.local_addr();
        let redirect_addr = listeners.redirect_addr();
        let drain = config.timeouts.drain();

        let app = http::wrap(app, &config.timeouts);
        let (primary, secondary) = listeners.into_parts();

        let serve_task = tokio::spawn(serve_primary(
            primary,
            app,
            tls,
            shutdown.clone(),
            drain,
            state.subscribe(),
        ));
        let redirect_task = secondary.map(|listener| {
            tokio::spawn(serve_redirect(listener, local_addr.port(), state.subscribe()))
        });

        state.advance(LifecycleState::Listening);

        tokio::spawn(supervise(
            serve_task,
            redirect_task,
            shutdown.clone(),
            state.clone(),
            drain,
        ));

        if let Some(secs) = config.lifecycle.test_mode_secs {
            tracing::warn!(secs, "Test mode: shutting down automatically");
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                        shutdown.trigger("test_mode");
                    }
                    _ = shutdown.triggered() => {}
                }
            });
        }

        Ok(LifecycleHandle {
            state: state.subscribe(),
            shutdown,
            local_addr,
            redirect_addr,
        })
    }
}

/// Cheap, cloneable view of a running server.
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    state: watch::Receiver<LifecycleState>,
    shutdown: Shutdown,
    local_addr: SocketAddr,
    redirect_addr: Option<SocketAddr>,
}

impl LifecycleHandle {
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Address the primary listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address of the redirect listener, if it could be bound.
    pub fn redirect_addr(&self) -> Option<SocketAddr> {
        self.redirect_addr
    }

    /// Resolves once the server has reached `Listening` (or any later state).
    pub async fn ready(&self) {
        self.reached(LifecycleState::Listening).await
    }

    /// Resolves once the server has reached `Stopped`.
    pub async fn stopped(&self) {
        self.reached(LifecycleState::Stopped).await
    }

    /// Request a graceful shutdown. Returns `true` if this call triggered it.
    pub fn stop(&self) -> bool {
        self.shutdown.trigger("stop")
    }

    async fn reached(&self, target: LifecycleState) {
        let mut rx = self.state.clone();
        // The sender is only dropped after the final transition.
        let _ = rx.wait_for(|s| *s >= target).await;
    }
}

async fn serve_primary(
    listener: TcpListener,
    app: Router,
    tls: Option<RustlsConfig>,
    shutdown: Shutdown,
    drain: Duration,
    mut state: watch::Receiver<LifecycleState>,
) -> io::Result<()> {
    let _ = state.wait_for(|s| *s >= LifecycleState::Listening).await;
    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    let listener = listener.into_std()?;

    // Connections still open `drain` after the trigger are closed by the handle.
    let handle = axum_server::Handle::new();
    let trigger = handle.clone();
    tokio::spawn(async move {
        shutdown.triggered().await;
        trigger.graceful_shutdown(Some(drain));
        tokio::time::sleep(drain).await;
        let open = trigger.connection_count();
        if open > 0 {
            tracing::warn!(
                open,
                drain_secs = drain.as_secs(),
                "Drain deadline exceeded, dropping remaining connections"
            );
        }
    });

    match tls {
        None => {
            axum_server::from_tcp(listener)
                .handle(handle)
                .serve(service)
                .await
        }
        Some(tls) => {
            axum_server::from_tcp_rustls(listener, tls)
                .handle(handle)
                .serve(service)
                .await
        }
    }
}

async fn serve_redirect(
    listener: TcpListener,
    https_port: u16,
    mut state: watch::Receiver<LifecycleState>,
) {
    let _ = state.wait_for(|s| *s >= LifecycleState::Listening).await;
    if let Err(e) = axum::serve(listener, redirect::router(https_port)).await {
        tracing::warn!(error = %e, "Redirect listener stopped");
    }
}

async fn supervise(
    mut serve_task: JoinHandle<io::Result<()>>,
    redirect_task: Option<JoinHandle<()>>,
    shutdown: Shutdown,
    state: StateCell,
    drain: Duration,
) {
    tokio::select! {
        biased;
        _ = shutdown.triggered() => {
            state.advance(LifecycleState::ShuttingDown);
            match tokio::time::timeout(drain + FORCE_CLOSE_GRACE, &mut serve_task).await {
                Ok(result) => log_serve_result(result),
                Err(_) => {
                    tracing::error!(
                        drain_secs = drain.as_secs(),
                        "Primary server ignored the drain deadline, aborting"
                    );
                    serve_task.abort();
                    let _ = serve_task.await;
                }
            }
        }
        result = &mut serve_task => {
            tracing::error!("Primary server exited before shutdown was requested");
            log_serve_result(result);
            shutdown.trigger("server_exit");
            state.advance(LifecycleState::ShuttingDown);
        }
    }

    if let Some(task) = redirect_task {
        task.abort();
    }
    state.advance(LifecycleState::Stopped);
}

fn log_serve_result(result: Result<io::Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => tracing::info!("Primary server stopped accepting connections"),
        Ok(Err(e)) => {
            let err = Error::Shutdown(e);
            tracing::error!(error = %err, "Primary server reported an error");
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => tracing::error!(error = %e, "Primary server task panicked"),
    }
}
