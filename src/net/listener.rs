//! TCP listener binding for the primary and redirect sockets.
//!
//! # Responsibilities
//! - Normalize configured addresses (`*:443`, `:443`, bare hosts)
//! - Bind the primary listener; failure is fatal
//! - Bind the optional plaintext redirect listener; failure is a warning
//! - Print remediation guidance for privileged-port permission errors

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::ListenerConfig;
use crate::error::Error;

/// Port assumed when the configured address has none.
pub const DEFAULT_PORT: u16 = 443;

/// Port the redirect listener uses unless configured otherwise.
pub const REDIRECT_PORT: u16 = 80;

/// A configured address split into the parts binding needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAddress {
    pub host: String,
    pub port: u16,
}

impl BindAddress {
    /// Parse an address, accepting the `*:port` and `:port` shorthands for
    /// "all interfaces" and a bare host for port 443.
    pub fn parse(addr: &str) -> Self {
        let addr = addr.trim();
        let addr = addr.strip_prefix('*').unwrap_or(addr);

        if let Ok(sock) = addr.parse::<SocketAddr>() {
            return Self {
                host: sock.ip().to_string(),
                port: sock.port(),
            };
        }

        let (host, port) = match addr.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
                match port.parse::<u16>() {
                    Ok(port) => (host, port),
                    Err(_) => (addr, DEFAULT_PORT),
                }
            }
            _ => (addr, DEFAULT_PORT),
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');
        Self {
            host: if host.is_empty() {
                "0.0.0.0".to_string()
            } else {
                host.to_string()
            },
            port,
        }
    }

    /// Same host, different port.
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            host: self.host.clone(),
            port,
        }
    }

    /// `host:port` form suitable for [`TcpListener::bind`].
    pub fn to_bind_string(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// The sockets a server listens on.
///
/// The secondary listener only exists when redirects were requested and its
/// bind succeeded.
#[derive(Debug)]
pub struct ListenerSet {
    primary: TcpListener,
    primary_addr: SocketAddr,
    secondary: Option<(TcpListener, SocketAddr)>,
}

impl ListenerSet {
    /// Bind the configured listeners.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, Error> {
        let primary_bind = BindAddress::parse(&config.bind_address);
        let address = primary_bind.to_bind_string();

        let primary = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(source) => {
                tracing::error!(address = %address, error = %source, "Failed to bind primary listener");
                if source.kind() == io::ErrorKind::PermissionDenied {
                    eprintln!(
                        "\nPermission denied to bind to port {}; on Linux, try:\n    {}",
                        primary_bind.port,
                        setcap_hint()
                    );
                }
                return Err(Error::Bind { address, source });
            }
        };
        let primary_addr = primary
            .local_addr()
            .map_err(|source| Error::Bind { address: address.clone(), source })?;

        tracing::info!(address = %primary_addr, tls = config.tls.is_some(), "Listener bound");

        let secondary = if config.redirect {
            let redirect_bind = match &config.redirect_address {
                Some(addr) => BindAddress::parse(addr),
                None => primary_bind.with_port(REDIRECT_PORT),
            };
            bind_secondary(&redirect_bind, primary_addr.port()).await
        } else {
            None
        };

        Ok(Self {
            primary,
            primary_addr,
            secondary,
        })
    }

    /// Address the primary listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.primary_addr
    }

    /// Address of the redirect listener, if one is bound.
    pub fn redirect_addr(&self) -> Option<SocketAddr> {
        self.secondary.as_ref().map(|(_, addr)| *addr)
    }

    pub fn into_parts(self) -> (TcpListener, Option<TcpListener>) {
        (self.primary, self.secondary.map(|(listener, _)| listener))
    }
}

async fn bind_secondary(bind: &BindAddress, target_port: u16) -> Option<(TcpListener, SocketAddr)> {
    let address = bind.to_bind_string();
    let result = match TcpListener::bind(&address).await {
        Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
        Err(e) => Err(e),
    };

    match result {
        Ok((listener, addr)) => {
            tracing::info!(address = %addr, target_port, "Redirect listener bound");
            Some((listener, addr))
        }
        Err(e) => {
            tracing::warn!(
                address = %address,
                error = %e,
                "Not setting up redirect listener"
            );
            if e.kind() == io::ErrorKind::PermissionDenied {
                eprintln!(
                    "WARNING: No permission to bind to port {}, not setting up port {} → {} redirect",
                    bind.port, bind.port, target_port
                );
                eprintln!("WARNING: On Linux, try: {}", setcap_hint());
            }
            None
        }
    }
}

fn setcap_hint() -> String {
    let exe = std::env::current_exe()
        .map(|p| p.display().to_string())
        .or_else(|_| std::env::args().next().ok_or(()))
        .unwrap_or_else(|_| "<binary>".to_string());
    format!("sudo setcap 'cap_net_bind_service=+ep' {exe}")
}
