//! TLS configuration and certificate loading.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;
use crate::error::Error;

/// Load the rustls configuration named by `config`.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, Error> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);

    for (what, path) in [("Certificate", cert_path), ("Private key", key_path)] {
        if !path.exists() {
            return Err(Error::Tls(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{what} file not found: {}", path.display()),
            )));
        }
    }

    let tls = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(Error::Tls)?;
    tracing::info!(cert = %cert_path.display(), "TLS configuration loaded");
    Ok(tls)
}
