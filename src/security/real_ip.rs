//! Client identity extraction for rate limit keys.
//!
//! # Responsibilities
//! - Derive a stable client key from a request
//! - Prefer proxy-reported client addresses over the socket peer
//!
//! # Design Decisions
//! - Private, loopback and link-local addresses are never used as the key
//! - Right-most public X-Forwarded-For entry wins: it is the hop closest to us
//! - Returned keys never carry a port

use std::net::{IpAddr, SocketAddr};

use axum::{body::Body, extract::ConnectInfo, http::Request};

/// Headers set by well-known proxies and CDNs, in order of preference.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "fly-client-ip",
    "x-azure-socketip",
    "x-real-ip",
];

const UNKNOWN: &str = "unknown";

/// Key a request by the socket peer's IP address.
pub fn peer_ip(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Key a request by the client address reported by upstream proxies.
///
/// Falls back to [`peer_ip`] when no header carries a public address.
pub fn real_ip(req: &Request<Body>) -> String {
    let headers = req.headers();

    for name in CLIENT_IP_HEADERS {
        let ip = headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(public_ip);
        if let Some(ip) = ip {
            return ip.to_string();
        }
    }

    // Proxies append to the header, so only the last instance is trusted.
    if let Some(xff) = headers
        .get_all("x-forwarded-for")
        .iter()
        .last()
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = xff.rsplit(',').find_map(public_ip) {
            return ip.to_string();
        }
    }

    peer_ip(req)
}

fn public_ip(raw: &str) -> Option<IpAddr> {
    let ip = parse_ip(raw.trim())?;
    if is_private(&ip) {
        None
    } else {
        Some(ip)
    }
}

/// Accepts bare addresses as well as `ip:port` and `[v6]:port`.
fn parse_ip(s: &str) -> Option<IpAddr> {
    s.parse::<IpAddr>()
        .ok()
        .or_else(|| s.parse::<SocketAddr>().ok().map(|a| a.ip()))
}

fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                // 100.64.0.0/10 carrier-grade NAT
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link local
                || v6.to_ipv4_mapped().map(|v4| is_private(&IpAddr::V4(v4))).unwrap_or(false)
        }
    }
}
