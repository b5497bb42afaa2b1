//! # Resolver
//!
//! Turns the configured host into the socket address the client connects to

use std::net::{IpAddr, SocketAddr};

use async_std::net::ToSocketAddrs;
use async_trait::async_trait;

use crate::config::IpVersion;
use crate::{FtpError, FtpResult};

/// Resolves `host:port` for the requested address family.
///
/// The client resolves the configured host for the control connection and again
/// for every passive data connection.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16, ip_version: IpVersion) -> FtpResult<SocketAddr>;
}

/// Default resolver backed by the system lookup
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16, ip_version: IpVersion) -> FtpResult<SocketAddr> {
        let host = strip_uri(host);
        if let Some(addr) = parse_literal(host, port) {
            trace!("{host} is an IP literal: {addr}");
            return Ok(addr);
        }
        debug!("Resolving {host}:{port} ({ip_version:?})");
        let candidates = (host, port)
            .to_socket_addrs()
            .await
            .map_err(|err| FtpError::ResolutionError {
                host: host.to_string(),
                reason: err.to_string(),
            })?;
        candidates
            .into_iter()
            .find(|addr| matches_version(addr, ip_version))
            .ok_or_else(|| FtpError::ResolutionError {
                host: host.to_string(),
                reason: format!("no {ip_version:?} address found"),
            })
    }
}

/// Accept `ftp://host/` and `ftps://host/path` as host
fn strip_uri(host: &str) -> &str {
    let host = host.trim();
    let host = host
        .strip_prefix("ftp://")
        .or_else(|| host.strip_prefix("ftps://"))
        .unwrap_or(host);
    match host.find('/') {
        Some(index) => &host[..index],
        None => host,
    }
}

/// IP literals, optionally bracketed or carrying their own port
fn parse_literal(host: &str, port: u16) -> Option<SocketAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some(SocketAddr::new(ip, port));
    }
    if let Ok(addr) = host.parse::<SocketAddr>() {
        return Some(addr);
    }
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .and_then(|h| h.parse::<IpAddr>().ok())
        .map(|ip| SocketAddr::new(ip, port))
}

/// The host name presented during TLS handshakes
pub(crate) fn domain_name(host: &str) -> &str {
    let host = strip_uri(host);
    host.strip_prefix('[')
        .and_then(|h| h.split_once(']'))
        .map(|(h, _)| h)
        .unwrap_or(host)
}

fn matches_version(addr: &SocketAddr, ip_version: IpVersion) -> bool {
    match ip_version {
        IpVersion::V4 => addr.is_ipv4(),
        IpVersion::V6 => addr.is_ipv6(),
    }
}
