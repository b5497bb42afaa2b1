//! # Data channel
//!
//! Passive data connections negotiated with EPSV (RFC 2428)

use crate::config::FtpClientConfiguration;
use crate::regex::EPSV_PORT_RE;
use crate::resolver::DnsResolver;
use crate::transport::Transport;
use crate::types::Response;
use crate::{FtpError, FtpResult};

/// Extract the data port from a `229 Entering Extended Passive Mode (|||port|)` reply
pub fn parse_epsv_port(response: &Response) -> FtpResult<u16> {
    let caps = EPSV_PORT_RE.captures(response.message()).ok_or_else(|| {
        FtpError::PassiveNegotiationError(format!("no port in EPSV reply: {response}"))
    })?;
    caps[1].parse::<u16>().map_err(|_| {
        FtpError::PassiveNegotiationError(format!("invalid port in EPSV reply: {response}"))
    })
}

/// Open the TCP connection announced by an EPSV reply.
///
/// The server host is the configured one, resolved again for the data port.
pub async fn connect(
    resolver: &dyn DnsResolver,
    config: &FtpClientConfiguration,
    epsv: &Response,
) -> FtpResult<Transport> {
    let port = parse_epsv_port(epsv)?;
    trace!("Got port number from EPSV: {port}");
    let addr = resolver.resolve(&config.host, port, config.ip_version).await?;
    debug!("Opening data connection to {addr}");
    let mut data = Transport::new();
    data.connect(addr, config.timeout()).await?;
    Ok(data)
}
