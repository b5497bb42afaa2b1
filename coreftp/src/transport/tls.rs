//! # Tls
//!
//! Tls wrappers

use std::fmt::Debug;
use std::pin::Pin;

use async_native_tls::{Identity, Protocol, TlsStream as NativeTlsStreamInner};
use async_std::io::{Read, Write};
use async_std::net::TcpStream;
use async_trait::async_trait;
use pin_project::pin_project;

use crate::config::{ClientCertificate, FtpClientConfiguration, TlsVersion};
use crate::{FtpError, FtpResult};

/// Handshake policy shared by the control and the data channel
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    /// Accept any certificate and host name
    pub ignore_certificate_errors: bool,
    pub client_certificate: Option<ClientCertificate>,
    /// Allowed versions; empty means the backend defaults
    pub protocols: Vec<TlsVersion>,
}

impl From<&FtpClientConfiguration> for TlsSettings {
    fn from(config: &FtpClientConfiguration) -> Self {
        Self {
            ignore_certificate_errors: config.ignore_certificate_errors,
            client_certificate: config.client_certificate.clone(),
            protocols: config.tls_protocols.clone(),
        }
    }
}

#[async_trait]
pub trait TlsConnector: Debug + Send + Sync {
    async fn connect(&self, domain: &str, stream: TcpStream) -> FtpResult<Box<dyn TlsStream>>;
}

pub trait TlsStream: Debug + Read + Write + Unpin + Send {
    /// Get ref to underlying tcp stream
    fn get_ref(&self) -> &TcpStream;
}

#[derive(Debug)]
/// A Wrapper for the native-tls connector
pub struct NativeTlsConnector {
    connector: async_native_tls::TlsConnector,
}

impl NativeTlsConnector {
    pub fn new(settings: &TlsSettings) -> FtpResult<Self> {
        let mut connector = async_native_tls::TlsConnector::new();
        if settings.ignore_certificate_errors {
            debug!("TLS certificate and hostname validation disabled");
            connector = connector
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        if let Some(certificate) = settings.client_certificate.as_ref() {
            let identity = Identity::from_pkcs12(&certificate.pkcs12, &certificate.password)
                .map_err(|e| FtpError::TlsError(format!("invalid client certificate: {e}")))?;
            connector = connector.identity(identity);
        }
        let (min, max) = protocol_bounds(&settings.protocols);
        connector = connector.min_protocol_version(min).max_protocol_version(max);

        Ok(Self { connector })
    }
}

/// native-tls has no TLS 1.3 bound: a list reaching 1.3 leaves the maximum open,
/// and a 1.3-only list floors at 1.2.
fn protocol_bounds(protocols: &[TlsVersion]) -> (Option<Protocol>, Option<Protocol>) {
    let to_protocol = |version: &TlsVersion| match version {
        TlsVersion::Tls10 => Protocol::Tlsv10,
        TlsVersion::Tls11 => Protocol::Tlsv11,
        TlsVersion::Tls12 | TlsVersion::Tls13 => Protocol::Tlsv12,
    };
    let min = protocols.iter().min().map(to_protocol);
    let max = match protocols.iter().max() {
        Some(TlsVersion::Tls13) | None => None,
        Some(version) => Some(to_protocol(version)),
    };
    (min, max)
}

#[async_trait]
impl TlsConnector for NativeTlsConnector {
    async fn connect(&self, domain: &str, stream: TcpStream) -> FtpResult<Box<dyn TlsStream>> {
        self.connector
            .connect(domain, stream)
            .await
            .map(|stream| Box::new(NativeTlsStream::from(stream)) as Box<dyn TlsStream>)
            .map_err(|e| FtpError::TlsError(e.to_string()))
    }
}

#[derive(Debug)]
#[pin_project(project = NativeTlsStreamProj)]
pub struct NativeTlsStream {
    #[pin]
    stream: NativeTlsStreamInner<TcpStream>,
}

impl From<NativeTlsStreamInner<TcpStream>> for NativeTlsStream {
    fn from(stream: NativeTlsStreamInner<TcpStream>) -> Self {
        Self { stream }
    }
}

impl Read for NativeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut [u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        self.project().stream.poll_read(cx, buf)
    }
}

impl Write for NativeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        self.project().stream.poll_write(cx, buf)
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        self.project().stream.poll_flush(cx)
    }

    fn poll_close(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        self.project().stream.poll_close(cx)
    }
}

impl TlsStream for NativeTlsStream {
    fn get_ref(&self) -> &TcpStream {
        self.stream.get_ref()
    }
}
