//! # Configuration
//!
//! Connection settings for an [`FtpClient`](crate::FtpClient)

use std::time::Duration;

use crate::types::TransferMode;

/// Default control port
pub const DEFAULT_PORT: u16 = 21;
/// Default timeout applied to every blocking read, connect and handshake
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
/// User sent when no username is configured
pub const ANONYMOUS_USER: &str = "anonymous";

/// How the control channel is encrypted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionType {
    /// Plain FTP
    #[default]
    None,
    /// TLS from the first byte (usually port 990)
    Implicit,
    /// Plaintext connect, then `AUTH TLS`
    Explicit,
}

/// Address family used when resolving the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpVersion {
    #[default]
    V4,
    V6,
}

/// TLS protocol versions which may be negotiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    Tls10,
    Tls11,
    Tls12,
    Tls13,
}

/// Client identity presented during the TLS handshake, as a PKCS#12 archive
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub pkcs12: Vec<u8>,
    pub password: String,
}

impl std::fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("pkcs12", &format_args!("{} bytes", self.pkcs12.len()))
            .finish_non_exhaustive()
    }
}

/// Client configuration.
///
/// Build it with [`FtpClientConfiguration::new`] and the `with_*` methods:
///
/// ```rust
/// use coreftp::{EncryptionType, FtpClientConfiguration};
///
/// let config = FtpClientConfiguration::new("ftp.example.com")
///     .with_credentials("test", "test")
///     .with_encryption(EncryptionType::Explicit)
///     .with_base_directory("uploads/incoming");
/// assert_eq!(config.base_directory(), "/uploads/incoming");
/// ```
#[derive(Debug, Clone)]
pub struct FtpClientConfiguration {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    base_directory: String,
    pub timeout_seconds: u64,
    pub transfer_mode: TransferMode,
    pub second_type: Option<char>,
    pub encryption_type: EncryptionType,
    pub ignore_certificate_errors: bool,
    pub client_certificate: Option<ClientCertificate>,
    pub tls_protocols: Vec<TlsVersion>,
    pub ip_version: IpVersion,
}

impl Default for FtpClientConfiguration {
    fn default() -> Self {
        Self {
            host: String::default(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            base_directory: String::from("/"),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            transfer_mode: TransferMode::Binary,
            second_type: None,
            encryption_type: EncryptionType::None,
            ignore_certificate_errors: false,
            client_certificate: None,
            tls_protocols: Vec::new(),
            ip_version: IpVersion::V4,
        }
    }
}

impl FtpClientConfiguration {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the directory the session starts in; it is created on login when missing
    pub fn with_base_directory(mut self, directory: impl AsRef<str>) -> Self {
        self.base_directory = normalize_base_directory(directory.as_ref());
        self
    }

    /// Set the timeout in seconds; `0` disables it
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_transfer_mode(mut self, mode: TransferMode, second_type: Option<char>) -> Self {
        self.transfer_mode = mode;
        self.second_type = second_type;
        self
    }

    pub fn with_encryption(mut self, encryption: EncryptionType) -> Self {
        self.encryption_type = encryption;
        self
    }

    pub fn ignore_certificate_errors(mut self, ignore: bool) -> Self {
        self.ignore_certificate_errors = ignore;
        self
    }

    pub fn with_client_certificate(mut self, certificate: ClientCertificate) -> Self {
        self.client_certificate = Some(certificate);
        self
    }

    pub fn with_tls_protocols(mut self, protocols: impl IntoIterator<Item = TlsVersion>) -> Self {
        self.tls_protocols = protocols.into_iter().collect();
        self
    }

    pub fn with_ip_version(mut self, ip_version: IpVersion) -> Self {
        self.ip_version = ip_version;
        self
    }

    /// Base directory, always rooted at `/`
    pub fn base_directory(&self) -> &str {
        &self.base_directory
    }

    /// The timeout as a duration; `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Username to send, falling back to anonymous login
    pub(crate) fn login_user(&self) -> &str {
        match self.username.as_deref() {
            Some(user) if !user.trim().is_empty() => user,
            _ => ANONYMOUS_USER,
        }
    }

    /// Password to send; anonymous logins send an empty one
    pub(crate) fn login_password(&self) -> &str {
        match self.username.as_deref() {
            Some(user) if !user.trim().is_empty() => self.password.as_deref().unwrap_or_default(),
            _ => "",
        }
    }
}

fn normalize_base_directory(directory: &str) -> String {
    format!("/{}", directory.trim().trim_start_matches('/'))
}
