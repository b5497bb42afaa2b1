//! # Client
//!
//! The public entry point of the library

use async_std::sync::Mutex;

use crate::config::{EncryptionType, FtpClientConfiguration};
use crate::control::ControlChannel;
use crate::list::DirectoryEntry;
use crate::resolver::{self, DnsResolver, SystemResolver};
use crate::session::{ConnectionPhase, ConnectionState, Session};
use crate::stream::TransferStream;
use crate::transport::{NativeTlsConnector, TlsConnector, TlsSettings};
use crate::types::{Encoding, Features, Response, TransferMode};
use crate::{FtpError, FtpResult};

/// An FTP/FTPS client.
///
/// Every method takes `&self`: the client can be shared between tasks, and
/// operations are admitted one at a time. While a [`TransferStream`] is open,
/// every other operation waits for it to be closed or dropped.
///
/// ```rust,no_run
/// use coreftp::{FtpClient, FtpClientConfiguration};
///
/// # async_std::task::block_on(async {
/// let client = FtpClient::new(
///     FtpClientConfiguration::new("ftp.example.com").with_credentials("test", "test"),
/// )
/// .unwrap();
/// client.login().await.unwrap();
/// for entry in client.list_all().await.unwrap() {
///     println!("{} ({} bytes)", entry.name(), entry.size());
/// }
/// client.logout().await;
/// # });
/// ```
pub struct FtpClient {
    pub(crate) config: FtpClientConfiguration,
    pub(crate) resolver: Box<dyn DnsResolver>,
    tls: Option<Box<dyn TlsConnector>>,
    state: Mutex<ConnectionState>,
    pub(crate) control: ControlChannel,
}

impl FtpClient {
    /// Create a disconnected client. Fails if the TLS settings are invalid.
    pub fn new(config: FtpClientConfiguration) -> FtpResult<Self> {
        let tls: Option<Box<dyn TlsConnector>> = match config.encryption_type {
            EncryptionType::None => None,
            EncryptionType::Explicit | EncryptionType::Implicit => Some(Box::new(
                NativeTlsConnector::new(&TlsSettings::from(&config))?,
            )),
        };
        Ok(Self {
            state: Mutex::new(ConnectionState::new(&config.host, config.port)),
            config,
            resolver: Box::new(SystemResolver),
            tls,
            control: ControlChannel::new(),
        })
    }

    /// Replace the system resolver
    pub fn with_resolver(mut self, resolver: impl DnsResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replace the native-tls connector
    pub fn with_tls_connector(mut self, connector: impl TlsConnector + 'static) -> Self {
        self.tls = Some(Box::new(connector));
        self
    }

    pub fn configuration(&self) -> &FtpClientConfiguration {
        &self.config
    }

    pub(crate) async fn session(&self) -> Session<'_> {
        Session::new(self, self.state.lock().await)
    }

    pub(crate) fn tls_connector(&self) -> FtpResult<&dyn TlsConnector> {
        self.tls
            .as_deref()
            .ok_or_else(|| FtpError::TlsError("no TLS connector configured".to_string()))
    }

    pub(crate) fn domain(&self) -> &str {
        resolver::domain_name(&self.config.host)
    }

    // -- connection

    /// Connect and log in.
    ///
    /// Logs out first if already connected. Encryption is set up as configured,
    /// features are queried, and the session moves to the base directory,
    /// creating it when missing.
    pub async fn login(&self) -> FtpResult<()> {
        self.session().await.login().await
    }

    /// Send QUIT and disconnect. Does nothing when not connected.
    pub async fn logout(&self) {
        self.session().await.logout().await
    }

    // -- directories

    /// Change the working directory
    pub async fn change_directory(&self, path: &str) -> FtpResult<()> {
        self.session().await.change_directory(path).await
    }

    /// Create a directory and all its missing parents
    pub async fn create_directory(&self, path: &str) -> FtpResult<()> {
        self.session().await.create_directory(path).await
    }

    /// Delete a directory, with its content
    pub async fn delete_directory(&self, path: &str) -> FtpResult<()> {
        self.session().await.delete_directory(path).await
    }

    // -- files

    pub async fn delete_file(&self, name: &str) -> FtpResult<()> {
        self.session().await.delete_file(name).await
    }

    pub async fn rename(&self, from: &str, to: &str) -> FtpResult<()> {
        self.session().await.rename(from, to).await
    }

    /// Announce the client name with CLNT
    pub async fn set_client_name(&self, name: &str) -> FtpResult<Response> {
        self.session().await.set_client_name(name).await
    }

    /// Size of a file in bytes, as reported by SIZE
    pub async fn get_file_size(&self, name: &str) -> FtpResult<u64> {
        self.session().await.get_file_size(name).await
    }

    pub async fn set_transfer_mode(
        &self,
        mode: TransferMode,
        second_type: Option<char>,
    ) -> FtpResult<()> {
        self.session()
            .await
            .set_transfer_mode(mode, second_type)
            .await
    }

    /// Start downloading a file
    pub async fn open_read_stream(&self, name: &str) -> FtpResult<TransferStream<'_>> {
        self.session().await.open_read_stream(name).await
    }

    /// Start uploading a file. Missing parent directories are created.
    pub async fn open_write_stream(&self, name: &str) -> FtpResult<TransferStream<'_>> {
        self.session().await.open_write_stream(name).await
    }

    // -- listing

    /// Every entry of the working directory
    pub async fn list_all(&self) -> FtpResult<Vec<DirectoryEntry>> {
        self.session().await.list_all().await
    }

    pub async fn list_files(&self) -> FtpResult<Vec<DirectoryEntry>> {
        let entries = self.list_all().await?;
        Ok(entries.into_iter().filter(|e| e.is_file()).collect())
    }

    pub async fn list_directories(&self) -> FtpResult<Vec<DirectoryEntry>> {
        let entries = self.list_all().await?;
        Ok(entries.into_iter().filter(|e| e.is_directory()).collect())
    }

    /// Names in the working directory, from NLST
    pub async fn name_list(&self) -> FtpResult<Vec<String>> {
        self.session().await.name_list().await
    }

    // -- state

    pub async fn working_directory(&self) -> String {
        self.session().await.state().working_directory.clone()
    }

    pub async fn features(&self) -> Features {
        self.session().await.state().features.clone()
    }

    /// The banner sent by the server on connect
    pub async fn welcome_message(&self) -> Option<String> {
        self.session().await.state().welcome_message.clone()
    }

    pub async fn phase(&self) -> ConnectionPhase {
        self.session().await.state().phase
    }

    /// Encoding of the control channel and listings; UTF-8 once the server advertises it
    pub async fn encoding(&self) -> Encoding {
        self.session().await.state().encoding
    }

    pub async fn is_authenticated(&self) -> bool {
        self.phase().await == ConnectionPhase::Authenticated && self.is_connected().await
    }

    /// Best-effort liveness of the control connection
    pub async fn is_connected(&self) -> bool {
        self.control.lock().await.is_connected().await
    }

    pub async fn is_encrypted(&self) -> bool {
        self.control.lock().await.is_encrypted()
    }
}
