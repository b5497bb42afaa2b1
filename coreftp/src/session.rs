//! # Session
//!
//! The protocol engine. A `Session` holds the client gate for a whole command
//! sequence, so the commands of one operation never interleave with another's.

use std::future::Future;
use std::pin::Pin;

use async_std::sync::MutexGuard;

use crate::client::FtpClient;
use crate::command::feat::parse_features;
use crate::command::{Command, ProtectionLevel};
use crate::config::EncryptionType;
use crate::list::{self, DirectoryEntry, ListingStrategy};
use crate::status::{ReplyClass, Status};
use crate::stream::TransferStream;
use crate::transport::Transport;
use crate::types::{Encoding, Features, Response, TransferMode, TransferType};
use crate::{data_channel, FtpError, FtpResult};

/// Lifecycle of the control connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Authenticated,
}

/// Everything the engine knows about the current connection
#[derive(Debug, Clone)]
pub(crate) struct ConnectionState {
    pub host: String,
    pub port: u16,
    pub working_directory: String,
    pub phase: ConnectionPhase,
    pub features: Features,
    pub encoding: Encoding,
    pub listing_strategy: ListingStrategy,
    pub welcome_message: Option<String>,
    /// A transfer was abandoned before its final reply was read
    pub pending_reply: bool,
}

impl ConnectionState {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            working_directory: String::from("/"),
            phase: ConnectionPhase::Disconnected,
            features: Features::new(),
            encoding: Encoding::default(),
            listing_strategy: ListingStrategy::default(),
            welcome_message: None,
            pending_reply: false,
        }
    }
}

pub(crate) struct Session<'a> {
    client: &'a FtpClient,
    state: MutexGuard<'a, ConnectionState>,
}

impl<'a> Session<'a> {
    pub fn new(client: &'a FtpClient, state: MutexGuard<'a, ConnectionState>) -> Self {
        Self { client, state }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Mark the final reply of a transfer opened with `opening` as still owed
    /// by the server
    pub fn abandon_reply_of(&mut self, opening: &Response) {
        if opening.status() != Status::ClosingData {
            self.state.pending_reply = true;
        }
    }

    // -- connection

    /// Connect, secure and authenticate, then move to the base directory.
    ///
    /// Any failure after the connection is established logs out before the
    /// error is returned.
    pub async fn login(&mut self) -> FtpResult<()> {
        if self.is_connected().await {
            debug!("Already connected; logging out first");
            self.logout().await;
        }
        let client = self.client;
        let config = &client.config;
        *self.state = ConnectionState::new(&config.host, config.port);
        self.state.phase = ConnectionPhase::Connecting;
        info!("Connecting to {}:{}", config.host, config.port);
        let connected = match client
            .resolver
            .resolve(&config.host, config.port, config.ip_version)
            .await
        {
            Ok(addr) => client.control.lock().await.connect(addr, config.timeout()).await,
            Err(err) => Err(err),
        };
        if let Err(err) = connected {
            error!("Could not connect to {}: {err}", config.host);
            self.state.phase = ConnectionPhase::Disconnected;
            return Err(err);
        }
        self.state.phase = ConnectionPhase::Connected;
        match self.handshake().await {
            Ok(()) => {
                info!(
                    "Logged in as {} on {}:{}",
                    config.login_user(),
                    config.host,
                    config.port
                );
                Ok(())
            }
            Err(err) => {
                error!("Login failed: {err}");
                self.logout().await;
                Err(err)
            }
        }
    }

    async fn handshake(&mut self) -> FtpResult<()> {
        let client = self.client;
        let config = &client.config;
        if config.encryption_type == EncryptionType::Implicit {
            self.upgrade_control().await?;
        }
        let banner = self.read_reply().await?;
        if !banner.is_success() {
            return Err(FtpError::ProtocolError {
                command: None,
                response: banner,
            });
        }
        self.state.welcome_message = Some(banner.lines().join("\n"));
        if config.encryption_type == EncryptionType::Explicit {
            let response = self.execute(Command::Auth).await?;
            if !response.is_success() {
                return Err(protocol_error(&Command::Auth, response));
            }
            self.upgrade_control().await?;
        }
        self.authenticate().await?;
        self.state.phase = ConnectionPhase::Authenticated;
        if self.is_encrypted().await {
            self.expect(Command::Pbsz(0), &[Status::CommandOk]).await?;
            self.expect(
                Command::Prot(ProtectionLevel::Private),
                &[Status::CommandOk],
            )
            .await?;
        }
        self.load_features().await?;
        self.negotiate_encoding().await?;
        self.state.listing_strategy =
            match self.state.features.contains_key("MLSD") || self.state.features.contains_key("MLST") {
                true => ListingStrategy::Mlsd,
                false => ListingStrategy::List,
            };
        debug!("Listing strategy: {:?}", self.state.listing_strategy);
        self.set_transfer_mode(config.transfer_mode, config.second_type)
            .await?;
        self.state.working_directory = self.print_working_directory().await?;
        let base = config.base_directory();
        if base != "/" {
            self.create_directory(base).await?;
        }
        self.change_directory(base).await
    }

    async fn upgrade_control(&mut self) -> FtpResult<()> {
        let client = self.client;
        let connector = client.tls_connector()?;
        client
            .control
            .lock()
            .await
            .upgrade_to_tls(client.domain(), connector)
            .await
    }

    async fn authenticate(&mut self) -> FtpResult<()> {
        let client = self.client;
        let config = &client.config;
        debug!("Signing in with user '{}'", config.login_user());
        let response = self
            .execute(Command::User(config.login_user().to_string()))
            .await?;
        match response.status() {
            Status::LoggedInProceed => {
                debug!("No password required");
                return Ok(());
            }
            Status::SendPasswordCommand => {}
            _ => return Err(FtpError::AuthenticationError(response)),
        }
        let response = self
            .execute(Command::Pass(config.login_password().to_string()))
            .await?;
        match response.status() {
            Status::LoggedInProceed => Ok(()),
            _ => Err(FtpError::AuthenticationError(response)),
        }
    }

    async fn load_features(&mut self) -> FtpResult<()> {
        let response = self.execute(Command::Feat).await?;
        self.state.features = match response.class() {
            ReplyClass::PositiveCompletion => parse_features(response.lines()),
            ReplyClass::PermanentNegative => {
                debug!("Server does not support FEAT: {response}");
                Features::new()
            }
            _ => return Err(protocol_error(&Command::Feat, response)),
        };
        Ok(())
    }

    async fn negotiate_encoding(&mut self) -> FtpResult<()> {
        if self.state.features.contains_key("UTF8") && self.state.encoding == Encoding::Ascii {
            self.state.encoding = Encoding::Utf8;
            let response = self
                .execute(Command::Opts("UTF8".to_string(), Some("ON".to_string())))
                .await?;
            debug!("UTF-8 enabled: {response}");
        }
        Ok(())
    }

    /// Send QUIT and disconnect. The disconnect happens even if QUIT fails.
    pub async fn logout(&mut self) {
        if self.is_connected().await {
            info!("Logging out from {}", self.state.host);
            if let Err(err) = self.execute(Command::Quit).await {
                warn!("QUIT failed: {err}");
            }
        }
        self.client.control.lock().await.disconnect();
        self.state.phase = ConnectionPhase::Disconnected;
    }

    pub async fn is_connected(&self) -> bool {
        self.client.control.lock().await.is_connected().await
    }

    pub async fn is_encrypted(&self) -> bool {
        self.client.control.lock().await.is_encrypted()
    }

    async fn ensure_logged_in(&mut self) -> FtpResult<()> {
        if self.state.phase != ConnectionPhase::Authenticated {
            return Err(FtpError::NotLoggedIn);
        }
        if !self.is_connected().await {
            warn!("Control connection to {} was lost", self.state.host);
            self.state.phase = ConnectionPhase::Disconnected;
            return Err(FtpError::NotLoggedIn);
        }
        Ok(())
    }

    // -- directories

    /// `CWD` into `path`, then refresh the working directory from `PWD`
    pub async fn change_directory(&mut self, path: &str) -> FtpResult<()> {
        if path.trim().is_empty() || path == "." {
            return Err(FtpError::InvalidArgument(format!(
                "cannot change directory to '{path}'"
            )));
        }
        self.ensure_logged_in().await?;
        debug!("Changing working directory to {path}");
        self.expect(Command::Cwd(path.to_string()), &[Status::FileActionOk])
            .await?;
        self.state.working_directory = self.print_working_directory().await?;
        trace!("Working directory is now {}", self.state.working_directory);
        Ok(())
    }

    async fn print_working_directory(&mut self) -> FtpResult<String> {
        let response = self
            .expect(Command::Pwd, &[Status::PathnameCreated])
            .await?;
        match parse_quoted_path(response.message()) {
            Some(path) => Ok(path),
            None => Err(FtpError::BadResponse(response)),
        }
    }

    /// Create `path` and every missing parent.
    /// The working directory is restored afterwards, whatever the outcome.
    pub async fn create_directory(&mut self, path: &str) -> FtpResult<()> {
        self.ensure_logged_in().await?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Ok(());
        }
        debug!("Creating directory {path}");
        let original = self.state.working_directory.clone();
        let created = self.create_segments(path.starts_with('/'), &segments).await;
        let restored = self.change_directory(&original).await;
        created.and(restored)
    }

    async fn create_segments(&mut self, rooted: bool, segments: &[&str]) -> FtpResult<()> {
        if rooted {
            self.expect(Command::Cwd("/".to_string()), &[Status::FileActionOk])
                .await?;
        }
        if let [segment] = segments {
            let response = self.execute(Command::Mkd(segment.to_string())).await?;
            if !response.is_success() {
                debug!("MKD {segment} failed, assuming it exists: {response}");
            }
            return Ok(());
        }
        for segment in segments {
            let response = self.execute(Command::Cwd(segment.to_string())).await?;
            if response.status() != Status::FileUnavailable {
                trace!("{segment} exists");
                continue;
            }
            let response = self.execute(Command::Mkd(segment.to_string())).await?;
            trace!("MKD {segment}: {response}");
            self.expect(Command::Cwd(segment.to_string()), &[Status::FileActionOk])
                .await?;
        }
        Ok(())
    }

    /// Remove `path` with everything in it. Removing `/` does nothing.
    pub fn delete_directory<'b>(
        &'b mut self,
        path: &'b str,
    ) -> Pin<Box<dyn Future<Output = FtpResult<()>> + Send + 'b>> {
        Box::pin(async move {
            if path.trim().is_empty() {
                return Err(FtpError::InvalidArgument(
                    "cannot delete a directory without name".to_string(),
                ));
            }
            if path.chars().all(|c| c == '/') {
                debug!("Refusing to delete the root directory");
                return Ok(());
            }
            self.ensure_logged_in().await?;
            debug!("Deleting directory {path}");
            let command = Command::Rmd(path.to_string());
            let response = self.execute(command.clone()).await?;
            match response.status() {
                Status::FileActionOk | Status::CommandOk => return Ok(()),
                Status::FileUnavailable => {}
                _ => return Err(protocol_error(&command, response)),
            }
            debug!("{path} could not be removed; deleting its content");
            self.empty_directory(path).await?;
            self.expect(command, &[Status::FileActionOk, Status::CommandOk])
                .await?;
            Ok(())
        })
    }

    async fn empty_directory(&mut self, path: &str) -> FtpResult<()> {
        let original = self.state.working_directory.clone();
        self.change_directory(path).await?;
        let emptied = self.delete_children().await;
        let restored = self.change_directory(&original).await;
        emptied.and(restored)
    }

    async fn delete_children(&mut self) -> FtpResult<()> {
        for entry in self.list_all().await? {
            match entry.is_directory() {
                true => self.delete_directory(entry.name()).await?,
                false => self.delete_file(entry.name()).await?,
            }
        }
        Ok(())
    }

    // -- files

    pub async fn delete_file(&mut self, name: &str) -> FtpResult<()> {
        self.ensure_logged_in().await?;
        debug!("Deleting file {name}");
        self.expect(Command::Dele(name.to_string()), &[Status::FileActionOk])
            .await
            .map(|_| ())
    }

    pub async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        self.ensure_logged_in().await?;
        debug!("Renaming {from} to {to}");
        self.expect(
            Command::RenameFrom(from.to_string()),
            &[Status::FileActionPending],
        )
        .await?;
        self.expect(
            Command::RenameTo(to.to_string()),
            &[Status::FileActionOk, Status::ClosingData],
        )
        .await
        .map(|_| ())
    }

    /// Send CLNT; the reply is returned whatever its status
    pub async fn set_client_name(&mut self, name: &str) -> FtpResult<Response> {
        self.ensure_logged_in().await?;
        self.execute(Command::Clnt(name.to_string())).await
    }

    pub async fn get_file_size(&mut self, name: &str) -> FtpResult<u64> {
        self.ensure_logged_in().await?;
        let response = self
            .expect(Command::Size(name.to_string()), &[Status::FileStatus])
            .await?;
        match response.message().trim().parse::<u64>() {
            Ok(size) => Ok(size),
            Err(_) => Err(FtpError::BadResponse(response)),
        }
    }

    pub async fn set_transfer_mode(
        &mut self,
        mode: TransferMode,
        second_type: Option<char>,
    ) -> FtpResult<()> {
        self.ensure_logged_in().await?;
        self.expect(
            Command::Type(TransferType { mode, second_type }),
            &[Status::CommandOk],
        )
        .await
        .map(|_| ())
    }

    // -- data transfers

    pub async fn open_read_stream(mut self, name: &str) -> FtpResult<TransferStream<'a>> {
        self.ensure_logged_in().await?;
        debug!("Opening read stream for {name}");
        let command = Command::Retr(name.to_string());
        let (data, opening) = self.open_data_channel(command.clone()).await?;
        Ok(TransferStream::new(self, data, opening, command))
    }

    /// Open an upload stream, creating the parent directories of the target first
    pub async fn open_write_stream(mut self, name: &str) -> FtpResult<TransferStream<'a>> {
        self.ensure_logged_in().await?;
        let target = absolute_path(&self.state.working_directory, name);
        debug!("Opening write stream for {target}");
        if let Some(parent) = parent_directory(&target) {
            self.create_directory(parent).await?;
        }
        let command = Command::Store(target);
        let (data, opening) = self.open_data_channel(command.clone()).await?;
        Ok(TransferStream::new(self, data, opening, command))
    }

    /// Negotiate a passive connection and send `command` on the control channel.
    ///
    /// Returns the data transport with the preliminary reply. The data channel is
    /// encrypted when the control channel is.
    async fn open_data_channel(&mut self, command: Command) -> FtpResult<(Transport, Response)> {
        let epsv = self.execute(Command::Epsv).await?;
        if epsv.status() != Status::EnteringExtendedPassive {
            return Err(protocol_error(&Command::Epsv, epsv));
        }
        let client = self.client;
        let mut data = data_channel::connect(client.resolver.as_ref(), &client.config, &epsv).await?;
        let opening = self
            .expect(
                command,
                &[
                    Status::DataAlreadyOpen,
                    Status::OpeningData,
                    Status::ClosingData,
                ],
            )
            .await?;
        if self.is_encrypted().await {
            let secured = match client.tls_connector() {
                Ok(connector) => data.upgrade_to_tls(client.domain(), connector).await,
                Err(err) => Err(err),
            };
            if let Err(err) = secured {
                self.abandon_reply_of(&opening);
                return Err(err);
            }
        }
        Ok((data, opening))
    }

    /// Read the reply which ends a transfer, unless the opening reply already did
    pub async fn finish_transfer(&mut self, command: &Command, opening: Response) -> FtpResult<Response> {
        let response = match opening.status() {
            Status::ClosingData => opening,
            _ => self.read_reply().await?,
        };
        match response.class() {
            ReplyClass::PositiveCompletion => Ok(response),
            _ => Err(protocol_error(command, response)),
        }
    }

    // -- listing

    pub async fn list_all(&mut self) -> FtpResult<Vec<DirectoryEntry>> {
        self.ensure_logged_in().await?;
        let command = self.state.listing_strategy.command(None);
        debug!(
            "Listing {} with {}",
            self.state.working_directory,
            command.verb()
        );
        let lines = self.read_listing(command).await?;
        Ok(list::parse_listing(lines.as_slice())?)
    }

    /// Bare names from NLST
    pub async fn name_list(&mut self) -> FtpResult<Vec<String>> {
        self.ensure_logged_in().await?;
        let lines = self.read_listing(Command::Nlst(None)).await?;
        Ok(lines.into_iter().map(|line| line.trim().to_string()).collect())
    }

    async fn read_listing(&mut self, command: Command) -> FtpResult<Vec<String>> {
        let (mut data, opening) = self.open_data_channel(command.clone()).await?;
        let received = data.read_to_end(self.client.config.timeout()).await;
        if let Err(err) = data.close().await {
            debug!("Error while closing the data channel: {err}");
        }
        let (payload, complete) = match received {
            Ok(received) => received,
            Err(err) => {
                self.abandon_reply_of(&opening);
                return Err(err);
            }
        };
        if !complete {
            warn!(
                "{} timed out; keeping the {} bytes received so far",
                command.verb(),
                payload.len()
            );
        }
        self.finish_transfer(&command, opening).await?;
        let text = self.state.encoding.decode(&payload);
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    // -- control channel

    async fn execute(&mut self, command: Command) -> FtpResult<Response> {
        if self.state.pending_reply {
            self.discard_pending_reply(&command).await?;
        }
        let result = self
            .client
            .control
            .execute(&command, self.state.encoding)
            .await;
        self.check_transport(result).await
    }

    /// Wait for the final reply of an abandoned transfer and throw it away.
    ///
    /// The read is bounded by the configured timeout; a failed read leaves the
    /// control stream out of sync and disconnects.
    async fn discard_pending_reply(&mut self, next: &Command) -> FtpResult<()> {
        self.state.pending_reply = false;
        let result = self.client.control.read(self.state.encoding).await;
        match self.check_transport(result).await {
            Ok(response) => {
                warn!(
                    "Discarding reply of abandoned transfer before {}: {response}",
                    next.verb()
                );
                Ok(())
            }
            Err(err) => {
                warn!("Could not read reply of abandoned transfer: {err}");
                Err(err)
            }
        }
    }

    pub async fn read_reply(&mut self) -> FtpResult<Response> {
        let result = self.client.control.read(self.state.encoding).await;
        self.check_transport(result).await
    }

    /// Execute `command` and require one of the `expected` statuses
    async fn expect(&mut self, command: Command, expected: &[Status]) -> FtpResult<Response> {
        let response = self.execute(command.clone()).await?;
        match response.is_any(expected) {
            true => Ok(response),
            false => Err(protocol_error(&command, response)),
        }
    }

    /// A failed read or write leaves the control stream out of sync: drop it
    async fn check_transport(&mut self, result: FtpResult<Response>) -> FtpResult<Response> {
        if let Err(FtpError::ConnectionError(err)) = &result {
            error!("Control connection failed: {err}");
            self.client.control.lock().await.disconnect();
            self.state.phase = ConnectionPhase::Disconnected;
        }
        result
    }
}

fn protocol_error(command: &Command, response: Response) -> FtpError {
    FtpError::ProtocolError {
        command: Some(command.redacted()),
        response,
    }
}

/// The path quoted in a PWD reply, with RFC 959 doubled quotes unescaped
fn parse_quoted_path(message: &str) -> Option<String> {
    let start = message.find('"')? + 1;
    let mut chars = message[start..].chars().peekable();
    let mut path = String::new();
    while let Some(c) = chars.next() {
        if c != '"' {
            path.push(c);
        } else if chars.peek() == Some(&'"') {
            chars.next();
            path.push('"');
        } else {
            return Some(path);
        }
    }
    None
}

fn absolute_path(working_directory: &str, name: &str) -> String {
    match name.starts_with('/') {
        true => name.to_string(),
        false => format!("{}/{}", working_directory.trim_end_matches('/'), name),
    }
}

/// Parent of an absolute path, `None` for entries directly under the root
fn parent_directory(path: &str) -> Option<&str> {
    match path.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => Some(parent),
        _ => None,
    }
}
