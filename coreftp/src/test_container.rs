//! # Test container
//!
//! Integration tests against a pure-ftpd container

use std::borrow::Cow;
use std::collections::HashMap;
use std::net::SocketAddr;

use async_trait::async_trait;
use futures_lite::io::{AsyncReadExt, AsyncWriteExt};
use pretty_assertions::assert_eq;
use rand::distr::Alphanumeric;
use rand::Rng;
use serial_test::serial;
use testcontainers::core::{CmdWaitFor, ExecCommand, WaitFor};
use testcontainers::{ContainerAsync, Image};

use crate::{
    DnsResolver, EncryptionType, FtpClient, FtpClientConfiguration, FtpResult, IpVersion,
};

const FTP_PORT: u16 = 21;
const PASSIVE_PORTS: std::ops::RangeInclusive<u16> = 30000..=30009;

#[derive(Debug, Default, Clone)]
struct PureFtpImage {
    _priv: (),
}

impl Image for PureFtpImage {
    fn name(&self) -> &str {
        "stilliard/pure-ftpd"
    }

    fn tag(&self) -> &str {
        "latest"
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stdout("Starting Pure-FTPd")]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<Item = (impl Into<Cow<'_, str>>, impl Into<Cow<'_, str>>)> {
        vec![
            ("PUBLICHOST", "localhost"),
            ("FTP_USER_NAME", "test"),
            ("FTP_USER_PASS", "test"),
            ("FTP_USER_HOME", "/home/test"),
            ("ADDED_FLAGS", "--tls=1"),
            ("TLS_CN", "localhost"),
            ("TLS_ORG", "coreftp"),
            ("TLS_C", "IT"),
        ]
    }
}

pub struct AsyncPureFtpRunner {
    container: ContainerAsync<PureFtpImage>,
    ports: HashMap<u16, u16>,
}

impl AsyncPureFtpRunner {
    pub async fn start() -> Self {
        use testcontainers::runners::AsyncRunner;
        let container = PureFtpImage::default()
            .start()
            .await
            .expect("Failed to start container");
        let resp = container
            .exec(
                ExecCommand::new(["/bin/mkdir", "-p", "/home/test/fixtures"])
                    .with_cmd_ready_condition(CmdWaitFor::Exit { code: Some(0) }),
            )
            .await
            .expect("Failed to create directory");
        assert_eq!(
            resp.exit_code()
                .await
                .expect("failed to get exit code for mkdir")
                .expect("no exit code for mkdir"),
            0
        );
        let mut ports = HashMap::new();
        for port in std::iter::once(FTP_PORT).chain(PASSIVE_PORTS) {
            let mapped = container
                .get_host_port_ipv4(port)
                .await
                .expect("port is not exposed");
            ports.insert(port, mapped);
        }
        Self { container, ports }
    }

    /// Client configuration pointing to the container, with a random base directory
    pub fn config(&self) -> FtpClientConfiguration {
        FtpClientConfiguration::new("127.0.0.1")
            .with_port(FTP_PORT)
            .with_credentials("test", "test")
            .with_base_directory(format!("/{}", generate_tempdir()))
            .with_timeout(10)
    }

    pub fn client(&self, config: FtpClientConfiguration) -> FtpClient {
        FtpClient::new(config)
            .unwrap()
            .with_resolver(PortMappingResolver {
                ports: self.ports.clone(),
            })
    }

    pub fn id(&self) -> &str {
        self.container.id()
    }
}

/// Resolves to localhost, translating the container ports to the host ones
struct PortMappingResolver {
    ports: HashMap<u16, u16>,
}

#[async_trait]
impl DnsResolver for PortMappingResolver {
    async fn resolve(&self, _host: &str, port: u16, _ip_version: IpVersion) -> FtpResult<SocketAddr> {
        let port = self.ports.get(&port).copied().unwrap_or(port);
        Ok(SocketAddr::from(([127, 0, 0, 1], port)))
    }
}

fn generate_tempdir() -> String {
    let name: String = rand::rng()
        .sample_iter(Alphanumeric)
        .map(char::from)
        .take(5)
        .collect();
    format!("temp_{name}")
}

#[async_attributes::test]
#[serial]
async fn should_login_to_pure_ftpd() {
    crate::log_init();
    let container = AsyncPureFtpRunner::start().await;
    debug!("started container {}", container.id());
    let config = container.config();
    let base = config.base_directory().to_string();
    let client = container.client(config);
    client.login().await.unwrap();
    assert!(client.is_authenticated().await);
    assert!(client.welcome_message().await.is_some());
    assert_eq!(client.working_directory().await, base);
    client.change_directory("/").await.unwrap();
    let directories = client.list_directories().await.unwrap();
    assert!(directories.iter().any(|e| e.name() == "fixtures"));
    client.delete_directory(&base).await.unwrap();
    client.logout().await;
    assert!(!client.is_connected().await);
}

#[async_attributes::test]
#[serial]
async fn should_transfer_files_with_pure_ftpd() {
    crate::log_init();
    let container = AsyncPureFtpRunner::start().await;
    let config = container.config();
    let base = config.base_directory().to_string();
    let client = container.client(config);
    client.login().await.unwrap();

    let mut stream = client.open_write_stream("nested/hello.txt").await.unwrap();
    stream.write_all(b"Hello, pure-ftpd!").await.unwrap();
    stream.close().await.unwrap();
    assert_eq!(client.get_file_size("nested/hello.txt").await.unwrap(), 17);

    client.change_directory("nested").await.unwrap();
    let files = client.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name(), "hello.txt");
    assert_eq!(files[0].size(), 17);

    let mut stream = client.open_read_stream("hello.txt").await.unwrap();
    let mut content = Vec::new();
    stream.read_to_end(&mut content).await.unwrap();
    stream.close().await.unwrap();
    assert_eq!(content.as_slice(), b"Hello, pure-ftpd!");

    client.rename("hello.txt", "bye.txt").await.unwrap();
    assert_eq!(client.name_list().await.unwrap(), vec!["bye.txt".to_string()]);

    client.change_directory("/").await.unwrap();
    client.delete_directory(&base).await.unwrap();
    assert!(client.change_directory(&base).await.is_err());
    client.logout().await;
}

#[async_attributes::test]
#[serial]
async fn should_login_to_pure_ftpd_with_explicit_tls() {
    crate::log_init();
    let container = AsyncPureFtpRunner::start().await;
    let config = container
        .config()
        .with_encryption(EncryptionType::Explicit)
        .ignore_certificate_errors(true);
    let base = config.base_directory().to_string();
    let client = container.client(config);
    client.login().await.unwrap();
    assert!(client.is_encrypted().await);

    let mut stream = client.open_write_stream("secret.txt").await.unwrap();
    stream.write_all(b"top secret").await.unwrap();
    stream.close().await.unwrap();
    assert_eq!(client.list_files().await.unwrap().len(), 1);

    client.delete_directory(&base).await.unwrap();
    client.logout().await;
}
