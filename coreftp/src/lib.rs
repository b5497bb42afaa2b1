#![crate_name = "coreftp"]
#![crate_type = "lib"]

//! # coreftp
//!
//! coreftp is an async FTP/FTPS client engine for async-std.
//!
//! It keeps one control connection per [`FtpClient`], authenticates, navigates and changes the
//! remote tree, and moves file bytes over passive (EPSV) data connections, optionally under TLS:
//!
//! - Explicit (`AUTH TLS`) and implicit FTPS, through native-tls, with data channels encrypted as well
//! - Recursive directory creation and deletion
//! - Directory listings parsed from MLSD, Unix `ls -l` and DOS output into [`DirectoryEntry`]
//! - Streaming uploads and downloads with [`TransferStream`]
//! - A pluggable [`DnsResolver`]
//!
//! ## Get started
//!
//! ```toml
//! coreftp = "^0.4"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use coreftp::{EncryptionType, FtpClient, FtpClientConfiguration};
//! use futures_lite::io::AsyncWriteExt;
//!
//! # async_std::task::block_on(async {
//! let config = FtpClientConfiguration::new("ftp.example.com")
//!     .with_credentials("test", "test")
//!     .with_encryption(EncryptionType::Explicit)
//!     .with_base_directory("/uploads");
//! let client = FtpClient::new(config).unwrap();
//! client.login().await.unwrap();
//!
//! // upload a file, creating the missing directories
//! let mut stream = client.open_write_stream("2024/report.txt").await.unwrap();
//! stream.write_all(b"hello world").await.unwrap();
//! stream.close().await.unwrap();
//!
//! assert_eq!(client.get_file_size("2024/report.txt").await.unwrap(), 11);
//! client.logout().await;
//! # });
//! ```
//!

// -- common deps
#[macro_use]
extern crate lazy_regex;
#[macro_use]
extern crate log;

// -- private
mod client;
pub(crate) mod command;
mod config;
mod control;
mod data_channel;
mod regex;
mod resolver;
mod session;
mod status;
mod stream;
mod transport;

// -- public
pub mod list;
pub mod types;

// -- export
pub use client::FtpClient;
pub use config::{
    ClientCertificate, EncryptionType, FtpClientConfiguration, IpVersion, TlsVersion,
    DEFAULT_PORT, DEFAULT_TIMEOUT_SECONDS,
};
pub use list::{DirectoryEntry, NodeType};
pub use resolver::{DnsResolver, SystemResolver};
pub use session::ConnectionPhase;
pub use status::{ReplyClass, Status};
pub use stream::TransferStream;
pub use transport::{NativeTlsConnector, TlsConnector, TlsSettings, TlsStream};
pub use types::{Encoding, FtpError, FtpResult, Response, TransferMode};

// -- test utils
#[cfg(test)]
mod test_server;
#[cfg(all(test, feature = "with-containers"))]
mod test_container;

// -- test logging
#[cfg(test)]
pub fn log_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
