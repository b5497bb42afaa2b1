//! # Test server
//!
//! A minimal in-process FTP server with an in-memory tree, used by the engine tests.
//! It only speaks passive mode (EPSV) and plain text.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_std::io::BufReader;
use async_std::net::{TcpListener, TcpStream};
use async_std::task;
use futures_lite::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

use crate::FtpClientConfiguration;

pub const USER: &str = "test";
pub const PASSWORD: &str = "test";

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// First reply on connect
    pub banner: &'static str,
    /// Features listed by FEAT; `None` answers FEAT with 500
    pub features: Option<Vec<&'static str>>,
    /// Whether USER is enough to log in
    pub password_required: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            banner: "220 coreftp test server ready",
            features: Some(vec!["MLSD", "SIZE", "UTF8"]),
            password_required: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Directory,
    File(Vec<u8>),
}

#[derive(Debug)]
struct Tree {
    nodes: BTreeMap<String, Node>,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Directory);
        Self { nodes }
    }

    fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.nodes.get(path) == Some(&Node::Directory)
    }

    fn file(&self, path: &str) -> Option<&[u8]> {
        match self.nodes.get(path) {
            Some(Node::File(content)) => Some(content),
            _ => None,
        }
    }

    fn children(&self, dir: &str) -> Vec<(String, Node)> {
        let prefix = match dir {
            "/" => "/".to_string(),
            dir => format!("{dir}/"),
        };
        self.nodes
            .iter()
            .filter_map(|(path, node)| {
                let name = path.strip_prefix(&prefix)?;
                (!name.is_empty() && !name.contains('/')).then(|| (name.to_string(), node.clone()))
            })
            .collect()
    }

    fn mkdir(&mut self, path: &str) -> bool {
        if self.exists(path) || !self.is_dir(&parent(path)) {
            return false;
        }
        self.nodes.insert(path.to_string(), Node::Directory);
        true
    }

    fn rmdir(&mut self, path: &str) -> bool {
        if path == "/" || !self.is_dir(path) || !self.children(path).is_empty() {
            return false;
        }
        self.nodes.remove(path);
        true
    }

    fn delete(&mut self, path: &str) -> bool {
        if self.file(path).is_none() {
            return false;
        }
        self.nodes.remove(path);
        true
    }

    fn store(&mut self, path: &str, content: Vec<u8>) -> bool {
        if self.is_dir(path) || !self.is_dir(&parent(path)) {
            return false;
        }
        self.nodes.insert(path.to_string(), Node::File(content));
        true
    }

    fn rename(&mut self, from: &str, to: &str) -> bool {
        if !self.exists(from) || self.exists(to) || !self.is_dir(&parent(to)) {
            return false;
        }
        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|path| *path == from || path.starts_with(&format!("{from}/")))
            .cloned()
            .collect();
        for path in moved {
            if let Some(node) = self.nodes.remove(&path) {
                self.nodes.insert(format!("{to}{}", &path[from.len()..]), node);
            }
        }
        true
    }
}

fn parent(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}

/// Absolute, normalized form of `arg` relative to `cwd`
fn resolve(cwd: &str, arg: &str) -> String {
    let mut parts: Vec<&str> = match arg.starts_with('/') {
        true => Vec::new(),
        false => cwd.split('/').filter(|s| !s.is_empty()).collect(),
    };
    for segment in arg.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            segment => parts.push(segment),
        }
    }
    format!("/{}", parts.join("/"))
}

pub struct TestServer {
    addr: SocketAddr,
    tree: Arc<Mutex<Tree>>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerOptions::default()).await
    }

    pub async fn start_with(options: ServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let tree = Arc::new(Mutex::new(Tree::new()));
        let commands = Arc::new(Mutex::new(Vec::new()));
        let (shared_tree, shared_commands) = (tree.clone(), commands.clone());
        task::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                task::spawn(handle(
                    stream,
                    shared_tree.clone(),
                    shared_commands.clone(),
                    options.clone(),
                ));
            }
        });
        Self {
            addr,
            tree,
            commands,
        }
    }

    /// Client configuration pointing to this server
    pub fn config(&self) -> FtpClientConfiguration {
        FtpClientConfiguration::new("127.0.0.1")
            .with_port(self.addr.port())
            .with_credentials(USER, PASSWORD)
            .with_timeout(5)
    }

    pub fn add_dir(&self, path: &str) {
        self.tree
            .lock()
            .unwrap()
            .nodes
            .insert(path.to_string(), Node::Directory);
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.tree
            .lock()
            .unwrap()
            .nodes
            .insert(path.to_string(), Node::File(content.to_vec()));
    }

    pub fn exists(&self, path: &str) -> bool {
        self.tree.lock().unwrap().exists(path)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.tree.lock().unwrap().is_dir(path)
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.tree.lock().unwrap().file(path).map(|c| c.to_vec())
    }

    /// Every command line received so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Whether a command with `verb` was received
    pub fn received(&self, verb: &str) -> bool {
        self.commands()
            .iter()
            .any(|line| line.split(' ').next() == Some(verb))
    }
}

struct ConnectionContext {
    writer: TcpStream,
    cwd: String,
    user: Option<String>,
    logged_in: bool,
    passive: Option<TcpListener>,
    rename_from: Option<String>,
}

impl ConnectionContext {
    async fn reply(&mut self, reply: &str) {
        let _ = self.writer.write_all(format!("{reply}\r\n").as_bytes()).await;
    }

    async fn data_connection(&mut self) -> Option<TcpStream> {
        let listener = self.passive.take()?;
        listener.accept().await.ok().map(|(stream, _)| stream)
    }

    /// Send `payload` over the data connection with the usual 150/226 framing
    async fn send_data(&mut self, payload: Vec<u8>) {
        if self.passive.is_none() {
            return self.reply("425 Use EPSV first").await;
        }
        self.reply("150 Opening BINARY mode data connection").await;
        let Some(mut data) = self.data_connection().await else {
            return self.reply("425 Can't open data connection").await;
        };
        let sent = data.write_all(&payload).await.is_ok();
        drop(data);
        match sent {
            true => self.reply("226 Transfer complete").await,
            false => self.reply("426 Connection closed; transfer aborted").await,
        }
    }
}

async fn handle(
    stream: TcpStream,
    tree: Arc<Mutex<Tree>>,
    commands: Arc<Mutex<Vec<String>>>,
    options: ServerOptions,
) {
    let mut reader = BufReader::new(stream.clone());
    let mut ctx = ConnectionContext {
        writer: stream,
        cwd: "/".to_string(),
        user: None,
        logged_in: false,
        passive: None,
        rename_from: None,
    };
    ctx.reply(options.banner).await;
    if !options.banner.starts_with('2') {
        return;
    }
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        commands.lock().unwrap().push(line.clone());
        let (verb, arg) = match line.split_once(' ') {
            Some((verb, arg)) => (verb.to_uppercase(), arg.to_string()),
            None => (line.to_uppercase(), String::new()),
        };
        let path = resolve(&ctx.cwd, &arg);
        if !ctx.logged_in && !matches!(verb.as_str(), "USER" | "PASS" | "QUIT" | "FEAT") {
            ctx.reply("530 Please login with USER and PASS").await;
            continue;
        }
        match verb.as_str() {
            "USER" => {
                ctx.user = Some(arg);
                match options.password_required {
                    true => ctx.reply("331 User name okay, need password").await,
                    false => {
                        ctx.logged_in = true;
                        ctx.reply("230 User logged in").await
                    }
                }
            }
            "PASS" => match (ctx.user.as_deref(), arg.as_str()) {
                (Some(USER), PASSWORD) => {
                    ctx.logged_in = true;
                    ctx.reply("230 User logged in, proceed").await
                }
                _ => ctx.reply("530 Login incorrect").await,
            },
            "QUIT" => {
                ctx.reply("221 Goodbye").await;
                break;
            }
            "FEAT" => match &options.features {
                Some(features) => {
                    let mut reply = String::from("211-Features:\r\n");
                    for feature in features {
                        reply.push_str(&format!(" {feature}\r\n"));
                    }
                    reply.push_str("211 End");
                    ctx.reply(&reply).await
                }
                None => ctx.reply("500 FEAT not understood").await,
            },
            "OPTS" | "TYPE" | "CLNT" => ctx.reply("200 Command okay").await,
            "PWD" => {
                let reply = format!(
                    "257 \"{}\" is the current directory",
                    ctx.cwd.replace('"', "\"\"")
                );
                ctx.reply(&reply).await
            }
            "CWD" => {
                let is_dir = tree.lock().unwrap().is_dir(&path);
                match is_dir {
                    true => {
                        ctx.cwd = path;
                        ctx.reply("250 Directory successfully changed").await
                    }
                    false => ctx.reply("550 Failed to change directory").await,
                }
            }
            "MKD" => {
                let created = tree.lock().unwrap().mkdir(&path);
                match created {
                    true => ctx.reply(&format!("257 \"{path}\" created")).await,
                    false => ctx.reply("550 Create directory operation failed").await,
                }
            }
            "RMD" => {
                let removed = tree.lock().unwrap().rmdir(&path);
                match removed {
                    true => ctx.reply("250 Remove directory operation successful").await,
                    false => ctx.reply("550 Remove directory operation failed").await,
                }
            }
            "DELE" => {
                let deleted = tree.lock().unwrap().delete(&path);
                match deleted {
                    true => ctx.reply("250 Delete operation successful").await,
                    false => ctx.reply("550 Delete operation failed").await,
                }
            }
            "SIZE" => {
                let size = tree.lock().unwrap().file(&path).map(|c| c.len());
                match size {
                    Some(size) => ctx.reply(&format!("213 {size}")).await,
                    None => ctx.reply("550 Could not get file size").await,
                }
            }
            "RNFR" => {
                let exists = tree.lock().unwrap().exists(&path);
                match exists {
                    true => {
                        ctx.rename_from = Some(path);
                        ctx.reply("350 Ready for RNTO").await
                    }
                    false => ctx.reply("550 RNFR command failed").await,
                }
            }
            "RNTO" => {
                let renamed = match ctx.rename_from.take() {
                    Some(from) => tree.lock().unwrap().rename(&from, &path),
                    None => false,
                };
                match renamed {
                    true => ctx.reply("250 Rename successful").await,
                    false => ctx.reply("550 Rename failed").await,
                }
            }
            "EPSV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                ctx.passive = Some(listener);
                ctx.reply(&format!("229 Entering Extended Passive Mode (|||{port}|)"))
                    .await
            }
            "MLSD" | "LIST" | "NLST" => {
                let dir = match arg.is_empty() {
                    true => ctx.cwd.clone(),
                    false => path,
                };
                let children = tree.lock().unwrap().children(&dir);
                let payload = listing(&verb, &children);
                ctx.send_data(payload.into_bytes()).await
            }
            "RETR" => {
                let content = tree.lock().unwrap().file(&path).map(|c| c.to_vec());
                match content {
                    Some(content) => ctx.send_data(content).await,
                    None => ctx.reply("550 Failed to open file").await,
                }
            }
            "STOR" => {
                if ctx.passive.is_none() {
                    ctx.reply("425 Use EPSV first").await;
                    continue;
                }
                ctx.reply("150 Ok to send data").await;
                let Some(mut data) = ctx.data_connection().await else {
                    ctx.reply("425 Can't open data connection").await;
                    continue;
                };
                let mut content = Vec::new();
                let _ = data.read_to_end(&mut content).await;
                let stored = tree.lock().unwrap().store(&path, content);
                match stored {
                    true => ctx.reply("226 Transfer complete").await,
                    false => ctx.reply("553 Could not create file").await,
                }
            }
            _ => ctx.reply("502 Command not implemented").await,
        }
    }
}

fn listing(verb: &str, children: &[(String, Node)]) -> String {
    let mut lines = Vec::new();
    match verb {
        "MLSD" => {
            lines.push("type=cdir;modify=20200101000000; .".to_string());
            for (name, node) in children {
                lines.push(match node {
                    Node::Directory => format!("type=dir;modify=20200101000000; {name}"),
                    Node::File(content) => format!(
                        "type=file;size={};modify=20200101000000; {name}",
                        content.len()
                    ),
                });
            }
        }
        "LIST" => {
            lines.push(format!("total {}", children.len()));
            for (name, node) in children {
                lines.push(match node {
                    Node::Directory => {
                        format!("drwxr-xr-x 1 ftp ftp 0 Jan 01 2020 {name}")
                    }
                    Node::File(content) => format!(
                        "-rw-r--r-- 1 ftp ftp {} Jan 01 2020 {name}",
                        content.len()
                    ),
                });
            }
        }
        _ => lines.extend(children.iter().map(|(name, _)| name.clone())),
    }
    lines.iter().map(|line| format!("{line}\r\n")).collect()
}

#[cfg(test)]
mod test {

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn should_resolve_paths() {
        assert_eq!(resolve("/", "a").as_str(), "/a");
        assert_eq!(resolve("/a/b", "../c").as_str(), "/a/c");
        assert_eq!(resolve("/a", "/x/./y/").as_str(), "/x/y");
        assert_eq!(resolve("/a", "").as_str(), "/a");
    }

    #[test]
    fn should_mutate_tree() {
        let mut tree = Tree::new();
        assert!(tree.mkdir("/a"));
        assert!(!tree.mkdir("/a"));
        assert!(!tree.mkdir("/x/y"));
        assert!(tree.store("/a/f.txt", b"hi".to_vec()));
        assert!(!tree.rmdir("/a"));
        assert!(tree.rename("/a", "/b"));
        assert_eq!(tree.file("/b/f.txt"), Some(b"hi".as_slice()));
        assert!(tree.delete("/b/f.txt"));
        assert!(tree.rmdir("/b"));
        assert_eq!(tree.children("/"), vec![]);
    }
}
