//! # coreftp CLI
//!
//! An interactive FTP/FTPS client, built on coreftp
//!

// -- mods
mod actions;
mod args;
mod command;

use std::io;
use std::io::Write;
use std::str::FromStr;

use actions::*;
use args::Args;
use command::Command;
use coreftp::{EncryptionType, FtpClient, FtpClientConfiguration, DEFAULT_PORT};
use env_logger::Builder as LogBuilder;
use log::LevelFilter;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const IMPLICIT_PORT: u16 = 990;

fn usage() {
    println!("Available commands:");
    println!("cd <dir>                 Change working directory");
    println!("clnt <name>              Announce the client name");
    println!("feat                     Print the features supported by the server");
    println!("get <file> [dest]        Download `file` to `dest`");
    println!("help                     Print this help");
    println!("ls                       List the working directory");
    println!("lsd                      List directories only");
    println!("lsf                      List files only");
    println!("mkdir <dir>              Create a directory and its parents");
    println!("mv <source> <dest>       Rename `source` to `dest`");
    println!("put <file> <dest>        Upload local file `file` to `dest`");
    println!("pwd                      Print working directory");
    println!("quit                     Log out and exit");
    println!("rm <file>                Remove file");
    println!("rmdir <dir>              Remove directory with its content");
    println!("size <file>              Get `file` size");
    println!("type <A|I>               Set ASCII or binary transfers");
}

fn input() -> Option<Command> {
    loop {
        print!(">> ");
        let _ = io::stdout().flush();
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        if input.trim().is_empty() {
            continue;
        }
        match Command::from_str(input.as_str()) {
            Ok(cmd) => return Some(cmd),
            Err(err) => println!("{err}"),
        }
    }
}

fn configuration(args: &Args) -> io::Result<FtpClientConfiguration> {
    let encryption = match (args.implicit, args.explicit) {
        (true, _) => EncryptionType::Implicit,
        (false, true) => EncryptionType::Explicit,
        (false, false) => EncryptionType::None,
    };
    let default_port = match encryption {
        EncryptionType::Implicit => IMPLICIT_PORT,
        _ => DEFAULT_PORT,
    };
    let mut config = FtpClientConfiguration::new(args.host.as_str())
        .with_port(args.port.unwrap_or(default_port))
        .with_encryption(encryption)
        .ignore_certificate_errors(args.insecure);
    if let Some(user) = args.user.as_deref() {
        let password = rpassword::prompt_password(format!("Password for {user}: "))?;
        config = config.with_credentials(user, password);
    }
    Ok(config)
}

fn main() {
    let args: Args = argh::from_env();
    // print version
    if args.version {
        println!("coreftp {APP_VERSION} - developed by {APP_AUTHORS}")
    }
    // init logger
    LogBuilder::new()
        .filter_level(if args.debug {
            LevelFilter::Trace
        } else if args.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Off
        })
        .init();
    let config = match configuration(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Could not read password: {err}");
            std::process::exit(1);
        }
    };
    let ftp = match FtpClient::new(config) {
        Ok(ftp) => ftp,
        Err(err) => {
            eprintln!("Failed to setup client: {err}");
            std::process::exit(1);
        }
    };
    async_std::task::block_on(run(ftp));
}

async fn run(ftp: FtpClient) {
    match ftp.login().await {
        Ok(_) => {
            if let Some(welcome) = ftp.welcome_message().await {
                println!("{welcome}");
            }
            println!("OK: logged in to {}", ftp.configuration().host);
        }
        Err(err) => {
            eprintln!("LOGIN error: {err}");
            return;
        }
    }
    loop {
        match input() {
            Some(Command::Quit) | None => {
                quit(&ftp).await;
                break;
            }
            Some(Command::Help) => usage(),
            Some(cmd) => perform(&ftp, cmd).await,
        }
    }
}

async fn perform(ftp: &FtpClient, command: Command) {
    match command {
        Command::Cd(dir) => cd(ftp, dir.as_str()).await,
        Command::Clnt(name) => clnt(ftp, name.as_str()).await,
        Command::Feat => feat(ftp).await,
        Command::Get(file, dest) => get(ftp, file.as_str(), dest.as_path()).await,
        Command::Ls => list(ftp, |_| true).await,
        Command::Lsd => list(ftp, |e| e.is_directory()).await,
        Command::Lsf => list(ftp, |e| e.is_file()).await,
        Command::Mkdir(dir) => mkdir(ftp, dir.as_str()).await,
        Command::Mv(src, dest) => mv(ftp, src.as_str(), dest.as_str()).await,
        Command::Put(src, dest) => put(ftp, src.as_path(), dest.as_str()).await,
        Command::Pwd => pwd(ftp).await,
        Command::Rm(file) => rm(ftp, file.as_str()).await,
        Command::Rmdir(dir) => rmdir(ftp, dir.as_str()).await,
        Command::Size(file) => size(ftp, file.as_str()).await,
        Command::Type(mode) => set_type(ftp, mode).await,
        Command::Help | Command::Quit => {
            unreachable!("handled by the main loop")
        }
    }
}
