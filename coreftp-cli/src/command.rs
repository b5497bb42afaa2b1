use std::path::PathBuf;
use std::str::FromStr;

use coreftp::TransferMode;

pub enum Command {
    Cd(String),
    Clnt(String),
    Feat,
    Get(String, PathBuf),
    Help,
    Ls,
    Lsd,
    Lsf,
    Mkdir(String),
    Mv(String, String),
    Put(PathBuf, String),
    Pwd,
    Quit,
    Rm(String),
    Rmdir(String),
    Size(String),
    Type(TransferMode),
}

impl FromStr for Command {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut args = s.split_ascii_whitespace();
        let Some(cmd) = args.next() else {
            return Err("Unknown command");
        };
        match cmd.to_ascii_lowercase().as_str() {
            "cd" => match args.next() {
                Some(dir) => Ok(Self::Cd(dir.to_string())),
                None => Err("Missing `dir` field"),
            },
            "clnt" => match args.collect::<Vec<&str>>().join(" ") {
                name if name.is_empty() => Err("Missing `name` field"),
                name => Ok(Self::Clnt(name)),
            },
            "feat" => Ok(Self::Feat),
            "get" => {
                let file = args.next().ok_or("Missing `file` field")?;
                let dest = args.next().unwrap_or(file);
                Ok(Self::Get(file.to_string(), PathBuf::from(dest)))
            }
            "help" => Ok(Self::Help),
            "ls" => Ok(Self::Ls),
            "lsd" => Ok(Self::Lsd),
            "lsf" => Ok(Self::Lsf),
            "mkdir" => match args.next() {
                Some(dir) => Ok(Self::Mkdir(dir.to_string())),
                None => Err("Missing `dir` field"),
            },
            "mv" => {
                let src = args.next().ok_or("Missing `src` field")?;
                match args.next() {
                    Some(dest) => Ok(Self::Mv(src.to_string(), dest.to_string())),
                    None => Err("Missing `dest` field"),
                }
            }
            "put" => {
                let local = args.next().ok_or("Missing `source` field")?;
                match args.next() {
                    Some(dest) => Ok(Self::Put(PathBuf::from(local), dest.to_string())),
                    None => Err("Missing `dest` field"),
                }
            }
            "pwd" => Ok(Self::Pwd),
            "quit" | "exit" => Ok(Self::Quit),
            "rm" => match args.next() {
                Some(file) => Ok(Self::Rm(file.to_string())),
                None => Err("Missing `file` field"),
            },
            "rmdir" => match args.next() {
                Some(dir) => Ok(Self::Rmdir(dir.to_string())),
                None => Err("Missing `dir` field"),
            },
            "size" => match args.next() {
                Some(file) => Ok(Self::Size(file.to_string())),
                None => Err("Missing `file` field"),
            },
            "type" => match args.next().map(|t| t.to_ascii_uppercase()).as_deref() {
                Some("A") => Ok(Self::Type(TransferMode::Ascii)),
                Some("I") => Ok(Self::Type(TransferMode::Binary)),
                Some(_) => Err("Invalid type; use A or I"),
                None => Err("Missing `type` field"),
            },
            _ => Err("Unknown command"),
        }
    }
}
