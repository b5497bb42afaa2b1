use std::path::Path;

use async_std::fs::File;
use coreftp::{DirectoryEntry, FtpClient, TransferMode};

pub async fn quit(ftp: &FtpClient) {
    ftp.logout().await;
    println!("OK");
}

pub async fn cd(ftp: &FtpClient, dir: &str) {
    match ftp.change_directory(dir).await {
        Ok(_) => println!("OK: {}", ftp.working_directory().await),
        Err(err) => eprintln!("CD error: {err}"),
    }
}

pub async fn clnt(ftp: &FtpClient, name: &str) {
    match ftp.set_client_name(name).await {
        Ok(response) => println!("OK: {response}"),
        Err(err) => eprintln!("CLNT error: {err}"),
    }
}

pub async fn feat(ftp: &FtpClient) {
    let mut features: Vec<_> = ftp.features().await.into_iter().collect();
    features.sort();
    for (name, value) in features {
        match value {
            Some(value) => println!("{name} {value}"),
            None => println!("{name}"),
        }
    }
}

pub async fn get(ftp: &FtpClient, file: &str, dest: &Path) {
    let mut dest = match File::create(dest).await {
        Ok(d) => d,
        Err(err) => {
            eprintln!("Failed to open destination file: {err}");
            return;
        }
    };
    let mut stream = match ftp.open_read_stream(file).await {
        Ok(s) => s,
        Err(err) => {
            eprintln!("GET error: {err}");
            return;
        }
    };
    let copied = futures_lite::io::copy(&mut stream, &mut dest).await;
    match (copied, stream.close().await) {
        (Ok(bytes), Ok(_)) => println!("OK: {bytes} bytes"),
        (Err(err), _) => eprintln!("GET error: {err}"),
        (_, Err(err)) => eprintln!("GET error: {err}"),
    }
}

pub async fn list(ftp: &FtpClient, filter: fn(&DirectoryEntry) -> bool) {
    match ftp.list_all().await {
        Ok(entries) => entries.iter().filter(|e| filter(e)).for_each(print_entry),
        Err(err) => eprintln!("LS error: {err}"),
    }
}

fn print_entry(entry: &DirectoryEntry) {
    let modified = entry
        .modified()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!(
        "{:<4} {:>12} {:<16} {}",
        entry.node_type().to_string(),
        entry.size(),
        modified,
        entry.name()
    );
}

pub async fn mkdir(ftp: &FtpClient, dir: &str) {
    match ftp.create_directory(dir).await {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("MKDIR error: {err}"),
    }
}

pub async fn mv(ftp: &FtpClient, src: &str, dest: &str) {
    match ftp.rename(src, dest).await {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("MV error: {err}"),
    }
}

pub async fn put(ftp: &FtpClient, local: &Path, dest: &str) {
    let reader = match File::open(local).await {
        Ok(r) => r,
        Err(err) => {
            eprintln!("Failed to open local file for read: {err}");
            return;
        }
    };
    let mut stream = match ftp.open_write_stream(dest).await {
        Ok(s) => s,
        Err(err) => {
            eprintln!("PUT error: {err}");
            return;
        }
    };
    let copied = futures_lite::io::copy(reader, &mut stream).await;
    match (copied, stream.close().await) {
        (Ok(bytes), Ok(_)) => println!("OK: {bytes} bytes"),
        (Err(err), _) => eprintln!("PUT error: {err}"),
        (_, Err(err)) => eprintln!("PUT error: {err}"),
    }
}

pub async fn pwd(ftp: &FtpClient) {
    println!("OK: {}", ftp.working_directory().await);
}

pub async fn rm(ftp: &FtpClient, file: &str) {
    match ftp.delete_file(file).await {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("RM error: {err}"),
    }
}

pub async fn rmdir(ftp: &FtpClient, dir: &str) {
    match ftp.delete_directory(dir).await {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("RMDIR error: {err}"),
    }
}

pub async fn size(ftp: &FtpClient, file: &str) {
    match ftp.get_file_size(file).await {
        Ok(size) => println!("OK: {size}"),
        Err(err) => eprintln!("SIZE error: {err}"),
    }
}

pub async fn set_type(ftp: &FtpClient, mode: TransferMode) {
    match ftp.set_transfer_mode(mode, None).await {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("TYPE error: {err}"),
    }
}
