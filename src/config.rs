use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

fn default_max_upload_bytes() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub upload_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
}

pub fn load_config() -> Result<Config> {
    // Load .env file first
    dotenv().ok();

    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

    let bind_addr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse::<SocketAddr>()
        .context("BIND_ADDR is not a valid socket address")?;

    let max_upload_bytes = match std::env::var("MAX_UPLOAD_BYTES") {
        Ok(raw) => raw
            .parse::<usize>()
            .context("MAX_UPLOAD_BYTES is not a valid byte count")?,
        Err(_) => default_max_upload_bytes(),
    };

    Ok(Config {
        upload_dir: PathBuf::from(upload_dir),
        bind_addr,
        max_upload_bytes,
    })
}
