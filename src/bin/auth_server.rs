//!
//! shardcat auth server binary
//! ---------------------------
//! Issues and verifies signed tokens over the user store. Configured via CLI
//! flags, then environment variables, then defaults.

use anyhow::{Context, Result};
use std::env;

use shardcat::config::{has_flag, AuthServerConfig, AUTH_USAGE};
use shardcat::server::{init_tracing, run_auth};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print!("{}", AUTH_USAGE);
        return Ok(());
    }
    println!("shardcat auth {}", env!("CARGO_PKG_VERSION"));
    init_tracing();
    let config = AuthServerConfig::from_args(&args).context("While reading auth server configuration")?;
    run_auth(config).await
}
