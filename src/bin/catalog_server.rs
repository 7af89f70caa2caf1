//!
//! shardcat catalog server binary
//! ------------------------------
//! Serves the sharded product catalog. Every request is verified against the
//! auth server named by `--auth-url` / `AUTH_SERVER_URL`.

use anyhow::{Context, Result};
use std::env;

use shardcat::config::{has_flag, CatalogServerConfig, CATALOG_USAGE};
use shardcat::server::{init_tracing, run_catalog};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print!("{}", CATALOG_USAGE);
        return Ok(());
    }
    println!("shardcat catalog {}", env!("CARGO_PKG_VERSION"));
    init_tracing();
    let config = CatalogServerConfig::from_args(&args).context("While reading catalog server configuration")?;
    run_catalog(config).await
}
