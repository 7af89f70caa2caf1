//! Startup configuration for both binaries. Each setting resolves as
//! CLI flag, then environment variable, then built-in default. Empty
//! environment values count as unset.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use crate::identity::DEFAULT_TOKEN_TTL;

pub const DEFAULT_AUTH_PORT: u16 = 5000;
pub const DEFAULT_CATALOG_PORT: u16 = 3000;
pub const DEFAULT_AUTH_URL: &str = "http://localhost:5000";

pub const AUTH_USAGE: &str = "shardcat auth server\n\nUSAGE:\n  shardcat-auth [--port N] [--secret KEY] [--users-file PATH] [--token-ttl SECS]\n\nOPTIONS:\n  --port N            HTTP port (env: PORT, default 5000)\n  --secret KEY        Token signing secret (env: SECRET_KEY, required)\n  --users-file PATH   JSON user store (env: DB3_URL, default in-memory)\n  --token-ttl SECS    Token lifetime (env: TOKEN_TTL_SECS, default 3600)\n";

pub const CATALOG_USAGE: &str = "shardcat catalog server\n\nUSAGE:\n  shardcat-catalog [--port N] [--auth-url URL] [--shard1-file PATH] [--shard2-file PATH] --users-file PATH\n\nOPTIONS:\n  --port N             HTTP port (env: PORT, default 3000)\n  --auth-url URL       Auth service base URL (env: AUTH_SERVER_URL, default http://localhost:5000)\n  --shard1-file PATH   JSON store for names A-M and defaults (env: DB1_URL, default in-memory)\n  --shard2-file PATH   JSON store for names N-Z (env: DB2_URL, default in-memory)\n  --users-file PATH    JSON user store shared with the auth server (env: DB3_URL, required)\n";

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn flag_value(args: &[String], flag: &str) -> Result<Option<String>> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            return match args.get(i + 1) {
                Some(v) if !v.starts_with("--") => Ok(Some(v.clone())),
                _ => Err(anyhow!("{} expects a value", flag)),
            };
        }
        i += 1;
    }
    Ok(None)
}

/// Flag first, then env, skipping empty env values.
fn setting(args: &[String], flag: &str, env: &dyn Fn(&str) -> Option<String>, var: &str) -> Result<Option<String>> {
    if let Some(v) = flag_value(args, flag)? { return Ok(Some(v)); }
    Ok(env(var).filter(|v| !v.trim().is_empty()))
}

fn parse_port(raw: Option<String>, default: u16, what: &str) -> Result<u16> {
    match raw {
        None => Ok(default),
        Some(s) => s.trim().parse::<u16>().map_err(|_| anyhow!("invalid {}: '{}'", what, s)),
    }
}

pub fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthServerConfig {
    pub port: u16,
    pub secret: String,
    pub users_file: Option<PathBuf>,
    pub token_ttl: Duration,
}

impl AuthServerConfig {
    pub fn from_args(args: &[String]) -> Result<Self> {
        Self::resolve(args, &process_env)
    }

    pub fn resolve(args: &[String], env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let port = parse_port(setting(args, "--port", env, "PORT")?, DEFAULT_AUTH_PORT, "port")?;
        let Some(secret) = setting(args, "--secret", env, "SECRET_KEY")? else {
            bail!("a token signing secret is required (--secret or SECRET_KEY)");
        };
        let users_file = setting(args, "--users-file", env, "DB3_URL")?.map(PathBuf::from);
        let token_ttl = match setting(args, "--token-ttl", env, "TOKEN_TTL_SECS")? {
            None => DEFAULT_TOKEN_TTL,
            Some(s) => match s.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => bail!("invalid token ttl: '{}'", s),
            },
        };
        Ok(Self { port, secret, users_file, token_ttl })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogServerConfig {
    pub port: u16,
    pub auth_url: String,
    pub shard1_file: Option<PathBuf>,
    pub shard2_file: Option<PathBuf>,
    /// The auth server's user document; the catalog lists and deletes users in it.
    pub users_file: PathBuf,
}

impl CatalogServerConfig {
    pub fn from_args(args: &[String]) -> Result<Self> {
        Self::resolve(args, &process_env)
    }

    pub fn resolve(args: &[String], env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let port = parse_port(setting(args, "--port", env, "PORT")?, DEFAULT_CATALOG_PORT, "port")?;
        let auth_url = setting(args, "--auth-url", env, "AUTH_SERVER_URL")?.unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());
        if !(auth_url.starts_with("http://") || auth_url.starts_with("https://")) {
            bail!("auth url must be http(s): '{}'", auth_url);
        }
        let Some(users_file) = setting(args, "--users-file", env, "DB3_URL")? else {
            bail!("the shared user store is required (--users-file or DB3_URL)");
        };
        Ok(Self {
            port,
            auth_url,
            shard1_file: setting(args, "--shard1-file", env, "DB1_URL")?.map(PathBuf::from),
            shard2_file: setting(args, "--shard2-file", env, "DB2_URL")?.map(PathBuf::from),
            users_file: PathBuf::from(users_file),
        })
    }
}
