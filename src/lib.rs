pub mod error;
pub mod security;
pub mod storage;
pub mod shard;
pub mod identity;
pub mod catalog;
pub mod config;
pub mod server;
