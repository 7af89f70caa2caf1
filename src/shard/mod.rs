//! Name-range sharding of the product collection.
//!
//! A product's shard is fixed at create time by the first character of its
//! name: `A..=M` goes to Shard1, `N..=Z` to Shard2, and everything else
//! (digits, punctuation, non-ASCII letters) falls back to Shard1.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::error::{AppError, AppResult};

pub mod router;

pub use router::{ShardRouter, UpdateOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Shard {
    Shard1,
    Shard2,
}

impl Shard {
    pub const ALL: [Shard; 2] = [Shard::Shard1, Shard::Shard2];

    pub fn as_str(self) -> &'static str {
        match self {
            Shard::Shard1 => "Shard1",
            Shard::Shard2 => "Shard2",
        }
    }
}

impl Display for Shard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a name landed where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteReason {
    FirstHalf,
    SecondHalf,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub shard: Shard,
    pub reason: RouteReason,
}

impl Route {
    /// Human label reported back to clients on create.
    pub fn label(&self) -> &'static str {
        match self.reason {
            RouteReason::FirstHalf => "Shard1 (A-M)",
            RouteReason::SecondHalf => "Shard2 (N-Z)",
            RouteReason::Default => "Shard1 (default)",
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Pick the shard for a new record. Pure and total over non-empty names.
pub fn route_for_create(name: &str) -> AppResult<Route> {
    let Some(first) = name.chars().next() else {
        return Err(AppError::validation("missing_field", "product name is required"));
    };
    let route = match first.to_ascii_uppercase() {
        'A'..='M' => Route { shard: Shard::Shard1, reason: RouteReason::FirstHalf },
        'N'..='Z' => Route { shard: Shard::Shard2, reason: RouteReason::SecondHalf },
        _ => Route { shard: Shard::Shard1, reason: RouteReason::Default },
    };
    Ok(route)
}
