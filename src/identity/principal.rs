use serde::{Deserialize, Serialize};

/// The authenticated caller a verified token speaks for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into() }
    }
}
