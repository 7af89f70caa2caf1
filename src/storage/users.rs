//! Credential store. Uniqueness of username and email is enforced inside the
//! store under one lock, so check-then-insert is atomic per process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::file::JsonFile;
use super::StoreResult;

/// A user as persisted. `password_hash` is an Argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user. Carries no password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    pub fn summary(&self) -> UserSummary {
        UserSummary { username: self.username.clone(), email: self.email.clone(), created_at: self.created_at }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    UsernameTaken,
    EmailTaken,
}

fn check_unique(users: &[StoredUser], candidate: &StoredUser) -> InsertOutcome {
    if users.iter().any(|u| u.username == candidate.username) {
        InsertOutcome::UsernameTaken
    } else if users.iter().any(|u| u.email == candidate.email) {
        InsertOutcome::EmailTaken
    } else {
        InsertOutcome::Inserted
    }
}

pub trait UserStore: Send + Sync {
    /// Insert unless the username or email already exists. Username is checked first.
    fn insert_if_absent(&self, user: StoredUser) -> StoreResult<InsertOutcome>;

    fn find(&self, username: &str) -> StoreResult<Option<StoredUser>>;

    fn list(&self) -> StoreResult<Vec<UserSummary>>;

    fn delete(&self, username: &str) -> StoreResult<bool>;
}

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<Vec<StoredUser>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self { Self::default() }
}

impl UserStore for MemoryUserStore {
    fn insert_if_absent(&self, user: StoredUser) -> StoreResult<InsertOutcome> {
        let mut g = self.users.write();
        let outcome = check_unique(&g, &user);
        if outcome == InsertOutcome::Inserted { g.push(user); }
        Ok(outcome)
    }

    fn find(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        Ok(self.users.read().iter().find(|u| u.username == username).cloned())
    }

    fn list(&self) -> StoreResult<Vec<UserSummary>> {
        Ok(self.users.read().iter().map(StoredUser::summary).collect())
    }

    fn delete(&self, username: &str) -> StoreResult<bool> {
        let mut g = self.users.write();
        let before = g.len();
        g.retain(|u| u.username != username);
        Ok(g.len() != before)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserDocument {
    #[serde(default)]
    users: Vec<StoredUser>,
}

/// User directory persisted as a JSON document; shared by the auth and catalog servers.
#[derive(Clone)]
pub struct FileUserStore {
    doc: JsonFile<UserDocument>,
}

impl FileUserStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { doc: JsonFile::new("users", path) }
    }

    pub fn path(&self) -> &Path { self.doc.path() }
}

impl UserStore for FileUserStore {
    fn insert_if_absent(&self, user: StoredUser) -> StoreResult<InsertOutcome> {
        self.doc.modify(|d| {
            let outcome = check_unique(&d.users, &user);
            let inserted = outcome == InsertOutcome::Inserted;
            if inserted { d.users.push(user); }
            (outcome, inserted)
        })
    }

    fn find(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        self.doc.read(|d| d.users.iter().find(|u| u.username == username).cloned())
    }

    fn list(&self) -> StoreResult<Vec<UserSummary>> {
        self.doc.read(|d| d.users.iter().map(StoredUser::summary).collect())
    }

    fn delete(&self, username: &str) -> StoreResult<bool> {
        self.doc.modify(|d| {
            let before = d.users.len();
            d.users.retain(|u| u.username != username);
            let removed = d.users.len() != before;
            (removed, removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> StoredUser {
        StoredUser { username: name.into(), email: email.into(), password_hash: "$argon2id$x".into(), created_at: Utc::now() }
    }

    fn exercise(store: &dyn UserStore) {
        assert_eq!(store.insert_if_absent(user("ana", "ana@example.com")).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_if_absent(user("ana", "other@example.com")).unwrap(), InsertOutcome::UsernameTaken);
        assert_eq!(store.insert_if_absent(user("bob", "ana@example.com")).unwrap(), InsertOutcome::EmailTaken);
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(store.find("ana").unwrap().is_some());
        assert!(store.delete("ana").unwrap());
        assert!(!store.delete("ana").unwrap());
        assert!(store.find("ana").unwrap().is_none());
    }

    #[test]
    fn memory_store_uniqueness() {
        exercise(&MemoryUserStore::new());
    }

    #[test]
    fn file_store_uniqueness() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileUserStore::open(dir.path().join("users.json")));
    }

    #[test]
    fn summary_json_has_no_password() {
        let v = serde_json::to_value(user("ana", "ana@example.com").summary()).unwrap();
        assert!(v.get("password").is_none());
        assert!(v.get("password_hash").is_none());
        assert_eq!(v["username"], "ana");
    }
}
