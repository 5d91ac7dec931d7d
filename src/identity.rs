// src/identity.rs
use crate::error::{AuthError, StorageError};
use crate::models::auth::User;
use crate::storage::{keys, Storage};
use std::sync::{Mutex, MutexGuard};

/// Directory of registered demo users, persisted as one list under
/// [`keys::DEMO_USERS`]. Lookups are a linear scan.
///
/// Emails are compared exactly, case included: `Ada@x.io` and `ada@x.io`
/// are two different accounts.
pub struct IdentityStore {
    storage: Storage,
    users: Mutex<Vec<User>>,
}

impl IdentityStore {
    pub fn new(storage: Storage) -> Self {
        let users: Vec<User> = storage.get(keys::DEMO_USERS, Vec::new());
        tracing::debug!(count = users.len(), "loaded user directory");
        Self {
            storage,
            users: Mutex::new(users),
        }
    }

    fn users(&self) -> MutexGuard<'_, Vec<User>> {
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.users().iter().find(|u| u.email == email).cloned()
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.users().iter().any(|u| u.email == email)
    }

    /// Adds `user` to the directory. The list is only replaced in memory once
    /// the write succeeded.
    pub fn insert(&self, user: User) -> Result<(), AuthError> {
        let mut users = self.users();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::DuplicateEmail);
        }

        let mut next = users.clone();
        next.push(user);
        self.storage
            .set(keys::DEMO_USERS, &next)
            .map_err(|e: StorageError| {
                tracing::warn!(error = %e, "failed to persist user directory");
                AuthError::Storage(e)
            })?;

        *users = next;
        Ok(())
    }

    pub fn all(&self) -> Vec<User> {
        self.users().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn user(email: &str) -> User {
        User {
            id: crate::utils::generate_id(),
            email: email.to_string(),
            name: "Ada".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let store = IdentityStore::new(Storage::in_memory());
        let ada = user("ada@example.com");
        store.insert(ada.clone()).unwrap();

        assert_eq!(store.find_by_email("ada@example.com"), Some(ada));
        assert_eq!(store.find_by_email("bob@example.com"), None);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = IdentityStore::new(Storage::in_memory());
        store.insert(user("ada@example.com")).unwrap();

        let err = store.insert(user("ada@example.com")).unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_email_match_is_case_sensitive() {
        let store = IdentityStore::new(Storage::in_memory());
        store.insert(user("ada@example.com")).unwrap();

        assert!(store.find_by_email("Ada@example.com").is_none());
        store.insert(user("Ada@example.com")).unwrap();
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn test_directory_reloads_from_storage() {
        let storage = Storage::in_memory();
        IdentityStore::new(storage.clone())
            .insert(user("ada@example.com"))
            .unwrap();

        let reopened = IdentityStore::new(storage);
        assert!(reopened.contains_email("ada@example.com"));
    }

    #[test]
    fn test_failed_write_leaves_directory_unchanged() {
        let store = IdentityStore::new(Storage::new(MemoryStore::with_quota(16)));

        let err = store.insert(user("ada@example.com")).unwrap_err();
        assert!(matches!(err, AuthError::Storage(StorageError::QuotaExceeded { .. })));
        assert!(store.find_by_email("ada@example.com").is_none());
    }
}
