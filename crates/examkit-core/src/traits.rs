//! The Store collaborator boundary.
//!
//! The core never picks a file format. It hands whole collections to a
//! [`Store`] and gets whole collections back; `examkit-store` provides the
//! file-backed implementation and [`MemoryStore`] covers tests and
//! embedding.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;

use crate::model::{Test, User};

/// Resource holding the authoritative list of tests.
pub const TESTS_RESOURCE: &str = "tests";

/// Resource holding registered users.
pub const USERS_RESOURCE: &str = "users";

/// Resource name a finalized exam is saved under.
pub fn test_resource(test_id: &str) -> String {
    format!("test_{test_id}")
}

/// Trait for loading and saving entity collections by resource name.
///
/// A missing resource loads as an empty collection.
pub trait Store: Send + Sync {
    fn load_tests(&self, resource: &str) -> Result<Vec<Test>>;

    fn save_tests(&self, resource: &str, tests: &[Test]) -> Result<()>;

    fn load_users(&self, resource: &str) -> Result<Vec<User>>;

    fn save_users(&self, resource: &str, users: &[User]) -> Result<()>;
}

/// In-process store keeping collections in maps.
#[derive(Default)]
pub struct MemoryStore {
    tests: Mutex<HashMap<String, Vec<Test>>>,
    users: Mutex<HashMap<String, Vec<User>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of resources that hold tests, sorted.
    pub fn test_resources(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.tests)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    m.lock().map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
}

impl Store for MemoryStore {
    fn load_tests(&self, resource: &str) -> Result<Vec<Test>> {
        Ok(lock(&self.tests)?.get(resource).cloned().unwrap_or_default())
    }

    fn save_tests(&self, resource: &str, tests: &[Test]) -> Result<()> {
        lock(&self.tests)?.insert(resource.to_string(), tests.to_vec());
        Ok(())
    }

    fn load_users(&self, resource: &str) -> Result<Vec<User>> {
        Ok(lock(&self.users)?.get(resource).cloned().unwrap_or_default())
    }

    fn save_users(&self, resource: &str, users: &[User]) -> Result<()> {
        lock(&self.users)?.insert(resource.to_string(), users.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_resource_is_empty() {
        let store = MemoryStore::new();
        assert!(store.load_tests("nothing").unwrap().is_empty());
        assert!(store.load_users("nothing").unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let test = Test::with_id("t1", "ch", "Quiz", "09:00", 10).unwrap();
        store.save_tests(&test_resource("t1"), &[test.clone()]).unwrap();
        assert_eq!(store.load_tests("test_t1").unwrap(), vec![test]);
        assert_eq!(store.test_resources(), vec!["test_t1".to_string()]);

        store
            .save_users(USERS_RESOURCE, &[User::student("s1", "Ada")])
            .unwrap();
        assert_eq!(store.load_users(USERS_RESOURCE).unwrap().len(), 1);
    }
}
