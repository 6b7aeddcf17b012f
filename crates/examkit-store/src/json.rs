//! JSON file store.
//!
//! Each resource is one pretty-printed JSON array at `<root>/<resource>.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use examkit_core::model::{Test, User};
use examkit_core::traits::Store;

/// Stores collections as JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `resource`.
    pub fn path_for(&self, resource: &str) -> PathBuf {
        self.root.join(format!("{resource}.json"))
    }

    fn load<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>> {
        let path = self.path_for(resource);
        if !path.exists() {
            tracing::debug!("{} missing, starting empty", path.display());
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    fn save<T: Serialize>(&self, resource: &str, items: &[T]) -> Result<()> {
        let path = self.path_for(resource);
        let json = serde_json::to_string_pretty(items)
            .with_context(|| format!("failed to serialize {resource}"))?;
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn load_tests(&self, resource: &str) -> Result<Vec<Test>> {
        self.load(resource)
    }

    fn save_tests(&self, resource: &str, tests: &[Test]) -> Result<()> {
        self.save(resource, tests)
    }

    fn load_users(&self, resource: &str) -> Result<Vec<User>> {
        self.load(resource)
    }

    fn save_users(&self, resource: &str, users: &[User]) -> Result<()> {
        self.save(resource, users)
    }
}
