//! CLI subcommands and the shared store context.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use examkit_core::registry::Registry;
use examkit_store::{load_config_from, ExamkitConfig, JsonFileStore};

pub mod edit;
pub mod grades;
pub mod import;
pub mod init;
pub mod list;
pub mod process;
pub mod take;
pub mod users;
pub mod validate;

/// Resolved configuration plus the store it points at.
pub struct Context {
    pub config: ExamkitConfig,
    pub store: Arc<JsonFileStore>,
}

impl Context {
    pub fn load(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let mut config = load_config_from(config_path)?;
        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }
        tracing::debug!("using data directory {}", config.data_dir.display());
        let store = Arc::new(JsonFileStore::new(&config.data_dir));
        Ok(Self { config, store })
    }

    /// Load the registry with the configured grading rule.
    pub fn registry(&self) -> Result<Registry> {
        let registry = Registry::load_from(self.store.as_ref())?;
        Ok(registry.with_rules(self.config.grading.rule_chain()))
    }

    pub fn save(&self, registry: &Registry) -> Result<()> {
        registry.save_to(self.store.as_ref())?;
        Ok(())
    }
}
