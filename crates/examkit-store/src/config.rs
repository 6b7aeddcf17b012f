//! examkit configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examkit_core::rules::{RuleChain, ScoringStage};

/// Grading settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Scoring stages applied in order.
    #[serde(default = "default_stages")]
    pub stages: Vec<ScoringStage>,
}

impl GradingConfig {
    pub fn rule_chain(&self) -> RuleChain {
        RuleChain::new(self.stages.clone())
    }
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
        }
    }
}

fn default_stages() -> Vec<ScoringStage> {
    RuleChain::default().stages().to_vec()
}

/// Test-taking settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Submit with unanswered questions without asking.
    #[serde(default)]
    pub allow_unanswered: bool,
}

/// Top-level examkit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamkitConfig {
    /// Directory holding the JSON store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./examkit-data")
}

impl Default for ExamkitConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            grading: GradingConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Expand `${VAR}` references in a string. Unset variables expand to
/// nothing; substituted values are not expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        out.push_str(&std::env::var(name).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examkit.toml` in the current directory
/// 2. `~/.config/examkit/config.toml`
///
/// `EXAMKIT_DATA_DIR` overrides `data_dir`.
pub fn load_config() -> Result<ExamkitConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamkitConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examkit.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => parse_config(&path)?,
        None => ExamkitConfig::default(),
    };

    if let Ok(dir) = std::env::var("EXAMKIT_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    config.data_dir = PathBuf::from(resolve_env_vars(&config.data_dir.to_string_lossy()));

    Ok(config)
}

fn parse_config(path: &Path) -> Result<ExamkitConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<ExamkitConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examkit"))
}
