use std::time::Duration;

use serde::{Deserialize, Serialize};
use skilldeck_skills::{LoaderConfig, MatchWeights, WatcherConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_global_dir() -> String {
    "~/.skilldeck/skills".into()
}

fn default_project_dir() -> String {
    ".skilldeck/skills".into()
}

fn default_debounce_ms() -> u64 {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SkillsConfig {
    #[serde(default = "default_global_dir")]
    pub global_dir: String,
    #[serde(default = "default_project_dir")]
    pub project_dir: String,
    /// Start the hot-reload watcher right after the registry is initialized.
    #[serde(default)]
    pub auto_watch: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            global_dir: default_global_dir(),
            project_dir: default_project_dir(),
            auto_watch: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl SkillsConfig {
    #[must_use]
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::new(&self.global_dir, &self.project_dir)
    }

    #[must_use]
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}

fn default_name_weight() -> u32 {
    3
}

fn default_description_weight() -> u32 {
    1
}

fn default_min_word_len() -> usize {
    3
}

fn default_min_score() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchingConfig {
    #[serde(default = "default_name_weight")]
    pub name_weight: u32,
    #[serde(default = "default_description_weight")]
    pub description_weight: u32,
    #[serde(default = "default_min_word_len")]
    pub min_word_len: usize,
    #[serde(default = "default_min_score")]
    pub min_score: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            name_weight: default_name_weight(),
            description_weight: default_description_weight(),
            min_word_len: default_min_word_len(),
            min_score: default_min_score(),
        }
    }
}

impl MatchingConfig {
    #[must_use]
    pub fn weights(&self) -> MatchWeights {
        MatchWeights {
            name_weight: self.name_weight,
            description_weight: self.description_weight,
            description_min_word_len: self.min_word_len,
            min_score: self.min_score,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
