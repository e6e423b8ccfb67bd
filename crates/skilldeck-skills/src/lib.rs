//! SKILL.md parser, source loader, cached registry, and debounced hot-reload.

pub mod error;
pub mod loader;
pub mod matcher;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod resource;
pub mod types;
pub mod watcher;

pub use error::SkillError;
pub use loader::{LoadReport, LoadWarning, LoaderConfig, SourceLoader};
pub use matcher::MatchWeights;
pub use registry::SkillRegistry;
pub use types::{BundledFile, FileCategory, Header, Skill, SkillMetadata, SkillSource};
pub use watcher::{ReloadTarget, SkillWatcher, WatcherConfig};
