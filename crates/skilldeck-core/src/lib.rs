//! Configuration, skill service, scaffolding, and linting.

pub mod config;
pub mod error;
pub mod lint;
pub mod scaffold;
pub mod service;

pub use error::{ConfigError, ServiceError};
pub use service::{SkillService, ViewMode};
