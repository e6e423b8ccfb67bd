use std::path::PathBuf;

use skilldeck_skills::SkillError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Skill(#[from] SkillError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("section '{section}' not found in skill '{skill}'")]
    SectionNotFound { section: String, skill: String },

    #[error("invalid skill name '{0}'")]
    InvalidName(String),

    #[error("skill directory already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
