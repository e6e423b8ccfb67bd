//! Skill entities and header validation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SkillError;

/// Required file name of a skill document.
pub const SKILL_FILE_NAME: &str = "SKILL.md";

pub const MAX_NAME_LEN: usize = 64;
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Metadata block at the top of a SKILL.md file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        rename = "allowed-tools",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub allowed_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

impl Header {
    /// Check required fields and length caps. Any violation rejects the header.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::MissingField`] for a blank `name`/`description` and
    /// [`SkillError::FieldTooLong`] when a field exceeds its cap.
    pub fn validate(&self) -> Result<(), SkillError> {
        check_field("name", &self.name, MAX_NAME_LEN)?;
        check_field("description", &self.description, MAX_DESCRIPTION_LEN)
    }
}

fn check_field(field: &'static str, value: &str, max: usize) -> Result<(), SkillError> {
    if value.trim().is_empty() {
        return Err(SkillError::MissingField(field));
    }
    let len = value.chars().count();
    if len > max {
        return Err(SkillError::FieldTooLong { field, len, max });
    }
    Ok(())
}

/// Where a skill was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    /// User-scoped root, e.g. `~/.skilldeck/skills`.
    Global,
    /// Working-directory-scoped root; wins over `Global` on name collision.
    Project,
    Builtin,
    Plugin,
}

impl SkillSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
            Self::Builtin => "builtin",
            Self::Plugin => "plugin",
        }
    }
}

impl fmt::Display for SkillSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "project" => Ok(Self::Project),
            "builtin" => Ok(Self::Builtin),
            "plugin" => Ok(Self::Plugin),
            other => Err(format!("unknown skill source: {other}")),
        }
    }
}

/// Category of a bundled file, taken from its top-level directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Script,
    Reference,
    Asset,
    Other,
}

impl FileCategory {
    /// Classify a path relative to the skill directory.
    #[must_use]
    pub fn from_relative(relative: &Path) -> Self {
        let first = relative
            .components()
            .next()
            .and_then(|c| c.as_os_str().to_str());
        // A file directly under the skill root has no category directory.
        if relative.components().count() < 2 {
            return Self::Other;
        }
        match first {
            Some("scripts") => Self::Script,
            Some("references") => Self::Reference,
            Some("assets") => Self::Asset,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Script => "script",
            Self::Reference => "reference",
            Self::Asset => "asset",
            Self::Other => "other",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundledFile {
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    pub category: FileCategory,
}

/// Lightweight projection of a skill kept resident for discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillMetadata {
    pub name: String,
    pub description: String,
    pub source: SkillSource,
    pub path: PathBuf,
}

impl SkillMetadata {
    #[must_use]
    pub fn skill_md_path(&self) -> PathBuf {
        self.path.join(SKILL_FILE_NAME)
    }
}

/// A discovered skill. The body stays `None` until its content is loaded.
#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub header: Header,
    pub path: PathBuf,
    #[serde(skip)]
    pub(crate) body: Option<String>,
    pub files: Vec<BundledFile>,
    pub source: SkillSource,
    pub loaded_at: DateTime<Utc>,
}

impl Skill {
    #[must_use]
    pub fn new(header: Header, path: PathBuf, source: SkillSource) -> Self {
        Self {
            header,
            path,
            body: None,
            files: Vec::new(),
            source,
            loaded_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.header.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.header.description
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.body.is_some()
    }

    #[must_use]
    pub fn skill_md_path(&self) -> PathBuf {
        self.path.join(SKILL_FILE_NAME)
    }

    #[must_use]
    pub fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: self.header.name.clone(),
            description: self.header.description.clone(),
            source: self.source,
            path: self.path.clone(),
        }
    }

    /// Bundled files in one category.
    pub fn files_of(&self, category: FileCategory) -> impl Iterator<Item = &BundledFile> {
        self.files.iter().filter(move |f| f.category == category)
    }
}
