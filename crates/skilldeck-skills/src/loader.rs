//! Skill discovery across the global and project roots.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::SkillError;
use crate::parser;
use crate::resource::discover_bundled_files;
use crate::types::{Header, SKILL_FILE_NAME, Skill, SkillMetadata, SkillSource};

const DEFAULT_GLOBAL_DIR: &str = "~/.skilldeck/skills";
const DEFAULT_PROJECT_DIR: &str = ".skilldeck/skills";

/// Roots scanned for skill directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub global_dir: PathBuf,
    pub project_dir: PathBuf,
}

impl LoaderConfig {
    /// Build a config, expanding a leading `~/` in either root.
    #[must_use]
    pub fn new(global_dir: impl AsRef<Path>, project_dir: impl AsRef<Path>) -> Self {
        Self {
            global_dir: expand_home(global_dir.as_ref()),
            project_dir: expand_home(project_dir.as_ref()),
        }
    }

    /// Roots in precedence order: later entries override earlier ones.
    #[must_use]
    pub fn roots(&self) -> [(&Path, SkillSource); 2] {
        [
            (self.global_dir.as_path(), SkillSource::Global),
            (self.project_dir.as_path(), SkillSource::Project),
        ]
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GLOBAL_DIR, DEFAULT_PROJECT_DIR)
    }
}

/// Replace a leading `~` component with the user's home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

/// A skipped entry from a bulk load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Outcome of a bulk load: everything that loaded plus what was skipped.
#[derive(Debug, Clone)]
pub struct LoadReport<T> {
    pub items: Vec<T>,
    pub warnings: Vec<LoadWarning>,
}

impl<T> LoadReport<T> {
    /// Emit each warning through `tracing`.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path.display(), "skipping skill: {}", warning.reason);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceLoader {
    config: LoaderConfig,
}

impl SourceLoader {
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Fully load every skill (header, body, bundled files), project over global.
    ///
    /// # Errors
    ///
    /// Returns an error only if a root exists but cannot be read. Bad entries
    /// become warnings.
    pub fn load_all(&self) -> Result<LoadReport<Skill>, SkillError> {
        self.merge(load_full, |s| s.name().to_owned())
    }

    /// Load only header metadata for every skill, project over global.
    ///
    /// # Errors
    ///
    /// Returns an error only if a root exists but cannot be read.
    pub fn load_metadata(&self) -> Result<LoadReport<SkillMetadata>, SkillError> {
        self.merge(
            |dir, source| {
                let header = parser::parse_metadata_only(&dir.join(SKILL_FILE_NAME))?;
                Ok(SkillMetadata {
                    name: header.name,
                    description: header.description,
                    source,
                    path: dir.to_path_buf(),
                })
            },
            |m| m.name.clone(),
        )
    }

    /// Find a skill by name, checking the project root before the global one.
    ///
    /// Within a root the directory that wins the bulk merge is returned. The
    /// returned skill has its bundled files listed but no body; use
    /// [`SourceLoader::load_content`] to populate it.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::NotFound`] if no root has a valid match and no
    /// directory named after the skill exists. If such a directory exists but
    /// its SKILL.md is broken, that parse error is returned instead.
    pub fn discover_skill(&self, name: &str) -> Result<Skill, SkillError> {
        let mut first_error = None;
        for (root, source) in self.config.roots().into_iter().rev() {
            match find_in_root(root, name) {
                Ok(Some((dir, header))) => {
                    let mut skill = Skill::new(header, dir.clone(), source);
                    skill.files = discover_bundled_files(&dir)?;
                    return Ok(skill);
                }
                Ok(None) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| SkillError::NotFound(name.to_owned())))
    }

    /// Find a skill by name and load its body.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::NotFound`] or the first parse/I/O error.
    pub fn load_skill(&self, name: &str) -> Result<Skill, SkillError> {
        let mut skill = self.discover_skill(name)?;
        self.load_content(&mut skill)?;
        Ok(skill)
    }

    /// Populate the body of a skill once. Later calls return the cached body.
    ///
    /// # Errors
    ///
    /// Returns an error if SKILL.md cannot be read or parsed.
    pub fn load_content<'a>(&self, skill: &'a mut Skill) -> Result<&'a str, SkillError> {
        if skill.body.is_none() {
            let (_, body) = parser::parse_file(&skill.skill_md_path())?;
            skill.body = Some(body);
            skill.loaded_at = chrono::Utc::now();
        }
        Ok(skill.body.as_deref().unwrap_or_default())
    }

    fn merge<T>(
        &self,
        load: impl Fn(&Path, SkillSource) -> Result<T, SkillError>,
        key: impl Fn(&T) -> String,
    ) -> Result<LoadReport<T>, SkillError> {
        let mut merged = BTreeMap::new();
        let mut warnings = Vec::new();

        for (root, source) in self.config.roots() {
            for dir in skill_dirs(root, &mut warnings)? {
                match load(&dir, source) {
                    Ok(item) => {
                        if merged.insert(key(&item), item).is_some() {
                            tracing::debug!(dir = %dir.display(), "{source} skill overrides earlier entry");
                        }
                    }
                    Err(e) => warnings.push(LoadWarning {
                        path: dir,
                        reason: e.to_string(),
                    }),
                }
            }
        }

        Ok(LoadReport {
            items: merged.into_values().collect(),
            warnings,
        })
    }
}

fn load_full(dir: &Path, source: SkillSource) -> Result<Skill, SkillError> {
    let (header, body) = parser::parse_file(&dir.join(SKILL_FILE_NAME))?;
    let mut skill = Skill::new(header, dir.to_path_buf(), source);
    skill.body = Some(body);
    skill.files = discover_bundled_files(dir)?;
    Ok(skill)
}

/// Subdirectories of `root` that contain a SKILL.md. A missing root yields none.
fn skill_dirs(root: &Path, warnings: &mut Vec<LoadWarning>) -> Result<Vec<PathBuf>, SkillError> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(root = %root.display(), "skill root does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(SkillError::Io(e)),
    };

    Ok(filter_skill_dirs(
        root,
        entries.map(|entry| entry.map(|e| e.path())),
        warnings,
    ))
}

/// Keep directories holding a SKILL.md, sorted. Unreadable entries and
/// directories without a SKILL.md become warnings.
fn filter_skill_dirs(
    root: &Path,
    entries: impl IntoIterator<Item = std::io::Result<PathBuf>>,
    warnings: &mut Vec<LoadWarning>,
) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warnings.push(LoadWarning {
                    path: root.to_path_buf(),
                    reason: format!("unreadable directory entry: {e}"),
                });
                continue;
            }
        };
        if !path.is_dir() {
            continue;
        }
        if path.join(SKILL_FILE_NAME).is_file() {
            dirs.push(path);
        } else {
            warnings.push(LoadWarning {
                path,
                reason: format!("no {SKILL_FILE_NAME} found"),
            });
        }
    }
    dirs.sort();
    dirs
}

/// Locate skill `name` under `root`, agreeing with [`SourceLoader::load_metadata`]:
/// when several directories declare the name, the last one in sorted order wins.
///
/// A broken SKILL.md in the directory named after the skill is reported as an
/// error when nothing else in the root matches.
fn find_in_root(root: &Path, name: &str) -> Result<Option<(PathBuf, Header)>, SkillError> {
    let mut ignored = Vec::new();
    let mut found = None;
    let mut broken = None;

    for dir in skill_dirs(root, &mut ignored)? {
        match parser::parse_metadata_only(&dir.join(SKILL_FILE_NAME)) {
            Ok(header) if header.name == name => found = Some((dir, header)),
            Ok(_) => {}
            Err(e) if dir.file_name().is_some_and(|f| f == name) => {
                tracing::warn!(dir = %dir.display(), "skill '{name}' failed to parse: {e}");
                broken = Some(e);
            }
            Err(_) => {}
        }
    }

    match (found, broken) {
        (Some(hit), _) => Ok(Some(hit)),
        (None, Some(e)) => Err(e),
        (None, None) => Ok(None),
    }
}
