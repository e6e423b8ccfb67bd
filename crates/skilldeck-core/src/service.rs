//! Host-facing operations over a [`SkillRegistry`]: listing, viewing,
//! prompt injection, and per-message skill hints.

use std::fmt::Write;
use std::sync::Arc;

use skilldeck_skills::parser::{extract_outline, extract_section};
use skilldeck_skills::{SkillMetadata, SkillRegistry, SkillSource, SourceLoader};

use crate::config::Config;
use crate::error::ServiceError;

/// How much of a skill [`SkillService::view`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    Full,
    /// Indented list of every heading.
    Outline,
    /// One heading and everything nested under it.
    Section(String),
}

#[derive(Debug, Clone)]
pub struct SkillService {
    registry: Arc<SkillRegistry>,
}

impl SkillService {
    #[must_use]
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self { registry }
    }

    /// Build and initialize a registry from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or a skill root cannot be read.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        config.validate()?;
        let weights = config.matching.weights();
        weights.validate()?;

        let registry = SkillRegistry::with_weights(
            SourceLoader::new(config.skills.loader_config()),
            weights,
        );
        let count = registry.initialize()?;
        tracing::info!(count, "skills loaded");
        Ok(Self::new(Arc::new(registry)))
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// Start the hot-reload watcher when `skills.auto_watch` is set.
    ///
    /// Failure is logged; the service keeps serving the loaded snapshot.
    /// Must be called from within a Tokio runtime.
    pub fn watch_if_enabled(&self, config: &Config) {
        if !config.skills.auto_watch {
            return;
        }
        if let Err(e) = self.registry.start_watching(config.skills.watcher_config()) {
            tracing::warn!("failed to start skill watcher: {e}");
        }
    }

    /// Skills whose name or description contains `filter` (case-insensitive)
    /// and whose source matches `source`. Blank filters are ignored.
    #[must_use]
    pub fn filter(&self, filter: Option<&str>, source: Option<SkillSource>) -> Vec<SkillMetadata> {
        let keyword = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);
        self.registry
            .metadata()
            .iter()
            .filter(|m| source.is_none_or(|s| m.source == s))
            .filter(|m| {
                keyword.as_deref().is_none_or(|k| {
                    m.name.to_lowercase().contains(k) || m.description.to_lowercase().contains(k)
                })
            })
            .cloned()
            .collect()
    }

    /// Markdown listing of the skills selected by [`SkillService::filter`].
    #[must_use]
    pub fn list(&self, filter: Option<&str>, source: Option<SkillSource>) -> String {
        if self.registry.count() == 0 {
            return "No skills available.".into();
        }

        let matches = self.filter(filter, source);
        if matches.is_empty() {
            let filtered = filter.is_some_and(|f| !f.trim().is_empty()) || source.is_some();
            return if filtered {
                "No skills match the specified filters.".into()
            } else {
                "No skills available.".into()
            };
        }

        let mut out = format!("Found {} skill(s):\n\n", matches.len());
        for m in &matches {
            let _ = write!(
                out,
                "## {}\n- **Source**: {}\n- **Location**: {}\n- **Description**: {}\n\n",
                m.name,
                m.source,
                m.skill_md_path().display(),
                m.description,
            );
        }
        out
    }

    /// Skill body, outline, or a single section.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Skill`] if the skill cannot be loaded, or
    /// [`ServiceError::SectionNotFound`] for an unknown section heading.
    pub fn view(&self, name: &str, mode: &ViewMode) -> Result<String, ServiceError> {
        let content = self.registry.get_content(name)?;
        match mode {
            ViewMode::Full => Ok(content),
            ViewMode::Outline => {
                let outline = extract_outline(&content);
                if outline.is_empty() {
                    Ok("No headings found in this skill.".into())
                } else {
                    Ok(outline)
                }
            }
            ViewMode::Section(heading) => {
                let section = extract_section(&content, heading);
                if section.is_empty() {
                    Err(ServiceError::SectionNotFound {
                        section: heading.clone(),
                        skill: name.to_owned(),
                    })
                } else {
                    Ok(section)
                }
            }
        }
    }

    /// Append the available-skills block and usage instructions to a base
    /// system prompt. The base is returned unchanged when no skills exist.
    #[must_use]
    pub fn inject_prompt(&self, base: &str) -> String {
        let section = self.registry.prompt_section();
        if section.is_empty() {
            return base.to_owned();
        }
        format!(
            "{base}\n\n{section}\n{}",
            self.registry.skills_instructions()
        )
    }

    /// Hint pointing at the best-matching skill for a user message, if any.
    #[must_use]
    pub fn suggest(&self, message: &str) -> Option<String> {
        let skill = self.registry.find_match(message)?;
        tracing::debug!(name = %skill.name, "suggesting skill");
        Some(format!(
            "[Hint: The '{}' skill may be relevant for this task. Consider reading {} for specialized instructions.]",
            skill.name,
            skill.skill_md_path().display(),
        ))
    }
}
