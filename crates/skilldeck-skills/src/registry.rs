//! Thread-safe skill registry with an on-demand content cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tokio::sync::watch;

use crate::error::SkillError;
use crate::loader::SourceLoader;
use crate::matcher::{MatchWeights, find_best_match};
use crate::prompt;
use crate::types::{Skill, SkillMetadata};
use crate::watcher::{ReloadTarget, SkillWatcher, WatcherConfig};

#[derive(Default)]
struct RegistryState {
    ready: bool,
    /// Bumped on every reload so late cache inserts from the previous
    /// generation are dropped.
    generation: u64,
    metadata: Arc<Vec<SkillMetadata>>,
    cache: HashMap<String, Arc<Skill>>,
}

/// Merged skill metadata plus lazily loaded skill content.
///
/// Metadata is rebuilt wholesale by [`SkillRegistry::initialize`] and
/// [`SkillRegistry::reload`]; full skills are loaded on first
/// [`SkillRegistry::get`] and cached until the next reload.
pub struct SkillRegistry {
    loader: SourceLoader,
    weights: MatchWeights,
    state: RwLock<RegistryState>,
    watcher: Mutex<Option<SkillWatcher>>,
}

impl std::fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SkillRegistry")
            .field("loader", &self.loader)
            .field("ready", &state.ready)
            .field("skills", &state.metadata.len())
            .field("cached", &state.cache.len())
            .finish_non_exhaustive()
    }
}

impl SkillRegistry {
    #[must_use]
    pub fn new(loader: SourceLoader) -> Self {
        Self::with_weights(loader, MatchWeights::default())
    }

    #[must_use]
    pub fn with_weights(loader: SourceLoader, weights: MatchWeights) -> Self {
        Self {
            loader,
            weights,
            state: RwLock::new(RegistryState::default()),
            watcher: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn loader(&self) -> &SourceLoader {
        &self.loader
    }

    /// Scan both roots and publish the merged metadata. Returns the skill count.
    ///
    /// # Errors
    ///
    /// Returns an error if a root exists but cannot be read; the previous
    /// state is left untouched in that case.
    pub fn initialize(&self) -> Result<usize, SkillError> {
        let report = self.loader.load_metadata()?;
        report.log_warnings();
        let count = report.items.len();

        let mut state = self.write();
        state.cache.clear();
        state.metadata = Arc::new(report.items);
        state.generation += 1;
        state.ready = true;
        drop(state);

        tracing::debug!(count, "skill registry loaded");
        Ok(count)
    }

    /// Rescan from disk, dropping all cached content.
    ///
    /// # Errors
    ///
    /// See [`SkillRegistry::initialize`].
    pub fn reload(&self) -> Result<usize, SkillError> {
        self.initialize()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.read().ready
    }

    /// Snapshot of the current metadata list.
    #[must_use]
    pub fn metadata(&self) -> Arc<Vec<SkillMetadata>> {
        Arc::clone(&self.read().metadata)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.read().metadata.len()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.read().metadata.iter().map(|m| m.name.clone()).collect()
    }

    /// Fully loaded skill by name, from cache or disk.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::NotFound`] for an unknown name, or
    /// [`SkillError::Load`] naming the skill when it exists but fails to load.
    pub fn get(&self, name: &str) -> Result<Arc<Skill>, SkillError> {
        self.get_or_load(name, |name| self.loader.load_skill(name))
    }

    /// Cache lookup with `load` run outside the lock on a miss. The result is
    /// cached only if no reload happened in between.
    fn get_or_load(
        &self,
        name: &str,
        load: impl FnOnce(&str) -> Result<Skill, SkillError>,
    ) -> Result<Arc<Skill>, SkillError> {
        let generation = {
            let state = self.read();
            if let Some(skill) = state.cache.get(name) {
                return Ok(Arc::clone(skill));
            }
            state.generation
        };

        let skill = Arc::new(load(name).map_err(|e| e.for_skill(name))?);

        let mut state = self.write();
        if state.generation == generation {
            state.cache.insert(name.to_owned(), Arc::clone(&skill));
        } else {
            tracing::debug!(name, "registry reloaded during load, not caching");
        }
        Ok(skill)
    }

    /// Body text of a skill.
    ///
    /// # Errors
    ///
    /// See [`SkillRegistry::get`].
    pub fn get_content(&self, name: &str) -> Result<String, SkillError> {
        let skill = self.get(name)?;
        Ok(skill.body().unwrap_or_default().to_owned())
    }

    /// Best keyword match for `query` among the current metadata.
    #[must_use]
    pub fn find_match(&self, query: &str) -> Option<SkillMetadata> {
        let metadata = self.metadata();
        find_best_match(&metadata, query, &self.weights).cloned()
    }

    /// `<available_skills>` block for the current metadata, empty when none.
    #[must_use]
    pub fn prompt_section(&self) -> String {
        prompt::format_skills_section(&self.metadata())
    }

    #[must_use]
    pub fn skills_instructions(&self) -> &'static str {
        prompt::skills_instructions()
    }

    /// Watch both roots and reload on change.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::AlreadyRunning`] if this registry is already
    /// watching, or an error from the notification backend.
    pub fn start_watching(self: &Arc<Self>, config: WatcherConfig) -> Result<(), SkillError> {
        self.spawn_watcher(config, None)
    }

    /// Like [`SkillRegistry::start_watching`], but the watcher also stops when
    /// `cancel` becomes `true`.
    ///
    /// # Errors
    ///
    /// See [`SkillRegistry::start_watching`].
    pub fn start_watching_until(
        self: &Arc<Self>,
        config: WatcherConfig,
        cancel: watch::Receiver<bool>,
    ) -> Result<(), SkillError> {
        self.spawn_watcher(config, Some(cancel))
    }

    fn spawn_watcher(
        self: &Arc<Self>,
        config: WatcherConfig,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<(), SkillError> {
        let mut slot = self.lock_watcher();
        if slot.as_ref().is_some_and(SkillWatcher::is_running) {
            return Err(SkillError::AlreadyRunning);
        }

        let dirs = self
            .loader
            .config()
            .roots()
            .iter()
            .map(|(root, _)| root.to_path_buf())
            .collect();
        let target = Arc::new(RegistryHandle(Arc::downgrade(self)));
        let mut watcher = SkillWatcher::new(target, dirs, config);
        if let Some(cancel) = cancel {
            watcher = watcher.with_cancellation(cancel);
        }
        watcher.start()?;
        *slot = Some(watcher);
        Ok(())
    }

    /// Stop the watcher, if any, and wait for its event loop to exit.
    pub async fn stop_watching(&self) {
        let watcher = self.lock_watcher().take();
        if let Some(mut watcher) = watcher {
            watcher.stop().await;
        }
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.lock_watcher()
            .as_ref()
            .is_some_and(SkillWatcher::is_running)
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_watcher(&self) -> MutexGuard<'_, Option<SkillWatcher>> {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reload handle given to the watcher. Holds a weak reference so the
/// registry and its watcher do not keep each other alive.
struct RegistryHandle(Weak<SkillRegistry>);

impl ReloadTarget for RegistryHandle {
    fn reload(&self) -> Result<usize, SkillError> {
        match self.0.upgrade() {
            Some(registry) => registry.reload(),
            None => Ok(0),
        }
    }
}
