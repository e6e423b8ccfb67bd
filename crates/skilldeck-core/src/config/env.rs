use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SKILLDECK_GLOBAL_DIR") {
            self.skills.global_dir = v;
        }
        if let Ok(v) = std::env::var("SKILLDECK_PROJECT_DIR") {
            self.skills.project_dir = v;
        }
        if let Ok(v) = std::env::var("SKILLDECK_AUTO_WATCH") {
            if let Ok(enabled) = v.parse::<bool>() {
                self.skills.auto_watch = enabled;
            } else {
                tracing::warn!("ignoring invalid SKILLDECK_AUTO_WATCH value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SKILLDECK_DEBOUNCE_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                self.skills.debounce_ms = ms;
            } else {
                tracing::warn!("ignoring invalid SKILLDECK_DEBOUNCE_MS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SKILLDECK_LOG_LEVEL")
            && !v.trim().is_empty()
        {
            self.logging.level = v;
        }
    }
}
