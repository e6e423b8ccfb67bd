use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 6] = [
    "SKILLDECK_GLOBAL_DIR",
    "SKILLDECK_PROJECT_DIR",
    "SKILLDECK_AUTO_WATCH",
    "SKILLDECK_DEBOUNCE_MS",
    "SKILLDECK_LOG_LEVEL",
    "SKILLDECK_CONFIG",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.skills.global_dir, "~/.skilldeck/skills");
    assert_eq!(config.skills.project_dir, ".skilldeck/skills");
    assert!(!config.skills.auto_watch);
    assert_eq!(config.skills.debounce_ms, 100);
    assert_eq!(config.matching.name_weight, 3);
    assert_eq!(config.matching.description_weight, 1);
    assert_eq!(config.matching.min_word_len, 3);
    assert_eq!(config.matching.min_score, 2);
    assert_eq!(config.logging.level, "info");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn load_missing_file_uses_defaults() {
    clear_env();
    let config = Config::load(Path::new("/nonexistent/skilldeck.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn load_partial_file() {
    clear_env();
    let file = write_config(
        r#"
[skills]
project_dir = "skills"
auto_watch = true

[matching]
min_score = 4
"#,
    );
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.skills.project_dir, "skills");
    assert_eq!(config.skills.global_dir, "~/.skilldeck/skills");
    assert!(config.skills.auto_watch);
    assert_eq!(config.matching.min_score, 4);
    assert_eq!(config.matching.name_weight, 3);
    assert_eq!(config.logging.level, "info");
}

#[test]
#[serial]
fn load_invalid_toml_errors() {
    clear_env();
    let file = write_config("[skills\nglobal_dir = ");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
#[serial]
fn load_wrong_type_errors() {
    clear_env();
    let file = write_config("[skills]\ndebounce_ms = \"fast\"\n");
    assert!(Config::load(file.path()).is_err());
}

#[test]
#[serial]
fn env_overrides_file() {
    clear_env();
    let file = write_config("[skills]\nglobal_dir = \"/from/file\"\ndebounce_ms = 50\n");
    unsafe {
        std::env::set_var("SKILLDECK_GLOBAL_DIR", "/from/env");
        std::env::set_var("SKILLDECK_PROJECT_DIR", "/project/env");
        std::env::set_var("SKILLDECK_AUTO_WATCH", "true");
        std::env::set_var("SKILLDECK_DEBOUNCE_MS", "250");
        std::env::set_var("SKILLDECK_LOG_LEVEL", "debug");
    }

    let config = Config::load(file.path()).unwrap();
    clear_env();

    assert_eq!(config.skills.global_dir, "/from/env");
    assert_eq!(config.skills.project_dir, "/project/env");
    assert!(config.skills.auto_watch);
    assert_eq!(config.skills.debounce_ms, 250);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn invalid_env_values_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("SKILLDECK_AUTO_WATCH", "sometimes");
        std::env::set_var("SKILLDECK_DEBOUNCE_MS", "-5");
        std::env::set_var("SKILLDECK_LOG_LEVEL", "  ");
    }

    let config = Config::load(Path::new("/nonexistent/skilldeck.toml")).unwrap();
    clear_env();

    assert!(!config.skills.auto_watch);
    assert_eq!(config.skills.debounce_ms, 100);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn validate_rejects_empty_dirs() {
    let mut config = Config::default();
    config.skills.global_dir = "  ".into();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.skills.project_dir = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn validate_debounce_bounds() {
    let mut config = Config::default();
    config.skills.debounce_ms = 0;
    assert!(config.validate().is_err());
    config.skills.debounce_ms = 60_001;
    assert!(config.validate().is_err());
    config.skills.debounce_ms = 60_000;
    assert!(config.validate().is_ok());
    config.skills.debounce_ms = 1;
    assert!(config.validate().is_ok());
}

#[test]
fn validate_rejects_zero_name_weight() {
    let mut config = Config::default();
    config.matching.name_weight = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("name_weight"));
}

#[test]
fn converts_to_library_configs() {
    let mut config = Config::default();
    config.skills.global_dir = "/g".into();
    config.skills.project_dir = "/p".into();
    config.skills.debounce_ms = 250;
    config.matching.min_score = 5;

    let loader = config.skills.loader_config();
    assert_eq!(loader.global_dir, Path::new("/g"));
    assert_eq!(loader.project_dir, Path::new("/p"));
    assert_eq!(
        config.skills.watcher_config().debounce,
        Duration::from_millis(250)
    );
    let weights = config.matching.weights();
    assert_eq!(weights.min_score, 5);
    assert_eq!(weights.name_weight, 3);
    assert_eq!(weights.description_min_word_len, 3);
}

#[test]
fn home_prefix_is_expanded() {
    let loader = Config::default().skills.loader_config();
    if let Some(home) = dirs_home() {
        assert!(loader.global_dir.starts_with(home));
    }
    assert!(!loader.global_dir.starts_with("~"));
}

fn dirs_home() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME").map(std::path::PathBuf::from)
}

#[test]
fn serialize_roundtrip() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).unwrap();
    let back: Config = toml::from_str(&toml_str).unwrap();
    assert_eq!(back, config);
}

#[test]
#[serial]
fn config_path_resolution_order() {
    clear_env();
    assert_eq!(
        resolve_config_path(None),
        Path::new(".skilldeck/config.toml")
    );

    unsafe { std::env::set_var("SKILLDECK_CONFIG", "/etc/skilldeck.toml") };
    assert_eq!(resolve_config_path(None), Path::new("/etc/skilldeck.toml"));
    assert_eq!(
        resolve_config_path(Some(Path::new("cli.toml"))),
        Path::new("cli.toml")
    );
    clear_env();
}
