//! Configuration loading through the public API.

use std::time::Duration;

use mainline::config::global_config_path;
use mainline::{ConfigError, ConfigLoader, MainlineConfig};
use tempfile::TempDir;

use super::test_utils::with_isolated_env;

#[test]
fn test_global_file_is_read_from_xdg_config_home() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    let config = with_isolated_env(&test_dir, || {
        let path = global_config_path().expect("config dir");
        assert!(path.starts_with(test_dir.path()));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "[context]\nthread_name = \"global\"\ndefault_timer_tolerance_ms = 5\n",
        )
        .unwrap();
        ConfigLoader::load(workspace.path()).unwrap()
    });

    assert_eq!(config.context.thread_name, "global");
    assert_eq!(config.context.default_timer_tolerance(), Duration::from_millis(5));
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::create_dir_all(workspace.path().join("config")).unwrap();
    std::fs::write(
        workspace.path().join("config/config.toml"),
        "[context]\nthread_name = \"workspace\"\n\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    let config = with_isolated_env(&test_dir, || {
        let path = global_config_path().unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "[context]\nthread_name = \"global\"\nminimum_tolerance_ms = 3\n",
        )
        .unwrap();
        ConfigLoader::load(workspace.path()).unwrap()
    });

    assert_eq!(config.context.thread_name, "workspace");
    assert_eq!(config.context.minimum_tolerance_ms, 3);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_environment_variables_override_every_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::create_dir_all(workspace.path().join("config")).unwrap();
    std::fs::write(
        workspace.path().join("config/config.toml"),
        "[logging]\nformat = \"text\"\n",
    )
    .unwrap();

    let config = with_isolated_env(&test_dir, || {
        std::env::set_var("MAINLINE__LOGGING__FORMAT", "json");
        std::env::set_var("MAINLINE__CONTEXT__DEFAULT_TIMER_TOLERANCE_MS", "8");
        ConfigLoader::load(workspace.path()).unwrap()
    });

    assert_eq!(config.logging.format, "json");
    assert_eq!(config.context.default_timer_tolerance_ms, 8);
}

#[test]
fn test_malformed_file_is_a_load_error() {
    let test_dir = TempDir::new().unwrap();
    let file = test_dir.path().join("broken.toml");
    std::fs::write(&file, "[context\nthread_name = ").unwrap();

    let result = ConfigLoader::load_from_file(&file);
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_defaults_match_default_impl() {
    assert_eq!(ConfigLoader::defaults().unwrap(), MainlineConfig::default());
}

#[test]
fn test_init_rejects_invalid_configuration() {
    let mut config = MainlineConfig::default();
    config.logging.level = "loud".to_string();
    config.context.thread_name = String::new();

    match mainline::init(&config) {
        Err(ConfigError::Invalid(message)) => {
            assert!(message.contains("Context"));
            assert!(message.contains("loud"));
        }
        other => panic!("expected invalid configuration, got {other:?}"),
    }
}
