//! Integration tests for Configuration System

use crate::integration::test_utils::{with_xdg_env, User};
use std::sync::Arc;
use stowage::{ConfigLoader, EntityRepository, Repository, StoreBackend, StoreContext};
use tempfile::TempDir;

#[test]
fn test_global_file_is_layered_under_workspace_file() {
    let xdg_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    let global_dir = xdg_dir.path().join("stowage");
    std::fs::create_dir_all(&global_dir).unwrap();
    std::fs::write(
        global_dir.join("config.toml"),
        "[store]\nbackend = \"sled\"\n\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    let config_dir = workspace.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[logging]\nlevel = \"debug\"\n").unwrap();

    let config = with_xdg_env(&xdg_dir, || ConfigLoader::load(workspace.path())).unwrap();

    // Global file sets the backend, workspace file wins on level
    assert_eq!(config.store.backend, StoreBackend::Sled);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_env_specific_workspace_file() {
    let xdg_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let config_dir = workspace.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[logging]\nformat = \"text\"\n").unwrap();
    std::fs::write(config_dir.join("ci.toml"), "[logging]\nformat = \"json\"\n").unwrap();

    let config = with_xdg_env(&xdg_dir, || {
        std::env::set_var("STOWAGE_ENV", "ci");
        let result = ConfigLoader::load(workspace.path());
        std::env::remove_var("STOWAGE_ENV");
        result
    })
    .unwrap();

    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_invalid_workspace_value_is_reported() {
    let xdg_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let config_dir = workspace.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[logging]\nformat = \"xml\"\n").unwrap();

    let err = with_xdg_env(&xdg_dir, || ConfigLoader::load(workspace.path())).unwrap_err();
    assert!(err.to_string().contains("xml"));
}

#[tokio::test]
async fn test_loaded_config_opens_working_context() {
    let xdg_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let store_path = workspace.path().join("data");
    let config_dir = workspace.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!(
            "[store]\nbackend = \"sled\"\npath = {:?}\nflush_on_commit = false\n",
            store_path.to_str().unwrap()
        ),
    )
    .unwrap();

    let config = with_xdg_env(&xdg_dir, || ConfigLoader::load(workspace.path())).unwrap();
    let context = Arc::new(StoreContext::from_config(&config.store).unwrap());
    let users: EntityRepository<User, _> = EntityRepository::new(context);

    assert!(users.get_all(None).await.unwrap().is_empty());
    assert!(store_path.exists());
}
