//! Integration test for logging commits to a file.
//!
//! The subscriber is process-global, so this is the only test in the binary
//! that installs one.

use crate::integration::test_utils::{memory_context, repository, user, User};
use stowage::{init_logging, LoggingConfig, Repository};
use tempfile::TempDir;

#[tokio::test]
async fn test_commit_is_logged_to_file_as_json() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("logs").join("stowage.log");
    let config = LoggingConfig {
        level: "info".to_string(),
        format: "json".to_string(),
        output: "file".to_string(),
        file: log_file.clone(),
        color: false,
        ..LoggingConfig::default()
    };
    init_logging(Some(&config)).unwrap();

    let context = memory_context();
    repository::<User>(&context)
        .add(&user(1, "ada"))
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&log_file).unwrap();
    let line = contents
        .lines()
        .find(|l| l.contains("Committed pending changes"))
        .expect("commit event logged");
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["level"], "INFO");
    assert_eq!(event["fields"]["affected"], 1);
}
