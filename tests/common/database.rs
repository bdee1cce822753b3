//! Test database setup
#![allow(dead_code)]

use flowduck::app_config::{self, AppConfig, Mode};
use sea_orm::{DatabaseConnection, DbErr};
use std::path::Path;

/// Configuration every test runs under: mocked e-mail, the in-process SSE
/// broker and uploads kept under `upload_dir`.
pub fn test_config(upload_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.site.mode = Mode::Test;
    config.site.server_name = "localhost:8080".to_owned();
    config.database.url = "sqlite::memory:".to_owned();
    config.email.mock = true;
    config.sse.redis_url = String::new();
    config.storage.local_path = upload_dir.to_string_lossy().into_owned();
    config
}

/// Installs the test configuration and opens a fresh in-memory database.
///
/// Every call yields an empty database, so tests never see each other's rows.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    app_config::set_config(test_config(&std::env::temp_dir().join("flowduck-test-uploads")));
    flowduck::db::init_db("sqlite::memory:", 1).await
}
