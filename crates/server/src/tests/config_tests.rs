use super::*;

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(None, env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.newsletter_api_url, "https://api.convertkit.com");
}

#[test]
fn file_values_override_defaults() {
    let raw = r#"
        bind_addr = "0.0.0.0:8080"
        content_dir = "/srv/content"
        newsletter_timeout_secs = 3
    "#;
    let settings = load_settings_from(Some(raw), env_from(&[]));
    assert_eq!(settings.server_bind, "0.0.0.0:8080");
    assert_eq!(settings.content_dir, PathBuf::from("/srv/content"));
    assert_eq!(settings.newsletter_timeout_secs, 3);
    assert_eq!(settings.database_url, Settings::default().database_url);
}

#[test]
fn env_overrides_file() {
    let raw = r#"database_url = "sqlite://./from-file.db""#;
    let settings = load_settings_from(
        Some(raw),
        env_from(&[
            ("DATABASE_URL", "sqlite://./from-env.db"),
            ("APP__NEWSLETTER_API_KEY", "key-123"),
        ]),
    );
    assert_eq!(settings.database_url, "sqlite://./from-env.db");
    assert_eq!(settings.newsletter_api_key, "key-123");
    assert_eq!(settings.newsletter_config().api_key, "key-123");
}

#[test]
fn unreadable_file_and_bad_numbers_are_ignored() {
    let settings = load_settings_from(
        Some("this is = = not toml"),
        env_from(&[("APP__NEWSLETTER_TIMEOUT_SECS", "soon")]),
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite:data/test.db"), "sqlite://data/test.db");
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn creates_parent_dir_for_sqlite_url() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("site.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
