use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn missing_key_reads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.get_item("user").await.expect("read").is_none());
    assert!(storage.get_record("user").await.expect("read").is_none());
}

#[tokio::test]
async fn set_item_overwrites_previous_value() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.set_item("user", "first").await.expect("write");
    storage.set_item("user", "second").await.expect("overwrite");

    assert_eq!(
        storage.get_item("user").await.expect("read").as_deref(),
        Some("second")
    );
    assert_eq!(storage.keys().await.expect("keys"), vec!["user".to_string()]);

    let record = storage
        .get_record("user")
        .await
        .expect("read")
        .expect("record");
    assert_eq!(record.key, "user");
    assert_eq!(record.value, "second");
}

#[tokio::test]
async fn remove_item_reports_whether_anything_was_deleted() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.set_item("user", "{}").await.expect("write");

    assert!(storage.remove_item("user").await.expect("remove"));
    assert!(!storage.remove_item("user").await.expect("remove again"));
    assert!(storage.get_item("user").await.expect("read").is_none());
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("pension_portal_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("portal.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn memory_url_has_no_filesystem_path() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert!(sqlite_path("postgres://localhost/db").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/portal.db?mode=rwc"),
        Some(PathBuf::from("./data/portal.db"))
    );
}
