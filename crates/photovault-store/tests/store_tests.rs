//! Integration tests for the metadata store backends
//!
//! Every contract test runs against both the JSON file store and an
//! in-memory SQLite store.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use photovault_core::checksum::compute_checksum;
use photovault_core::domain::{newtypes::PhotoId, ExifData, PhotoError, PhotoRecord};
use photovault_core::ports::IMetadataStore;
use photovault_store::{DatabasePool, JsonMetadataStore, SqliteMetadataStore};

// ============================================================================
// Test helpers
// ============================================================================

/// Keeps the temp dir alive for as long as the JSON store is used
struct Backends {
    _dir: tempfile::TempDir,
    stores: Vec<(&'static str, Arc<dyn IMetadataStore>)>,
}

async fn backends() -> Backends {
    let dir = tempfile::tempdir().expect("create temp dir");
    let json = JsonMetadataStore::new(dir.path().join("metadata.json"));
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    let sqlite = SqliteMetadataStore::new(pool.pool().clone());

    Backends {
        _dir: dir,
        stores: vec![("json", Arc::new(json)), ("sqlite", Arc::new(sqlite))],
    }
}

fn record(content: &[u8], filename: &str) -> PhotoRecord {
    let id = PhotoId::new();
    PhotoRecord {
        id,
        original_filename: filename.to_string(),
        mime_type: "image/jpeg".to_string(),
        size: content.len() as u64,
        width: Some(640),
        height: Some(480),
        created_at: Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap(),
        taken_at: None,
        checksum: compute_checksum(content),
        storage_path: format!("2024/03/{}.jpg", id),
        thumbnail_path: Some(format!("{}.jpg", id)),
        exif: None,
    }
}

// ============================================================================
// Contract tests
// ============================================================================

#[tokio::test]
async fn test_save_and_get_round_trip() {
    for (name, store) in backends().await.stores {
        let rec = record(b"first photo", "a.jpg");
        store.save(&rec).await.unwrap();

        let loaded = store.get(&rec.id).await.unwrap();
        assert_eq!(loaded.as_ref(), Some(&rec), "backend {name}");
        assert_eq!(store.count().await.unwrap(), 1, "backend {name}");
    }
}

#[tokio::test]
async fn test_get_missing_returns_none() {
    for (name, store) in backends().await.stores {
        assert!(store.get(&PhotoId::new()).await.unwrap().is_none(), "backend {name}");
    }
}

#[tokio::test]
async fn test_load_all_preserves_insertion_order() {
    for (name, store) in backends().await.stores {
        let recs: Vec<_> = (0..5)
            .map(|i| record(format!("photo {i}").as_bytes(), &format!("{i}.jpg")))
            .collect();
        for rec in &recs {
            store.save(rec).await.unwrap();
        }

        let ids: Vec<_> = store.load_all().await.unwrap().into_iter().map(|r| r.id).collect();
        let expected: Vec<_> = recs.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected, "backend {name}");
    }
}

#[tokio::test]
async fn test_save_is_upsert() {
    for (name, store) in backends().await.stores {
        let mut rec = record(b"upsert me", "before.jpg");
        store.save(&rec).await.unwrap();

        rec.original_filename = "after.jpg".to_string();
        rec.taken_at = Some(rec.created_at - Duration::days(3));
        store.save(&rec).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1, "backend {name}");
        let loaded = store.get(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.original_filename, "after.jpg", "backend {name}");
        assert_eq!(loaded.taken_at, rec.taken_at, "backend {name}");
    }
}

#[tokio::test]
async fn test_duplicate_checksum_rejected_with_existing_id() {
    for (name, store) in backends().await.stores {
        let first = record(b"same bytes", "one.jpg");
        let second = record(b"same bytes", "two.jpg");
        store.save(&first).await.unwrap();

        let err = store.save(&second).await.unwrap_err();
        assert_eq!(err, PhotoError::duplicate(first.id), "backend {name}");
        assert_eq!(store.count().await.unwrap(), 1, "backend {name}");
        assert!(store.get(&second.id).await.unwrap().is_none(), "backend {name}");
    }
}

#[tokio::test]
async fn test_concurrent_duplicate_saves_only_one_wins() {
    for (name, store) in backends().await.stores {
        let a = record(b"racing bytes", "a.jpg");
        let b = record(b"racing bytes", "b.jpg");

        let (ra, rb) = tokio::join!(store.save(&a), store.save(&b));
        let wins = [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(wins, 1, "backend {name}");

        let loser = if ra.is_ok() { rb } else { ra };
        assert!(loser.unwrap_err().is_duplicate(), "backend {name}");
        assert_eq!(store.count().await.unwrap(), 1, "backend {name}");
    }
}

#[tokio::test]
async fn test_find_by_checksum() {
    for (name, store) in backends().await.stores {
        let rec = record(b"find me", "f.jpg");
        store.save(&rec).await.unwrap();

        let found = store.find_by_checksum(&rec.checksum).await.unwrap();
        assert_eq!(found.map(|r| r.id), Some(rec.id), "backend {name}");

        let other = compute_checksum(b"not stored");
        assert!(store.find_by_checksum(&other).await.unwrap().is_none(), "backend {name}");
    }
}

#[tokio::test]
async fn test_delete_reports_whether_removed() {
    for (name, store) in backends().await.stores {
        let rec = record(b"delete me", "d.jpg");
        store.save(&rec).await.unwrap();

        assert!(store.delete(&rec.id).await.unwrap(), "backend {name}");
        assert!(!store.delete(&rec.id).await.unwrap(), "backend {name}");
        assert!(store.get(&rec.id).await.unwrap().is_none(), "backend {name}");

        // Content can be stored again once its record is gone
        store.save(&record(b"delete me", "again.jpg")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1, "backend {name}");
    }
}

#[tokio::test]
async fn test_exif_round_trip_and_cascade() {
    for (name, store) in backends().await.stores {
        let mut rec = record(b"with exif", "e.jpg");
        rec.exif = Some(ExifData {
            camera_make: Some("Canon".to_string()),
            camera_model: Some("EOS R5".to_string()),
            focal_length: Some(50.0),
            aperture: Some(1.8),
            shutter_speed: Some("1/125".to_string()),
            iso: Some(400),
            latitude: Some(35.6762),
            longitude: Some(139.6503),
            date_time_original: Some(Utc.with_ymd_and_hms(2023, 12, 24, 18, 0, 0).unwrap()),
            ..ExifData::default()
        });
        store.save(&rec).await.unwrap();

        let loaded = store.get(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.exif, rec.exif, "backend {name}");

        store.delete(&rec.id).await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty(), "backend {name}");
    }
}

// ============================================================================
// Backend-specific tests
// ============================================================================

#[tokio::test]
async fn test_json_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("metadata.json");

    let rec = record(b"persisted", "p.jpg");
    {
        let store = JsonMetadataStore::new(&path);
        store.save(&rec).await.unwrap();
    }

    assert!(path.exists());
    assert!(!path.with_file_name("metadata.json.tmp").exists());

    let reopened = JsonMetadataStore::new(&path);
    assert_eq!(reopened.get(&rec.id).await.unwrap(), Some(rec));
}

#[tokio::test]
async fn test_json_store_writes_camel_case_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metadata.json");
    let store = JsonMetadataStore::new(&path);
    store.save(&record(b"shape", "s.jpg")).await.unwrap();

    let value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let first = &value.as_array().unwrap()[0];
    assert_eq!(first["originalFilename"], "s.jpg");
    assert!(first.get("storagePath").is_some());
}

#[tokio::test]
async fn test_sqlite_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("db").join("photovault.db");

    let rec = record(b"on disk", "disk.jpg");
    {
        let pool = DatabasePool::new(&db_path).await.unwrap();
        SqliteMetadataStore::new(pool.pool().clone())
            .save(&rec)
            .await
            .unwrap();
    }

    let pool = DatabasePool::new(&db_path).await.unwrap();
    let store = SqliteMetadataStore::new(pool.pool().clone());
    assert_eq!(store.get(&rec.id).await.unwrap().map(|r| r.id), Some(rec.id));
}
