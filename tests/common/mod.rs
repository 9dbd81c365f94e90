#![allow(dead_code)]

use perovskite_web::db::{DbPool, PoolSettings, QueryExecutor, RecordStore};
use perovskite_web::models::{DatasetDescriptor, DatasetRegistry};
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

/// Registry whose default dataset lives in SQLite's `main` schema.
pub fn sqlite_registry() -> DatasetRegistry {
    let mut registry = DatasetRegistry::empty();
    registry
        .register(DatasetDescriptor {
            schema: "main".to_string(),
            ..DatasetDescriptor::single_junction()
        })
        .unwrap();
    registry
}

/// Create a small device table in a fresh SQLite file and return its read-only URL.
pub async fn seed_database(dir: &TempDir) -> String {
    let path = dir.path().join("perovskite.db");
    let writer = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();

    sqlx::query(
        r#"CREATE TABLE data (
            "Ref_ID" INTEGER PRIMARY KEY,
            "Ref_DOI_number" TEXT,
            "Cell_architecture" TEXT,
            "Cell_flexible" BOOLEAN,
            "JV_default_PCE" REAL,
            "Ref_publication_date" TEXT
        )"#,
    )
    .execute(&writer)
    .await
    .unwrap();

    let rows = [
        (1, "10.1039/C6EE00030D", Some("nip"), 0, 12.5, "2016-03-01"),
        (2, "10.1039/C6EE00030D", Some("nip"), 1, 14.0, "2017-06-15"),
        (3, "10.1021/jacs.5b00001", Some("pin"), 1, 17.25, "2018-01-10"),
        (4, "10.1021/jacs.5b00001", Some("nip"), 0, 9.0, "2019-11-30"),
        (5, "10.1002/aenm.201700001", None, 0, 20.1, "2020-05-05"),
    ];
    for (id, doi, architecture, flexible, pce, published) in rows {
        sqlx::query(
            r#"INSERT INTO data ("Ref_ID", "Ref_DOI_number", "Cell_architecture", "Cell_flexible", "JV_default_PCE", "Ref_publication_date")
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        )
        .bind(id)
        .bind(doi)
        .bind(architecture)
        .bind(flexible)
        .bind(pce)
        .bind(published)
        .execute(&writer)
        .await
        .unwrap();
    }
    writer.close().await;

    format!("sqlite:{}", path.display())
}

/// Open a writer on the database created by [`seed_database`].
pub async fn writer(dir: &TempDir) -> SqlitePool {
    let path = dir.path().join("perovskite.db");
    SqlitePool::connect(&format!("sqlite:{}?mode=rw", path.display()))
        .await
        .unwrap()
}

pub async fn seeded_store(dir: &TempDir) -> RecordStore {
    let url = seed_database(dir).await;
    let pool = DbPool::connect(&url, &PoolSettings::default())
        .await
        .unwrap();
    RecordStore::new(pool, QueryExecutor::new(), sqlite_registry())
}
