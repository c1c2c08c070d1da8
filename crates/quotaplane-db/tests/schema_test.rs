//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    quotaplane_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "center",
        "field",
        "department",
        "team",
        "server",
        "server_allocation",
        "resource_quota",
        "project",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    // Run twice — should not fail.
    quotaplane_db::run_migrations(&db).await.unwrap();
    quotaplane_db::run_migrations(&db).await.unwrap();

    // Verify only one migration record exists.
    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn quota_level_assert_rejects_unknown_value() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    quotaplane_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE resource_quota SET level = 'Galaxy', parent_id = 'x', \
             node_id = 'y', site = 'site-a', cpu_limit = 1, ram_gb_limit = 1",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "ASSERT on level should reject 'Galaxy'");
}
