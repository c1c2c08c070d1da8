//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Uniqueness invariants (one field
//! per server, one quota per (level, node, site), unique namespace) are
//! backed by unique indexes.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Org hierarchy: center → field → department → team
-- =======================================================================
DEFINE TABLE center SCHEMAFULL;
DEFINE FIELD name ON TABLE center TYPE string;
DEFINE INDEX idx_center_name ON TABLE center COLUMNS name UNIQUE;

DEFINE TABLE field SCHEMAFULL;
DEFINE FIELD center_id ON TABLE field TYPE string;
DEFINE FIELD name ON TABLE field TYPE string;
DEFINE FIELD site ON TABLE field TYPE string;
DEFINE INDEX idx_field_center_name ON TABLE field \
    COLUMNS center_id, name UNIQUE;

DEFINE TABLE department SCHEMAFULL;
DEFINE FIELD field_id ON TABLE department TYPE string;
DEFINE FIELD name ON TABLE department TYPE string;
DEFINE INDEX idx_department_field_name ON TABLE department \
    COLUMNS field_id, name UNIQUE;

DEFINE TABLE team SCHEMAFULL;
DEFINE FIELD department_id ON TABLE team TYPE string;
DEFINE FIELD name ON TABLE team TYPE string;
DEFINE FIELD directory_group ON TABLE team TYPE option<string>;
DEFINE INDEX idx_team_department_name ON TABLE team \
    COLUMNS department_id, name UNIQUE;

-- =======================================================================
-- Server inventory (rows written by the external sync job)
-- =======================================================================
DEFINE TABLE server SCHEMAFULL;
DEFINE FIELD name ON TABLE server TYPE string;
DEFINE FIELD vendor ON TABLE server TYPE option<string>;
DEFINE FIELD site ON TABLE server TYPE option<string>;
DEFINE FIELD cpu ON TABLE server TYPE option<int>;
DEFINE FIELD ram_gb ON TABLE server TYPE option<int>;
DEFINE FIELD serial_number ON TABLE server TYPE option<string>;
DEFINE FIELD status ON TABLE server TYPE string \
    ASSERT $value IN ['Active', 'Offline'] DEFAULT 'Active';
DEFINE INDEX idx_server_name ON TABLE server COLUMNS name UNIQUE;

-- =======================================================================
-- Server → field allocations (one field per server)
-- =======================================================================
DEFINE TABLE server_allocation SCHEMAFULL;
DEFINE FIELD server_id ON TABLE server_allocation TYPE string;
DEFINE FIELD field_id ON TABLE server_allocation TYPE string;
DEFINE FIELD allocated_by ON TABLE server_allocation TYPE string;
DEFINE INDEX idx_server_allocation_server ON TABLE server_allocation \
    COLUMNS server_id UNIQUE;

-- =======================================================================
-- Resource quotas (department and team levels share one table)
-- =======================================================================
DEFINE TABLE resource_quota SCHEMAFULL;
DEFINE FIELD level ON TABLE resource_quota TYPE string \
    ASSERT $value IN ['Department', 'Team'];
DEFINE FIELD parent_id ON TABLE resource_quota TYPE string;
DEFINE FIELD node_id ON TABLE resource_quota TYPE string;
DEFINE FIELD site ON TABLE resource_quota TYPE string;
DEFINE FIELD cpu_limit ON TABLE resource_quota TYPE int \
    ASSERT $value >= 0;
DEFINE FIELD ram_gb_limit ON TABLE resource_quota TYPE int \
    ASSERT $value >= 0;
DEFINE FIELD cpu_used ON TABLE resource_quota TYPE int \
    ASSERT $value >= 0 DEFAULT 0;
DEFINE FIELD ram_gb_used ON TABLE resource_quota TYPE int \
    ASSERT $value >= 0 DEFAULT 0;
DEFINE INDEX idx_resource_quota_node_site ON TABLE resource_quota \
    COLUMNS level, node_id, site UNIQUE;

-- =======================================================================
-- Projects (provisioned namespaces)
-- =======================================================================
DEFINE TABLE project SCHEMAFULL;
DEFINE FIELD team_id ON TABLE project TYPE string;
DEFINE FIELD name ON TABLE project TYPE string;
DEFINE FIELD site ON TABLE project TYPE string;
DEFINE FIELD sla_tier ON TABLE project TYPE string \
    ASSERT $value IN ['bronze', 'silver', 'gold'];
DEFINE FIELD performance_tier ON TABLE project TYPE string \
    ASSERT $value IN ['regular', 'high_performance'];
DEFINE FIELD namespace ON TABLE project TYPE string;
DEFINE FIELD status ON TABLE project TYPE string \
    ASSERT $value IN ['Provisioning', 'Active', 'Failed', 'Deleting', \
    'Deleted'] DEFAULT 'Provisioning';
DEFINE FIELD quota_cpu ON TABLE project TYPE int ASSERT $value >= 0;
DEFINE FIELD quota_ram_gb ON TABLE project TYPE int ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE project TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE project TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE project TYPE option<datetime>;
DEFINE INDEX idx_project_namespace ON TABLE project \
    COLUMNS namespace UNIQUE;
";

/// Apply any pending migrations. Idempotent: versions already recorded in
/// `_migration` are skipped.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// The raw v1 schema DDL, exposed for inspection in tests.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
