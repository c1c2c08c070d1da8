//! SurrealDB connection management.

use std::env;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "quotaplane".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Configuration from `QUOTAPLANE_DB_*` environment variables, falling
    /// back to [`DbConfig::default`] for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            url: get("QUOTAPLANE_DB_URL").unwrap_or(defaults.url),
            namespace: get("QUOTAPLANE_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: get("QUOTAPLANE_DB_DATABASE").unwrap_or(defaults.database),
            username: get("QUOTAPLANE_DB_USERNAME").unwrap_or(defaults.username),
            password: get("QUOTAPLANE_DB_PASSWORD").unwrap_or(defaults.password),
        }
    }
}

/// Ephemeral in-memory database with the schema already applied.
///
/// Every row vanishes when the handle is dropped; integration tests build
/// their repositories on top of this.
pub async fn connect_memory() -> Result<Surreal<Db>, DbError> {
    let db = Surreal::new::<Mem>(()).await?;
    db.use_ns("test").use_db("test").await?;
    run_migrations(&db).await?;
    Ok(db)
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Authenticates as root, selects the configured namespace and
    /// database, and returns a ready-to-use manager.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Successfully connected to SurrealDB");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn config_defaults_when_nothing_is_set() {
        let config = DbConfig::from_lookup(|_| None);
        assert_eq!(config.url, "127.0.0.1:8000");
        assert_eq!(config.namespace, "quotaplane");
        assert_eq!(config.database, "main");
    }

    #[test]
    fn config_overrides_apply_per_key() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("QUOTAPLANE_DB_URL", "db.internal:8000"),
            ("QUOTAPLANE_DB_PASSWORD", "s3cret"),
        ]);
        let config = DbConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.url, "db.internal:8000");
        assert_eq!(config.password, "s3cret");
        // Untouched keys keep their defaults.
        assert_eq!(config.namespace, "quotaplane");
        assert_eq!(config.username, "root");
    }

    #[tokio::test]
    async fn memory_database_is_migrated() {
        let db = connect_memory().await.unwrap();
        // The schema is already in place: a schemafull table accepts rows.
        let result = db
            .query("CREATE center SET name = 'hq'")
            .await
            .unwrap()
            .check();
        assert!(result.is_ok());
    }
}
