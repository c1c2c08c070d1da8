//! SurrealDB implementation of [`QuotaRepository`].
//!
//! Department and team quotas live in one `resource_quota` table tagged by
//! `level`; the unique index on (level, node_id, site) backs the
//! one-quota-per-node-per-site invariant.

use quotaplane_core::error::QpResult;
use quotaplane_core::models::quota::{CreateQuota, QuotaLevel, ResourceQuota, Resources};
use quotaplane_core::repository::QuotaRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{CountRow, parse_uuid};

#[derive(Debug, SurrealValue)]
struct QuotaRow {
    level: String,
    parent_id: String,
    node_id: String,
    site: String,
    cpu_limit: u32,
    ram_gb_limit: u32,
    cpu_used: u32,
    ram_gb_used: u32,
}

#[derive(Debug, SurrealValue)]
struct QuotaRowWithId {
    record_id: String,
    level: String,
    parent_id: String,
    node_id: String,
    site: String,
    cpu_limit: u32,
    ram_gb_limit: u32,
    cpu_used: u32,
    ram_gb_used: u32,
}

fn parse_level(s: &str) -> Result<QuotaLevel, DbError> {
    match s {
        "Department" => Ok(QuotaLevel::Department),
        "Team" => Ok(QuotaLevel::Team),
        other => Err(DbError::CorruptRow(format!("unknown quota level: {other}"))),
    }
}

fn level_to_string(level: QuotaLevel) -> &'static str {
    match level {
        QuotaLevel::Department => "Department",
        QuotaLevel::Team => "Team",
    }
}

impl QuotaRow {
    fn into_quota(self, id: Uuid) -> Result<ResourceQuota, DbError> {
        Ok(ResourceQuota {
            id,
            level: parse_level(&self.level)?,
            parent_id: parse_uuid("parent", &self.parent_id)?,
            node_id: parse_uuid("node", &self.node_id)?,
            site: self.site,
            cpu_limit: self.cpu_limit,
            ram_gb_limit: self.ram_gb_limit,
            cpu_used: self.cpu_used,
            ram_gb_used: self.ram_gb_used,
        })
    }
}

impl QuotaRowWithId {
    fn try_into_quota(self) -> Result<ResourceQuota, DbError> {
        Ok(ResourceQuota {
            id: parse_uuid("resource_quota", &self.record_id)?,
            level: parse_level(&self.level)?,
            parent_id: parse_uuid("parent", &self.parent_id)?,
            node_id: parse_uuid("node", &self.node_id)?,
            site: self.site,
            cpu_limit: self.cpu_limit,
            ram_gb_limit: self.ram_gb_limit,
            cpu_used: self.cpu_used,
            ram_gb_used: self.ram_gb_used,
        })
    }
}

/// SurrealDB implementation of the quota repository.
#[derive(Clone)]
pub struct SurrealQuotaRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealQuotaRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> QuotaRepository for SurrealQuotaRepository<C> {
    async fn create_quota(&self, input: CreateQuota) -> QpResult<ResourceQuota> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('resource_quota', $id) SET \
                 level = $level, parent_id = $parent_id, node_id = $node_id, \
                 site = $site, cpu_limit = $cpu_limit, \
                 ram_gb_limit = $ram_gb_limit",
            )
            .bind(("id", id_str.clone()))
            .bind(("level", level_to_string(input.level)))
            .bind(("parent_id", input.parent_id.to_string()))
            .bind(("node_id", input.node_id.to_string()))
            .bind(("site", input.site))
            .bind(("cpu_limit", input.limits.cpu))
            .bind(("ram_gb_limit", input.limits.ram_gb))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<QuotaRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "resource_quota".into(),
            id: id_str,
        })?;
        Ok(row.into_quota(id)?)
    }

    async fn get_quota(
        &self,
        level: QuotaLevel,
        node_id: Uuid,
        site: &str,
    ) -> QpResult<Option<ResourceQuota>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM resource_quota \
                 WHERE level = $level AND node_id = $node_id AND site = $site",
            )
            .bind(("level", level_to_string(level)))
            .bind(("node_id", node_id.to_string()))
            .bind(("site", site.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<QuotaRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_quota()?)),
            None => Ok(None),
        }
    }

    async fn get_quota_by_id(&self, id: Uuid) -> QpResult<ResourceQuota> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('resource_quota', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<QuotaRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "resource_quota".into(),
            id: id_str,
        })?;
        Ok(row.into_quota(id)?)
    }

    async fn list_quotas(
        &self,
        level: QuotaLevel,
        parent_id: Uuid,
        site: &str,
    ) -> QpResult<Vec<ResourceQuota>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM resource_quota \
                 WHERE level = $level AND parent_id = $parent_id AND site = $site",
            )
            .bind(("level", level_to_string(level)))
            .bind(("parent_id", parent_id.to_string()))
            .bind(("site", site.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<QuotaRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_quota().map_err(Into::into))
            .collect()
    }

    async fn list_quotas_for_parent(
        &self,
        level: QuotaLevel,
        parent_id: Uuid,
    ) -> QpResult<Vec<ResourceQuota>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM resource_quota \
                 WHERE level = $level AND parent_id = $parent_id \
                 ORDER BY site ASC",
            )
            .bind(("level", level_to_string(level)))
            .bind(("parent_id", parent_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<QuotaRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_quota().map_err(Into::into))
            .collect()
    }

    async fn parent_has_used_quota(&self, level: QuotaLevel, parent_id: Uuid) -> QpResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM resource_quota \
                 WHERE level = $level AND parent_id = $parent_id \
                 AND cpu_used > 0 GROUP ALL",
            )
            .bind(("level", level_to_string(level)))
            .bind(("parent_id", parent_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn node_has_used_quota(&self, level: QuotaLevel, node_id: Uuid) -> QpResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM resource_quota \
                 WHERE level = $level AND node_id = $node_id \
                 AND cpu_used > 0 GROUP ALL",
            )
            .bind(("level", level_to_string(level)))
            .bind(("node_id", node_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn create_quota_with_parent_debit(
        &self,
        input: CreateQuota,
        parent_quota_id: Uuid,
        parent_used: Resources,
    ) -> QpResult<ResourceQuota> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "BEGIN; \
                 CREATE type::record('resource_quota', $id) SET \
                 level = $level, parent_id = $parent_id, node_id = $node_id, \
                 site = $site, cpu_limit = $cpu_limit, \
                 ram_gb_limit = $ram_gb_limit; \
                 UPDATE type::record('resource_quota', $parent_quota_id) SET \
                 cpu_used = $parent_cpu_used, ram_gb_used = $parent_ram_gb_used; \
                 COMMIT;",
            )
            .bind(("id", id.to_string()))
            .bind(("level", level_to_string(input.level)))
            .bind(("parent_id", input.parent_id.to_string()))
            .bind(("node_id", input.node_id.to_string()))
            .bind(("site", input.site))
            .bind(("cpu_limit", input.limits.cpu))
            .bind(("ram_gb_limit", input.limits.ram_gb))
            .bind(("parent_quota_id", parent_quota_id.to_string()))
            .bind(("parent_cpu_used", parent_used.cpu))
            .bind(("parent_ram_gb_used", parent_used.ram_gb))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_quota_by_id(id).await
    }

    async fn set_limits(&self, id: Uuid, limits: Resources) -> QpResult<ResourceQuota> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "UPDATE type::record('resource_quota', $id) SET \
                 cpu_limit = $cpu_limit, ram_gb_limit = $ram_gb_limit",
            )
            .bind(("id", id_str.clone()))
            .bind(("cpu_limit", limits.cpu))
            .bind(("ram_gb_limit", limits.ram_gb))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<QuotaRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "resource_quota".into(),
            id: id_str,
        })?;
        Ok(row.into_quota(id)?)
    }

    async fn set_limits_with_parent_debit(
        &self,
        id: Uuid,
        limits: Resources,
        parent_quota_id: Uuid,
        parent_used: Resources,
    ) -> QpResult<ResourceQuota> {
        self.db
            .query(
                "BEGIN; \
                 UPDATE type::record('resource_quota', $id) SET \
                 cpu_limit = $cpu_limit, ram_gb_limit = $ram_gb_limit; \
                 UPDATE type::record('resource_quota', $parent_quota_id) SET \
                 cpu_used = $parent_cpu_used, ram_gb_used = $parent_ram_gb_used; \
                 COMMIT;",
            )
            .bind(("id", id.to_string()))
            .bind(("cpu_limit", limits.cpu))
            .bind(("ram_gb_limit", limits.ram_gb))
            .bind(("parent_quota_id", parent_quota_id.to_string()))
            .bind(("parent_cpu_used", parent_used.cpu))
            .bind(("parent_ram_gb_used", parent_used.ram_gb))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_quota_by_id(id).await
    }

    async fn set_used(&self, id: Uuid, used: Resources) -> QpResult<ResourceQuota> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "UPDATE type::record('resource_quota', $id) SET \
                 cpu_used = $cpu_used, ram_gb_used = $ram_gb_used",
            )
            .bind(("id", id_str.clone()))
            .bind(("cpu_used", used.cpu))
            .bind(("ram_gb_used", used.ram_gb))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<QuotaRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "resource_quota".into(),
            id: id_str,
        })?;
        Ok(row.into_quota(id)?)
    }
}
