//! SurrealDB implementation of [`AllocationRepository`].

use quotaplane_core::error::QpResult;
use quotaplane_core::models::quota::Resources;
use quotaplane_core::models::server::ServerAllocation;
use quotaplane_core::repository::AllocationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::parse_uuid;

#[derive(Debug, SurrealValue)]
struct AllocationRowWithId {
    record_id: String,
    server_id: String,
    field_id: String,
    allocated_by: String,
}

impl AllocationRowWithId {
    fn try_into_allocation(self) -> Result<ServerAllocation, DbError> {
        Ok(ServerAllocation {
            id: parse_uuid("server_allocation", &self.record_id)?,
            server_id: parse_uuid("server", &self.server_id)?,
            field_id: parse_uuid("field", &self.field_id)?,
            allocated_by: self.allocated_by,
        })
    }
}

/// Partial server row used when summing a field's capacity.
#[derive(Debug, SurrealValue)]
struct CapacityRow {
    cpu: Option<u32>,
    ram_gb: Option<u32>,
}

/// SurrealDB implementation of the server→field allocation repository.
#[derive(Clone)]
pub struct SurrealAllocationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAllocationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AllocationRepository for SurrealAllocationRepository<C> {
    async fn get_allocation_for_server(
        &self,
        server_id: Uuid,
    ) -> QpResult<Option<ServerAllocation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM server_allocation \
                 WHERE server_id = $server_id",
            )
            .bind(("server_id", server_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<AllocationRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_allocation()?)),
            None => Ok(None),
        }
    }

    async fn get_allocation(&self, id: Uuid) -> QpResult<ServerAllocation> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('server_allocation', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<AllocationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "server_allocation".into(),
            id: id_str,
        })?;
        Ok(row.try_into_allocation()?)
    }

    async fn create_allocation(
        &self,
        server_id: Uuid,
        field_id: Uuid,
        allocated_by: String,
    ) -> QpResult<ServerAllocation> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('server_allocation', $id) SET \
                 server_id = $server_id, field_id = $field_id, \
                 allocated_by = $allocated_by",
            )
            .bind(("id", id.to_string()))
            .bind(("server_id", server_id.to_string()))
            .bind(("field_id", field_id.to_string()))
            .bind(("allocated_by", allocated_by.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(ServerAllocation {
            id,
            server_id,
            field_id,
            allocated_by,
        })
    }

    async fn delete_allocation(&self, id: Uuid) -> QpResult<()> {
        self.db
            .query("DELETE type::record('server_allocation', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn replace_allocation(
        &self,
        old_id: Uuid,
        server_id: Uuid,
        to_field_id: Uuid,
        allocated_by: String,
    ) -> QpResult<ServerAllocation> {
        let new_id = Uuid::new_v4();

        // One transaction: the old binding disappears and the new one
        // appears together, or neither does.
        self.db
            .query(
                "BEGIN; \
                 DELETE type::record('server_allocation', $old_id); \
                 CREATE type::record('server_allocation', $new_id) SET \
                 server_id = $server_id, field_id = $field_id, \
                 allocated_by = $allocated_by; \
                 COMMIT;",
            )
            .bind(("old_id", old_id.to_string()))
            .bind(("new_id", new_id.to_string()))
            .bind(("server_id", server_id.to_string()))
            .bind(("field_id", to_field_id.to_string()))
            .bind(("allocated_by", allocated_by.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(ServerAllocation {
            id: new_id,
            server_id,
            field_id: to_field_id,
            allocated_by,
        })
    }

    async fn list_allocations_for_field(&self, field_id: Uuid) -> QpResult<Vec<ServerAllocation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM server_allocation \
                 WHERE field_id = $field_id",
            )
            .bind(("field_id", field_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<AllocationRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_allocation().map_err(Into::into))
            .collect()
    }

    async fn field_capacity(&self, field_id: Uuid, site: &str) -> QpResult<Resources> {
        let allocations = self.list_allocations_for_field(field_id).await?;
        if allocations.is_empty() {
            return Ok(Resources::ZERO);
        }
        let server_ids: Vec<String> = allocations
            .iter()
            .map(|a| a.server_id.to_string())
            .collect();

        let mut result = self
            .db
            .query(
                "SELECT cpu, ram_gb FROM server \
                 WHERE meta::id(id) IN $server_ids AND site = $site",
            )
            .bind(("server_ids", server_ids))
            .bind(("site", site.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CapacityRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows.into_iter().fold(Resources::ZERO, |acc, row| {
            acc.saturating_add(Resources::new(
                row.cpu.unwrap_or(0),
                row.ram_gb.unwrap_or(0),
            ))
        }))
    }
}
