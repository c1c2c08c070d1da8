//! SurrealDB implementation of [`ServerRepository`].

use quotaplane_core::error::QpResult;
use quotaplane_core::models::server::{CreateServer, Server, ServerStatus};
use quotaplane_core::repository::ServerRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::parse_uuid;

#[derive(Debug, SurrealValue)]
struct ServerRow {
    name: String,
    vendor: Option<String>,
    site: Option<String>,
    cpu: Option<u32>,
    ram_gb: Option<u32>,
    serial_number: Option<String>,
    status: String,
}

#[derive(Debug, SurrealValue)]
struct ServerRowWithId {
    record_id: String,
    name: String,
    vendor: Option<String>,
    site: Option<String>,
    cpu: Option<u32>,
    ram_gb: Option<u32>,
    serial_number: Option<String>,
    status: String,
}

fn parse_status(s: &str) -> Result<ServerStatus, DbError> {
    match s {
        "Active" => Ok(ServerStatus::Active),
        "Offline" => Ok(ServerStatus::Offline),
        other => Err(DbError::CorruptRow(format!(
            "unknown server status: {other}"
        ))),
    }
}

impl ServerRow {
    fn into_server(self, id: Uuid) -> Result<Server, DbError> {
        Ok(Server {
            id,
            name: self.name,
            vendor: self.vendor,
            site: self.site,
            cpu: self.cpu,
            ram_gb: self.ram_gb,
            serial_number: self.serial_number,
            status: parse_status(&self.status)?,
        })
    }
}

impl ServerRowWithId {
    fn try_into_server(self) -> Result<Server, DbError> {
        let id = parse_uuid("server", &self.record_id)?;
        Ok(Server {
            id,
            name: self.name,
            vendor: self.vendor,
            site: self.site,
            cpu: self.cpu,
            ram_gb: self.ram_gb,
            serial_number: self.serial_number,
            status: parse_status(&self.status)?,
        })
    }
}

/// SurrealDB implementation of the server inventory repository.
#[derive(Clone)]
pub struct SurrealServerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealServerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ServerRepository for SurrealServerRepository<C> {
    async fn create_server(&self, input: CreateServer) -> QpResult<Server> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('server', $id) SET \
                 name = $name, vendor = $vendor, site = $site, cpu = $cpu, \
                 ram_gb = $ram_gb, serial_number = $serial_number",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("vendor", input.vendor))
            .bind(("site", input.site))
            .bind(("cpu", input.cpu))
            .bind(("ram_gb", input.ram_gb))
            .bind(("serial_number", input.serial_number))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<ServerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "server".into(),
            id: id_str,
        })?;
        Ok(row.into_server(id)?)
    }

    async fn get_server(&self, id: Uuid) -> QpResult<Server> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('server', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<ServerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "server".into(),
            id: id_str,
        })?;
        Ok(row.into_server(id)?)
    }

    async fn list_servers(&self) -> QpResult<Vec<Server>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM server ORDER BY name ASC")
            .await
            .map_err(DbError::from)?;
        let rows: Vec<ServerRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_server().map_err(Into::into))
            .collect()
    }
}
