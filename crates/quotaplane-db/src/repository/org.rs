//! SurrealDB implementation of [`OrgRepository`].

use quotaplane_core::error::QpResult;
use quotaplane_core::models::org::{
    Center, CreateCenter, CreateDepartment, CreateField, CreateTeam, Department, Field, Team,
};
use quotaplane_core::repository::OrgRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{CountRow, parse_uuid};

#[derive(Debug, SurrealValue)]
struct CenterRow {
    name: String,
}

#[derive(Debug, SurrealValue)]
struct CenterRowWithId {
    record_id: String,
    name: String,
}

impl CenterRowWithId {
    fn try_into_center(self) -> Result<Center, DbError> {
        Ok(Center {
            id: parse_uuid("center", &self.record_id)?,
            name: self.name,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct FieldRow {
    center_id: String,
    name: String,
    site: String,
}

impl FieldRow {
    fn into_field(self, id: Uuid) -> Result<Field, DbError> {
        Ok(Field {
            id,
            center_id: parse_uuid("center", &self.center_id)?,
            name: self.name,
            site: self.site,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct FieldRowWithId {
    record_id: String,
    center_id: String,
    name: String,
    site: String,
}

impl FieldRowWithId {
    fn try_into_field(self) -> Result<Field, DbError> {
        Ok(Field {
            id: parse_uuid("field", &self.record_id)?,
            center_id: parse_uuid("center", &self.center_id)?,
            name: self.name,
            site: self.site,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct DepartmentRow {
    field_id: String,
    name: String,
}

impl DepartmentRow {
    fn into_department(self, id: Uuid) -> Result<Department, DbError> {
        Ok(Department {
            id,
            field_id: parse_uuid("field", &self.field_id)?,
            name: self.name,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct DepartmentRowWithId {
    record_id: String,
    field_id: String,
    name: String,
}

impl DepartmentRowWithId {
    fn try_into_department(self) -> Result<Department, DbError> {
        Ok(Department {
            id: parse_uuid("department", &self.record_id)?,
            field_id: parse_uuid("field", &self.field_id)?,
            name: self.name,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct TeamRow {
    department_id: String,
    name: String,
    directory_group: Option<String>,
}

impl TeamRow {
    fn into_team(self, id: Uuid) -> Result<Team, DbError> {
        Ok(Team {
            id,
            department_id: parse_uuid("department", &self.department_id)?,
            name: self.name,
            directory_group: self.directory_group,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct TeamRowWithId {
    record_id: String,
    department_id: String,
    name: String,
    directory_group: Option<String>,
}

impl TeamRowWithId {
    fn try_into_team(self) -> Result<Team, DbError> {
        Ok(Team {
            id: parse_uuid("team", &self.record_id)?,
            department_id: parse_uuid("department", &self.department_id)?,
            name: self.name,
            directory_group: self.directory_group,
        })
    }
}

/// SurrealDB implementation of the org hierarchy repository.
#[derive(Clone)]
pub struct SurrealOrgRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrgRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count(&self, query: &str, param: (&'static str, String)) -> QpResult<u64> {
        let mut result = self
            .db
            .query(query)
            .bind(param)
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> OrgRepository for SurrealOrgRepository<C> {
    async fn create_center(&self, input: CreateCenter) -> QpResult<Center> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query("CREATE type::record('center', $id) SET name = $name")
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<CenterRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "center".into(),
            id: id_str,
        })?;

        Ok(Center { id, name: row.name })
    }

    async fn get_center(&self, id: Uuid) -> QpResult<Center> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('center', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CenterRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "center".into(),
            id: id_str,
        })?;
        Ok(Center { id, name: row.name })
    }

    async fn list_centers(&self) -> QpResult<Vec<Center>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM center ORDER BY name ASC")
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CenterRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_center().map_err(Into::into))
            .collect()
    }

    async fn update_center(&self, id: Uuid, name: String) -> QpResult<Center> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("UPDATE type::record('center', $id) SET name = $name")
            .bind(("id", id_str.clone()))
            .bind(("name", name))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CenterRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "center".into(),
            id: id_str,
        })?;
        Ok(Center { id, name: row.name })
    }

    async fn delete_center(&self, id: Uuid) -> QpResult<()> {
        self.db
            .query("DELETE type::record('center', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn center_has_fields(&self, id: Uuid) -> QpResult<bool> {
        let total = self
            .count(
                "SELECT count() AS total FROM field WHERE center_id = $center_id GROUP ALL",
                ("center_id", id.to_string()),
            )
            .await?;
        Ok(total > 0)
    }

    async fn create_field(&self, input: CreateField) -> QpResult<Field> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('field', $id) SET \
                 center_id = $center_id, name = $name, site = $site",
            )
            .bind(("id", id_str.clone()))
            .bind(("center_id", input.center_id.to_string()))
            .bind(("name", input.name))
            .bind(("site", input.site))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<FieldRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "field".into(),
            id: id_str,
        })?;
        Ok(row.into_field(id)?)
    }

    async fn get_field(&self, id: Uuid) -> QpResult<Field> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('field', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<FieldRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "field".into(),
            id: id_str,
        })?;
        Ok(row.into_field(id)?)
    }

    async fn list_fields_for_center(&self, center_id: Uuid) -> QpResult<Vec<Field>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM field \
                 WHERE center_id = $center_id ORDER BY name ASC",
            )
            .bind(("center_id", center_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<FieldRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_field().map_err(Into::into))
            .collect()
    }

    async fn update_field(&self, id: Uuid, name: String, site: String) -> QpResult<Field> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("UPDATE type::record('field', $id) SET name = $name, site = $site")
            .bind(("id", id_str.clone()))
            .bind(("name", name))
            .bind(("site", site))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<FieldRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "field".into(),
            id: id_str,
        })?;
        Ok(row.into_field(id)?)
    }

    async fn delete_field(&self, id: Uuid) -> QpResult<()> {
        self.db
            .query("DELETE type::record('field', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn field_has_departments(&self, id: Uuid) -> QpResult<bool> {
        let total = self
            .count(
                "SELECT count() AS total FROM department WHERE field_id = $field_id GROUP ALL",
                ("field_id", id.to_string()),
            )
            .await?;
        Ok(total > 0)
    }

    async fn create_department(&self, input: CreateDepartment) -> QpResult<Department> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('department', $id) SET \
                 field_id = $field_id, name = $name",
            )
            .bind(("id", id_str.clone()))
            .bind(("field_id", input.field_id.to_string()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "department".into(),
            id: id_str,
        })?;
        Ok(row.into_department(id)?)
    }

    async fn get_department(&self, id: Uuid) -> QpResult<Department> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('department', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "department".into(),
            id: id_str,
        })?;
        Ok(row.into_department(id)?)
    }

    async fn list_departments_for_field(&self, field_id: Uuid) -> QpResult<Vec<Department>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM department \
                 WHERE field_id = $field_id ORDER BY name ASC",
            )
            .bind(("field_id", field_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<DepartmentRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_department().map_err(Into::into))
            .collect()
    }

    async fn update_department(&self, id: Uuid, name: String) -> QpResult<Department> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("UPDATE type::record('department', $id) SET name = $name")
            .bind(("id", id_str.clone()))
            .bind(("name", name))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "department".into(),
            id: id_str,
        })?;
        Ok(row.into_department(id)?)
    }

    async fn delete_department(&self, id: Uuid) -> QpResult<()> {
        self.db
            .query("DELETE type::record('department', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn department_has_teams(&self, id: Uuid) -> QpResult<bool> {
        let total = self
            .count(
                "SELECT count() AS total FROM team WHERE department_id = $department_id GROUP ALL",
                ("department_id", id.to_string()),
            )
            .await?;
        Ok(total > 0)
    }

    async fn create_team(&self, input: CreateTeam) -> QpResult<Team> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('team', $id) SET \
                 department_id = $department_id, name = $name, \
                 directory_group = $directory_group",
            )
            .bind(("id", id_str.clone()))
            .bind(("department_id", input.department_id.to_string()))
            .bind(("name", input.name))
            .bind(("directory_group", input.directory_group))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "team".into(),
            id: id_str,
        })?;
        Ok(row.into_team(id)?)
    }

    async fn get_team(&self, id: Uuid) -> QpResult<Team> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('team', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "team".into(),
            id: id_str,
        })?;
        Ok(row.into_team(id)?)
    }

    async fn list_teams_for_department(&self, department_id: Uuid) -> QpResult<Vec<Team>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team \
                 WHERE department_id = $department_id ORDER BY name ASC",
            )
            .bind(("department_id", department_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<TeamRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_team().map_err(Into::into))
            .collect()
    }

    async fn update_team(
        &self,
        id: Uuid,
        name: String,
        directory_group: Option<String>,
    ) -> QpResult<Team> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "UPDATE type::record('team', $id) SET \
                 name = $name, directory_group = $directory_group",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", name))
            .bind(("directory_group", directory_group))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "team".into(),
            id: id_str,
        })?;
        Ok(row.into_team(id)?)
    }

    async fn delete_team(&self, id: Uuid) -> QpResult<()> {
        self.db
            .query("DELETE type::record('team', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }
}
