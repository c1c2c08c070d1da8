//! SurrealDB implementations of the `quotaplane-core` repository traits.

mod allocation;
mod org;
mod project;
mod quota;
mod server;

pub use allocation::SurrealAllocationRepository;
pub use org::SurrealOrgRepository;
pub use project::SurrealProjectRepository;
pub use quota::SurrealQuotaRepository;
pub use server::SurrealServerRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn parse_uuid(field: &str, s: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::CorruptRow(format!("invalid {field} UUID: {e}")))
}
