//! Integration tests for server↔field assignment.

use std::sync::Arc;

use quotaplane_core::error::QuotaplaneError;
use quotaplane_core::models::actor::{Actor, Role};
use quotaplane_core::models::org::{CreateCenter, CreateDepartment, CreateField, CreateTeam};
use quotaplane_core::models::quota::Resources;
use quotaplane_core::models::server::CreateServer;
use quotaplane_core::repository::{AllocationRepository, OrgRepository, ServerRepository};
use quotaplane_db::repository::{
    SurrealAllocationRepository, SurrealOrgRepository, SurrealQuotaRepository,
    SurrealServerRepository,
};
use quotaplane_engine::{AllocationService, QuotaLockManager};
use surrealdb::engine::local::Db;
use uuid::Uuid;

type Service = AllocationService<
    SurrealOrgRepository<Db>,
    SurrealServerRepository<Db>,
    SurrealAllocationRepository<Db>,
    SurrealQuotaRepository<Db>,
>;

struct Ctx {
    service: Arc<Service>,
    org: SurrealOrgRepository<Db>,
    servers: SurrealServerRepository<Db>,
    allocations: SurrealAllocationRepository<Db>,
    admin: Actor,
}

/// Spin up a migrated in-memory DB and build the service.
async fn setup() -> Ctx {
    let db = quotaplane_db::connect_memory().await.unwrap();

    let org = SurrealOrgRepository::new(db.clone());
    let servers = SurrealServerRepository::new(db.clone());
    let allocations = SurrealAllocationRepository::new(db.clone());
    let quotas = SurrealQuotaRepository::new(db.clone());
    let locks = Arc::new(QuotaLockManager::new());
    let service = Arc::new(AllocationService::new(
        org.clone(),
        servers.clone(),
        allocations.clone(),
        quotas,
        locks,
    ));

    Ctx {
        service,
        org,
        servers,
        allocations,
        admin: Actor::new("admin", Role::PlatformAdmin, None),
    }
}

/// Center + field at `site`; returns the field ID.
async fn seed_field(org: &SurrealOrgRepository<Db>, site: &str) -> Uuid {
    let center = org
        .create_center(CreateCenter {
            name: format!("center-{}", Uuid::new_v4()),
        })
        .await
        .unwrap();
    org.create_field(CreateField {
        center_id: center.id,
        name: "compute".into(),
        site: site.into(),
    })
    .await
    .unwrap()
    .id
}

async fn seed_server(servers: &SurrealServerRepository<Db>, site: &str, cpu: u32, ram_gb: u32) -> Uuid {
    servers
        .create_server(CreateServer {
            name: format!("srv-{}", Uuid::new_v4()),
            vendor: Some("Dell".into()),
            site: Some(site.into()),
            cpu: Some(cpu),
            ram_gb: Some(ram_gb),
            serial_number: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn assign_server_binds_once() {
    let ctx = setup().await;
    let field = seed_field(&ctx.org, "site-a").await;
    let other_field = seed_field(&ctx.org, "site-a").await;
    let server = seed_server(&ctx.servers, "site-a", 32, 128).await;

    let allocation = ctx
        .service
        .assign_server(&ctx.admin, server, field)
        .await
        .unwrap();
    assert_eq!(allocation.server_id, server);
    assert_eq!(allocation.field_id, field);
    assert_eq!(allocation.allocated_by, "admin");

    // Second assignment of the same server conflicts, even to another field.
    let err = ctx
        .service
        .assign_server(&ctx.admin, server, other_field)
        .await
        .unwrap_err();
    assert!(matches!(err, QuotaplaneError::Conflict { .. }));
}

#[tokio::test]
async fn assign_server_requires_top_level_admin() {
    let ctx = setup().await;
    let field = seed_field(&ctx.org, "site-a").await;
    let server = seed_server(&ctx.servers, "site-a", 32, 128).await;

    let field_admin = Actor::new("fa", Role::FieldAdmin, Some(field));
    let err = ctx
        .service
        .assign_server(&field_admin, server, field)
        .await
        .unwrap_err();
    assert!(matches!(err, QuotaplaneError::Forbidden { .. }));
}

#[tokio::test]
async fn concurrent_assign_single_success() {
    let ctx = setup().await;
    let field_a = seed_field(&ctx.org, "site-a").await;
    let field_b = seed_field(&ctx.org, "site-a").await;
    let server = seed_server(&ctx.servers, "site-a", 32, 128).await;

    let (ra, rb) = tokio::join!(
        ctx.service.assign_server(&ctx.admin, server, field_a),
        ctx.service.assign_server(&ctx.admin, server, field_b),
    );

    let successes = [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one concurrent assignment must win");
    let loser = if ra.is_ok() { rb } else { ra };
    assert!(matches!(loser.unwrap_err(), QuotaplaneError::Conflict { .. }));

    // One binding row exists.
    let binding = ctx
        .allocations
        .get_allocation_for_server(server)
        .await
        .unwrap();
    assert!(binding.is_some());
}

#[tokio::test]
async fn remove_server_blocked_while_department_quota_in_use() {
    let ctx = setup().await;
    let field = seed_field(&ctx.org, "site-a").await;
    let server = seed_server(&ctx.servers, "site-a", 50, 200).await;
    let allocation = ctx
        .service
        .assign_server(&ctx.admin, server, field)
        .await
        .unwrap();

    let dept = ctx
        .org
        .create_department(CreateDepartment {
            field_id: field,
            name: "research".into(),
        })
        .await
        .unwrap();
    let team = ctx
        .org
        .create_team(CreateTeam {
            department_id: dept.id,
            name: "ml".into(),
            directory_group: None,
        })
        .await
        .unwrap();

    // Department quota with zero usage does not block removal; re-assign
    // afterwards to test the used case.
    ctx.service
        .create_department_quota(&ctx.admin, field, dept.id, "site-a".into(), Resources::new(40, 160))
        .await
        .unwrap();
    ctx.service
        .remove_server(&ctx.admin, allocation.id)
        .await
        .unwrap();

    let allocation = ctx
        .service
        .assign_server(&ctx.admin, server, field)
        .await
        .unwrap();

    // Carving a team quota marks the department quota as in use.
    ctx.service
        .create_team_quota(&ctx.admin, dept.id, team.id, "site-a".into(), Resources::new(10, 40))
        .await
        .unwrap();
    let err = ctx
        .service
        .remove_server(&ctx.admin, allocation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, QuotaplaneError::Conflict { .. }));
}

#[tokio::test]
async fn swap_server_replaces_binding_atomically() {
    let ctx = setup().await;
    let field_a = seed_field(&ctx.org, "site-a").await;
    let field_b = seed_field(&ctx.org, "site-b").await;
    let server = seed_server(&ctx.servers, "site-a", 32, 128).await;

    ctx.service
        .assign_server(&ctx.admin, server, field_a)
        .await
        .unwrap();
    let moved = ctx
        .service
        .swap_server(&ctx.admin, server, field_a, field_b)
        .await
        .unwrap();
    assert_eq!(moved.field_id, field_b);

    // Exactly one binding remains, pointing at the target field.
    assert!(ctx
        .allocations
        .list_allocations_for_field(field_a)
        .await
        .unwrap()
        .is_empty());
    let in_b = ctx
        .allocations
        .list_allocations_for_field(field_b)
        .await
        .unwrap();
    assert_eq!(in_b.len(), 1);
    assert_eq!(in_b[0].server_id, server);
}

#[tokio::test]
async fn swap_server_rejects_stale_source_field() {
    let ctx = setup().await;
    let field_a = seed_field(&ctx.org, "site-a").await;
    let field_b = seed_field(&ctx.org, "site-b").await;
    let server = seed_server(&ctx.servers, "site-a", 32, 128).await;

    ctx.service
        .assign_server(&ctx.admin, server, field_a)
        .await
        .unwrap();

    // Caller believes the server sits in field_b; it does not.
    let err = ctx
        .service
        .swap_server(&ctx.admin, server, field_b, field_a)
        .await
        .unwrap_err();
    assert!(matches!(err, QuotaplaneError::Conflict { .. }));

    // The original binding is untouched.
    let binding = ctx
        .allocations
        .get_allocation_for_server(server)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(binding.field_id, field_a);
}
