//! Integration tests for the SurrealDB repository implementations.

use quotaplane_core::error::QuotaplaneError;
use quotaplane_core::models::org::{CreateCenter, CreateDepartment, CreateField, CreateTeam};
use quotaplane_core::models::project::{CreateProject, ProjectStatus};
use quotaplane_core::models::quota::{CreateQuota, QuotaLevel, Resources};
use quotaplane_core::models::server::{CreateServer, ServerStatus};
use quotaplane_core::repository::{
    AllocationRepository, OrgRepository, ProjectRepository, QuotaRepository, ServerRepository,
};
use quotaplane_core::sla::{PerformanceTier, SlaTier};
use quotaplane_db::repository::{
    SurrealAllocationRepository, SurrealOrgRepository, SurrealProjectRepository,
    SurrealQuotaRepository, SurrealServerRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    quotaplane_db::connect_memory().await.unwrap()
}

#[tokio::test]
async fn org_hierarchy_round_trip_and_child_counts() {
    let db = setup().await;
    let repo = SurrealOrgRepository::new(db);

    let center = repo
        .create_center(CreateCenter { name: "hq".into() })
        .await
        .unwrap();
    assert!(!repo.center_has_fields(center.id).await.unwrap());

    let field = repo
        .create_field(CreateField {
            center_id: center.id,
            name: "compute".into(),
            site: "site-a".into(),
        })
        .await
        .unwrap();
    assert!(repo.center_has_fields(center.id).await.unwrap());
    assert_eq!(repo.get_field(field.id).await.unwrap().site, "site-a");

    let dept = repo
        .create_department(CreateDepartment {
            field_id: field.id,
            name: "research".into(),
        })
        .await
        .unwrap();
    let team = repo
        .create_team(CreateTeam {
            department_id: dept.id,
            name: "ml".into(),
            directory_group: Some("cn=ml".into()),
        })
        .await
        .unwrap();

    let teams = repo.list_teams_for_department(dept.id).await.unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id, team.id);

    repo.delete_team(team.id).await.unwrap();
    assert!(!repo.department_has_teams(dept.id).await.unwrap());

    let missing = repo.get_team(team.id).await.unwrap_err();
    assert!(matches!(missing, QuotaplaneError::NotFound { .. }));
}

#[tokio::test]
async fn server_defaults_to_active_status() {
    let db = setup().await;
    let repo = SurrealServerRepository::new(db);

    let server = repo
        .create_server(CreateServer {
            name: "node-01".into(),
            vendor: None,
            site: Some("site-a".into()),
            cpu: Some(64),
            ram_gb: Some(256),
            serial_number: Some("SN123".into()),
        })
        .await
        .unwrap();
    assert_eq!(server.status, ServerStatus::Active);
    assert_eq!(repo.list_servers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn allocation_unique_per_server_and_capacity_sums_by_site() {
    let db = setup().await;
    let servers = SurrealServerRepository::new(db.clone());
    let allocations = SurrealAllocationRepository::new(db);
    let field = Uuid::new_v4();

    let mut ids = Vec::new();
    for (name, site, cpu, ram) in [
        ("node-01", "site-a", 32, 128),
        ("node-02", "site-a", 16, 64),
        ("node-03", "site-b", 8, 32),
    ] {
        let server = servers
            .create_server(CreateServer {
                name: name.into(),
                vendor: None,
                site: Some(site.into()),
                cpu: Some(cpu),
                ram_gb: Some(ram),
                serial_number: None,
            })
            .await
            .unwrap();
        allocations
            .create_allocation(server.id, field, "admin".into())
            .await
            .unwrap();
        ids.push(server.id);
    }

    // The unique index rejects a second binding for the same server.
    assert!(allocations
        .create_allocation(ids[0], Uuid::new_v4(), "admin".into())
        .await
        .is_err());

    // Capacity counts only the servers located at the requested site.
    let capacity = allocations.field_capacity(field, "site-a").await.unwrap();
    assert_eq!(capacity, Resources::new(48, 192));
    let capacity = allocations.field_capacity(field, "site-b").await.unwrap();
    assert_eq!(capacity, Resources::new(8, 32));
}

#[tokio::test]
async fn replace_allocation_moves_binding() {
    let db = setup().await;
    let servers = SurrealServerRepository::new(db.clone());
    let allocations = SurrealAllocationRepository::new(db);
    let (field_a, field_b) = (Uuid::new_v4(), Uuid::new_v4());

    let server = servers
        .create_server(CreateServer {
            name: "node-01".into(),
            vendor: None,
            site: Some("site-a".into()),
            cpu: Some(32),
            ram_gb: Some(128),
            serial_number: None,
        })
        .await
        .unwrap();
    let old = allocations
        .create_allocation(server.id, field_a, "admin".into())
        .await
        .unwrap();

    let new = allocations
        .replace_allocation(old.id, server.id, field_b, "admin".into())
        .await
        .unwrap();
    assert_eq!(new.field_id, field_b);

    let current = allocations
        .get_allocation_for_server(server.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.id, new.id);
    assert!(allocations
        .list_allocations_for_field(field_a)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn quota_unique_per_level_node_site() {
    let db = setup().await;
    let quotas = SurrealQuotaRepository::new(db);
    let (parent, node) = (Uuid::new_v4(), Uuid::new_v4());

    let quota = quotas
        .create_quota(CreateQuota {
            level: QuotaLevel::Department,
            parent_id: parent,
            node_id: node,
            site: "site-a".into(),
            limits: Resources::new(40, 160),
        })
        .await
        .unwrap();
    assert_eq!(quota.used(), Resources::ZERO);

    // Same (level, node, site) violates the unique index.
    assert!(quotas
        .create_quota(CreateQuota {
            level: QuotaLevel::Department,
            parent_id: parent,
            node_id: node,
            site: "site-a".into(),
            limits: Resources::new(1, 1),
        })
        .await
        .is_err());

    // A different site is a separate row.
    quotas
        .create_quota(CreateQuota {
            level: QuotaLevel::Department,
            parent_id: parent,
            node_id: node,
            site: "site-b".into(),
            limits: Resources::new(10, 40),
        })
        .await
        .unwrap();
    assert_eq!(
        quotas
            .list_quotas_for_parent(QuotaLevel::Department, parent)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn used_quota_predicates() {
    let db = setup().await;
    let quotas = SurrealQuotaRepository::new(db);
    let (parent, node) = (Uuid::new_v4(), Uuid::new_v4());

    let quota = quotas
        .create_quota(CreateQuota {
            level: QuotaLevel::Department,
            parent_id: parent,
            node_id: node,
            site: "site-a".into(),
            limits: Resources::new(40, 160),
        })
        .await
        .unwrap();

    assert!(!quotas
        .parent_has_used_quota(QuotaLevel::Department, parent)
        .await
        .unwrap());
    assert!(!quotas
        .node_has_used_quota(QuotaLevel::Department, node)
        .await
        .unwrap());

    quotas
        .set_used(quota.id, Resources::new(5, 20))
        .await
        .unwrap();

    assert!(quotas
        .parent_has_used_quota(QuotaLevel::Department, parent)
        .await
        .unwrap());
    assert!(quotas
        .node_has_used_quota(QuotaLevel::Department, node)
        .await
        .unwrap());
}

#[tokio::test]
async fn project_create_debits_and_rollback_credits_atomically() {
    let db = setup().await;
    let quotas = SurrealQuotaRepository::new(db.clone());
    let projects = SurrealProjectRepository::new(db);
    let team = Uuid::new_v4();

    let quota = quotas
        .create_quota(CreateQuota {
            level: QuotaLevel::Team,
            parent_id: Uuid::new_v4(),
            node_id: team,
            site: "site-a".into(),
            limits: Resources::new(10, 40),
        })
        .await
        .unwrap();

    let project = projects
        .create_project_with_debit(
            CreateProject {
                team_id: team,
                name: "etl".into(),
                site: "site-a".into(),
                sla_tier: SlaTier::Bronze,
                performance_tier: PerformanceTier::Regular,
                namespace: format!("{team}-etl"),
                quota: Resources::new(2, 4),
            },
            quota.id,
            Resources::new(2, 4),
        )
        .await
        .unwrap();
    assert_eq!(project.status, ProjectStatus::Provisioning);
    assert_eq!(
        quotas.get_quota_by_id(quota.id).await.unwrap().used(),
        Resources::new(2, 4)
    );
    assert!(projects.team_has_live_projects(team).await.unwrap());

    projects
        .mark_failed_with_credit(project.id, quota.id, Resources::ZERO)
        .await
        .unwrap();
    let failed = projects.get_project(project.id).await.unwrap();
    assert_eq!(failed.status, ProjectStatus::Failed);
    assert_eq!(
        quotas.get_quota_by_id(quota.id).await.unwrap().used(),
        Resources::ZERO
    );
    assert!(!projects.team_has_live_projects(team).await.unwrap());
}

#[tokio::test]
async fn project_namespace_unique() {
    let db = setup().await;
    let quotas = SurrealQuotaRepository::new(db.clone());
    let projects = SurrealProjectRepository::new(db);
    let team = Uuid::new_v4();

    let quota = quotas
        .create_quota(CreateQuota {
            level: QuotaLevel::Team,
            parent_id: Uuid::new_v4(),
            node_id: team,
            site: "site-a".into(),
            limits: Resources::new(10, 40),
        })
        .await
        .unwrap();

    let input = CreateProject {
        team_id: team,
        name: "etl".into(),
        site: "site-a".into(),
        sla_tier: SlaTier::Bronze,
        performance_tier: PerformanceTier::Regular,
        namespace: format!("{team}-etl"),
        quota: Resources::new(2, 4),
    };
    assert!(!projects.namespace_in_use(&input.namespace).await.unwrap());
    projects
        .create_project_with_debit(input.clone(), quota.id, Resources::new(2, 4))
        .await
        .unwrap();
    assert!(projects.namespace_in_use(&input.namespace).await.unwrap());

    // Same namespace again: the whole batch fails, including the debit.
    assert!(projects
        .create_project_with_debit(input, quota.id, Resources::new(4, 8))
        .await
        .is_err());
    assert_eq!(
        quotas.get_quota_by_id(quota.id).await.unwrap().used(),
        Resources::new(2, 4)
    );
}

#[tokio::test]
async fn mark_deleting_stamps_deleted_at() {
    let db = setup().await;
    let quotas = SurrealQuotaRepository::new(db.clone());
    let projects = SurrealProjectRepository::new(db);
    let team = Uuid::new_v4();

    let quota = quotas
        .create_quota(CreateQuota {
            level: QuotaLevel::Team,
            parent_id: Uuid::new_v4(),
            node_id: team,
            site: "site-a".into(),
            limits: Resources::new(10, 40),
        })
        .await
        .unwrap();
    let project = projects
        .create_project_with_debit(
            CreateProject {
                team_id: team,
                name: "etl".into(),
                site: "site-a".into(),
                sla_tier: SlaTier::Bronze,
                performance_tier: PerformanceTier::Regular,
                namespace: format!("{team}-etl"),
                quota: Resources::new(2, 4),
            },
            quota.id,
            Resources::new(2, 4),
        )
        .await
        .unwrap();

    projects
        .mark_deleting_with_credit(project.id, quota.id, Resources::ZERO)
        .await
        .unwrap();
    let deleting = projects.get_project(project.id).await.unwrap();
    assert_eq!(deleting.status, ProjectStatus::Deleting);
    assert!(deleting.deleted_at.is_some());

    projects
        .set_status(project.id, ProjectStatus::Deleted)
        .await
        .unwrap();
    assert!(!projects.team_has_live_projects(team).await.unwrap());
}
