//! Repository-level tests for provisioning requests and databases.

use sqlx::PgPool;

use dbprov_core::provisioning::RequestStatus;
use dbprov_db::models::database::CreateProvisionedDatabase;
use dbprov_db::models::request::{CreateProvisioningRequest, RecordDecision};
use dbprov_db::repositories::{DatabaseRepo, RequestRepo};

fn new_request(team: &str) -> CreateProvisioningRequest {
    CreateProvisioningRequest {
        team_name: team.to_string(),
        db_type: "postgres".to_string(),
        environment: "prod".to_string(),
        size: "large".to_string(),
        purpose: "Analytics warehouse".to_string(),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_starts_pending(pool: PgPool) {
    let created = RequestRepo::create(&pool, &new_request("data-engineering"))
        .await
        .unwrap();

    assert_eq!(created.status, "pending");
    assert_eq!(created.team_name, "data-engineering");
    assert!(created.approved_at.is_none());

    let found = RequestRepo::find_by_id(&pool, created.id).await.unwrap();
    assert_eq!(found.unwrap().id, created.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_find_unknown_returns_none(pool: PgPool) {
    let found = RequestRepo::find_by_id(&pool, uuid::Uuid::new_v4())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_filters_by_status(pool: PgPool) {
    let first = RequestRepo::create(&pool, &new_request("alpha")).await.unwrap();
    RequestRepo::create(&pool, &new_request("beta")).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    RequestRepo::record_decision(
        &mut tx,
        first.id,
        &RecordDecision {
            status: RequestStatus::Rejected.as_str().to_string(),
            approver: "jane.smith@company.com".to_string(),
            notes: None,
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let pending = RequestRepo::list(&pool, Some(RequestStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].team_name, "beta");

    let rejected = RequestRepo::list(&pool, Some(RequestStatus::Rejected)).await.unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].approver.as_deref(), Some("jane.smith@company.com"));
    assert!(rejected[0].approved_at.is_some());

    let all = RequestRepo::list(&pool, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unfiltered_list_is_capped(pool: PgPool) {
    for i in 0..55 {
        RequestRepo::create(&pool, &new_request(&format!("team-{i}")))
            .await
            .unwrap();
    }

    let all = RequestRepo::list(&pool, None).await.unwrap();
    assert_eq!(all.len(), 50);

    let pending = RequestRepo::list(&pool, Some(RequestStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 55);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_provision_and_list_active(pool: PgPool) {
    let request = RequestRepo::create(&pool, &new_request("data-engineering"))
        .await
        .unwrap();

    let mut tx = pool.begin().await.unwrap();
    let locked = RequestRepo::lock_for_update(&mut tx, request.id)
        .await
        .unwrap()
        .expect("request exists");
    assert_eq!(locked.status, "pending");

    DatabaseRepo::create(
        &mut tx,
        request.id,
        &CreateProvisionedDatabase {
            db_name: "data_engineering_prod_postgres_ab12cd34".to_string(),
            db_type: "postgres".to_string(),
            environment: "prod".to_string(),
            host: "db-cluster.example.com".to_string(),
            port: 5432,
            estimated_monthly_cost: 500.0,
        },
    )
    .await
    .unwrap();
    let provisioned = RequestRepo::mark_provisioned(&mut tx, request.id).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(provisioned.status, "provisioned");
    assert!(provisioned.provisioned_at.is_some());

    let active = DatabaseRepo::list_active(&pool).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].team_name, "data-engineering");
    assert_eq!(active[0].port, 5432);
    assert_eq!(active[0].estimated_monthly_cost, 500.0);

    let by_request = DatabaseRepo::find_by_request(&pool, request.id).await.unwrap();
    assert_eq!(by_request.unwrap().db_name, active[0].db_name);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rolled_back_provisioning_leaves_no_database(pool: PgPool) {
    let request = RequestRepo::create(&pool, &new_request("backend-team"))
        .await
        .unwrap();

    {
        let mut tx = pool.begin().await.unwrap();
        DatabaseRepo::create(
            &mut tx,
            request.id,
            &CreateProvisionedDatabase {
                db_name: "backend_team_dev_mysql_00000000".to_string(),
                db_type: "mysql".to_string(),
                environment: "dev".to_string(),
                host: "db-cluster.example.com".to_string(),
                port: 3306,
                estimated_monthly_cost: 50.0,
            },
        )
        .await
        .unwrap();
        // Dropped without commit.
    }

    assert!(DatabaseRepo::list_active(&pool).await.unwrap().is_empty());
}
