//! Pipeline and credential flow integration tests.
//!
//! These run against a migrated Postgres named by DATABASE_URL and are
//! ignored by default.

#![cfg(feature = "database")]

use nexus::database::client_service::NewClientFields;
use nexus::database::credential_service::NewCredentialFields;
use nexus::database::{ClientService, CredentialService};
use nexus::pipeline::service::PipelineService;
use nexus::pipeline::{StepCatalog, StepStatus};
use nexus::vault::MemoryStore;
use sqlx::PgPool;
use uuid::Uuid;

async fn connect() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for integration tests");
    PgPool::connect(&url).await.expect("database connection")
}

async fn seed_client(pool: &PgPool) -> Uuid {
    ClientService::new(pool.clone())
        .create_client(&NewClientFields {
            name: format!("it-client-{}", Uuid::new_v4()),
            contact_email: None,
            plan_id: None,
        })
        .await
        .expect("seed client")
}

async fn progress_row_count(pool: &PgPool, client_id: Uuid, group: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM nexus.pipeline_progress WHERE client_id = $1 AND pipeline_group = $2",
    )
    .bind(client_id)
    .bind(group)
    .fetch_one(pool)
    .await
    .expect("count progress rows")
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn advancing_fresh_group_creates_exactly_one_row_for_first_step() {
    let pool = connect().await;
    let catalog = StepCatalog::default();
    let service = PipelineService::new(pool.clone());

    let client_id = seed_client(&pool).await;
    let group = service.restart(client_id);

    let outcome = service
        .advance(&catalog, client_id, group, StepStatus::Completed)
        .await
        .expect("advance");

    assert!(!outcome.complete);
    let step = outcome.step.expect("acted on a step");
    assert_eq!(step.step_order, catalog.steps()[0].step_order);
    assert_eq!(progress_row_count(&pool, client_id, group).await, 1);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn two_sequential_advances_complete_first_two_steps_in_order() {
    let pool = connect().await;
    let catalog = StepCatalog::default();
    let service = PipelineService::new(pool.clone());

    let client_id = seed_client(&pool).await;
    let group = service.restart(client_id);

    service
        .advance(&catalog, client_id, group, StepStatus::Completed)
        .await
        .expect("first advance");
    service
        .advance(&catalog, client_id, group, StepStatus::Completed)
        .await
        .expect("second advance");

    let status = service
        .status(&catalog, client_id, group)
        .await
        .expect("status");
    assert_eq!(status.steps[0].status, StepStatus::Completed);
    assert_eq!(status.steps[1].status, StepStatus::Completed);
    assert!(status.steps[2..]
        .iter()
        .all(|s| s.status == StepStatus::Pending));
    assert_eq!(status.current_step.as_deref(), Some("analysis"));
    assert_eq!(progress_row_count(&pool, client_id, group).await, 2);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn in_progress_advance_then_completion_updates_the_same_row() {
    let pool = connect().await;
    let catalog = StepCatalog::default();
    let service = PipelineService::new(pool.clone());

    let client_id = seed_client(&pool).await;
    let group = service.restart(client_id);

    service
        .advance(&catalog, client_id, group, StepStatus::InProgress)
        .await
        .expect("start step");
    service
        .advance(&catalog, client_id, group, StepStatus::Completed)
        .await
        .expect("complete step");

    // Same step both times, so still a single row.
    assert_eq!(progress_row_count(&pool, client_id, group).await, 1);
    let status = service
        .status(&catalog, client_id, group)
        .await
        .expect("status");
    assert_eq!(status.steps[0].status, StepStatus::Completed);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn credential_delete_purges_vault_keys_exactly_once() {
    let pool = connect().await;
    let client_id = seed_client(&pool).await;

    let store = MemoryStore::new();
    let service = CredentialService::new(pool.clone());
    let credential_id = service
        .create_credential(
            &store,
            &NewCredentialFields {
                client_id,
                name: "crm-api".to_string(),
                service_type: "crm".to_string(),
                fields: vec![
                    ("api_key".to_string(), "sk-123".to_string()),
                    ("api_secret".to_string(), "shh".to_string()),
                ],
            },
        )
        .await
        .expect("create credential");

    assert_eq!(store.len().await, 2);

    let deleted = service
        .delete_credential(&store, credential_id)
        .await
        .expect("delete credential");
    assert!(deleted);

    // Both keys purged, each exactly once, and the rows are gone.
    assert!(store.is_empty().await);
    assert_eq!(store.deletions().await.len(), 2);
    assert!(service
        .get_credential_by_id(credential_id)
        .await
        .expect("lookup")
        .is_none());
    assert!(service
        .list_fields(credential_id)
        .await
        .expect("fields")
        .is_empty());

    // A second delete is a no-op and purges nothing further.
    let deleted_again = service
        .delete_credential(&store, credential_id)
        .await
        .expect("second delete");
    assert!(!deleted_again);
    assert_eq!(store.deletions().await.len(), 2);
}
