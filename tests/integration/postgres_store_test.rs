//! PostgreSQL store tests
//!
//! Run against a real database:
//! `TEST_DATABASE_URL=postgresql://... cargo test -p taskogotchi-integration-tests -- --ignored`

mod common;

use std::sync::Arc;

use chrono::Utc;
use serial_test::serial;

use common::{TestDatabase, PROJECT};
use taskogotchi_app::Services;
use taskogotchi_common::Error;
use taskogotchi_fights::{
    ChallengeStore, FightAction, FightStatus, FightsRepositories, NewTaskogotchi,
    RegisterPlayerRequest,
};
use taskogotchi_notify::mock::MockNotificationSender;

async fn services(db: &TestDatabase) -> (Services, MockNotificationSender) {
    let notifier = MockNotificationSender::new();
    let services = Services::postgres(db.pool.clone(), Arc::new(notifier.clone()));
    (services, notifier)
}

async fn register(services: &Services, account_id: &str) {
    services
        .registration
        .register_player(RegisterPlayerRequest {
            account_id: account_id.to_string(),
            player_name: None,
            email: Some(format!("{}@example.com", account_id)),
            project_id: PROJECT.to_string(),
            project_name: Some("Apollo".to_string()),
        })
        .await
        .unwrap();
    services
        .registration
        .create_taskogotchi(account_id, PROJECT, NewTaskogotchi::default())
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
#[serial]
async fn test_register_upserts_player_and_project() {
    let db = TestDatabase::connect().await.unwrap();
    let (services, _) = services(&db).await;

    let first = services
        .registration
        .register_player(RegisterPlayerRequest {
            account_id: "alice".to_string(),
            player_name: Some("Alice".to_string()),
            email: None,
            project_id: PROJECT.to_string(),
            project_name: None,
        })
        .await
        .unwrap();
    let second = services
        .registration
        .register_player(RegisterPlayerRequest {
            account_id: "alice".to_string(),
            player_name: Some("Alicia".to_string()),
            email: Some("alice@example.com".to_string()),
            project_id: PROJECT.to_string(),
            project_name: Some("Apollo".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.player_name.as_deref(), Some("Alicia"));
    assert_eq!(second.project_name.as_deref(), Some("Apollo"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
#[serial]
async fn test_second_taskogotchi_is_conflict() {
    let db = TestDatabase::connect().await.unwrap();
    let (services, _) = services(&db).await;
    register(&services, "alice").await;

    let result = services
        .registration
        .create_taskogotchi("alice", PROJECT, NewTaskogotchi::default())
        .await;
    assert!(matches!(result, Err(Error::Conflict(_))));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
#[serial]
async fn test_full_fight_lifecycle() {
    let db = TestDatabase::connect().await.unwrap();
    let (services, notifier) = services(&db).await;
    register(&services, "alice").await;
    register(&services, "bob").await;
    let fights = &services.fights;

    let created = fights.create_challenge(PROJECT, "alice", "bob").await.unwrap();
    assert!(notifier.was_fight_call_sent_to("bob@example.com"));

    let busy = fights.create_challenge(PROJECT, "bob", "alice").await;
    assert!(matches!(busy, Err(Error::Conflict(_))));

    fights
        .update_challenge(PROJECT, "bob", "accept", None)
        .await
        .unwrap();
    fights
        .update_challenge(PROJECT, "alice", "start", None)
        .await
        .unwrap();
    let done = fights
        .update_challenge(PROJECT, "bob", "complete", Some("bob"))
        .await
        .unwrap();

    assert_eq!(done.id, created.id);
    assert_eq!(done.status, FightStatus::Completed);
    assert_eq!(done.winner_id, Some(created.opponent_id));
    assert!(!done.draw);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
#[serial]
async fn test_stale_transition_is_conflict() {
    let db = TestDatabase::connect().await.unwrap();
    let (services, _) = services(&db).await;
    register(&services, "alice").await;
    register(&services, "bob").await;
    let fights = &services.fights;

    let created = fights.create_challenge(PROJECT, "alice", "bob").await.unwrap();
    fights
        .process_action(FightAction::Accept, created.clone(), None, true)
        .await
        .unwrap();
    let late = fights
        .process_action(FightAction::Cancel, created.clone(), None, true)
        .await;
    assert!(matches!(late, Err(Error::Conflict(_))));

    let repos = FightsRepositories::new(db.pool.clone());
    let stored = repos.find_challenge(created.id).await.unwrap().unwrap();
    assert_eq!(stored.status, FightStatus::Accepted);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
#[serial]
async fn test_schema_rejects_winner_on_open_challenge() {
    let db = TestDatabase::connect().await.unwrap();
    let (services, _) = services(&db).await;
    register(&services, "alice").await;
    register(&services, "bob").await;

    let created = services
        .fights
        .create_challenge(PROJECT, "alice", "bob")
        .await
        .unwrap();

    let result = sqlx::query(
        "UPDATE fight_challenges SET winner_id = initiator_id, updated_at = $2 WHERE id = $1",
    )
    .bind(created.id)
    .bind(Utc::now())
    .execute(&db.pool)
    .await;
    assert!(result.is_err());
}
