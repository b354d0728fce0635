//! Fight challenge workflow tests
//!
//! Drives registration, challenge creation, the action workflow and combat
//! completion through the public services, over the in-memory store and a
//! capturing notification sender.

mod common;

use chrono::{Duration, Utc};

use common::{email_for, TestWorld, OTHER_PROJECT, PROJECT};
use taskogotchi_common::Error;
use taskogotchi_fights::{
    FightAction, FightStatus, NewTaskogotchi, TaskogotchiUpdate, ALREADY_IN_FIGHT,
    OPPONENT_IN_FIGHT,
};
use taskogotchi_notify::mock::MockNotificationSender;

const ALL_ACTIONS: [&str; 5] = ["accept", "start", "complete", "cancel", "decline"];

async fn duel() -> TestWorld {
    let world = TestWorld::new();
    world
        .player_with(
            "alice",
            PROJECT,
            Some(email_for("alice")),
            NewTaskogotchi {
                health: Some(80),
                strength: Some(130),
                ..Default::default()
            },
        )
        .await;
    world.player("bob", PROJECT).await;
    world
}

// ============================================================================
// Creation
// ============================================================================

#[test_log::test(tokio::test)]
async fn test_create_snapshots_current_stats() {
    let world = duel().await;

    let challenge = world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "bob")
        .await
        .unwrap();

    assert_eq!(challenge.status, FightStatus::WaitingAccept);
    assert_eq!(challenge.initiator_health, 80);
    assert_eq!(challenge.initiator_strength, 130);
    assert_eq!(challenge.opponent_health, 100);
    assert_eq!(challenge.opponent_strength, 100);
    assert!(!challenge.draw);
    assert_eq!(challenge.winner_id, None);
}

#[tokio::test]
async fn test_snapshot_survives_later_pet_changes() {
    let world = duel().await;
    let challenge = world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "bob")
        .await
        .unwrap();

    world
        .services
        .registration
        .update_taskogotchi(
            "alice",
            PROJECT,
            TaskogotchiUpdate {
                health: Some(5),
                strength: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let read_back = world.services.fights.current_challenge("alice").await.unwrap();
    assert_eq!(read_back.id, challenge.id);
    assert_eq!(read_back.initiator_health, 80);
    assert_eq!(read_back.initiator_strength, 130);
    assert_eq!(read_back, challenge);
}

#[tokio::test]
async fn test_cannot_challenge_yourself() {
    let world = duel().await;

    let result = world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "alice")
        .await;

    assert!(matches!(result, Err(Error::Validation(ref m)) if m == "You can't fight with yourself"));
    assert_eq!(world.store.challenge_count().unwrap(), 0);
}

#[tokio::test]
async fn test_cannot_challenge_across_projects() {
    let world = duel().await;
    world.player("carol", OTHER_PROJECT).await;

    // Profiles resolve within the requester's project only
    let result = world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "carol")
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(world.store.challenge_count().unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_initiator_is_not_found() {
    let world = duel().await;
    let result = world
        .services
        .fights
        .create_challenge(PROJECT, "mallory", "bob")
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_busy_players_cannot_be_challenged() {
    let world = duel().await;
    world.player("carol", PROJECT).await;
    let fights = &world.services.fights;

    fights.create_challenge(PROJECT, "alice", "bob").await.unwrap();

    let own = fights.create_challenge(PROJECT, "alice", "carol").await;
    assert!(matches!(own, Err(Error::Conflict(ref m)) if m == ALREADY_IN_FIGHT));

    let theirs = fights.create_challenge(PROJECT, "carol", "bob").await;
    assert!(matches!(theirs, Err(Error::Conflict(ref m)) if m == OPPONENT_IN_FIGHT));

    assert_eq!(world.store.challenge_count().unwrap(), 1);
}

#[tokio::test]
async fn test_fight_in_one_project_blocks_the_account_in_others() {
    let world = duel().await;
    world.player("alice", OTHER_PROJECT).await;
    world.player("carol", OTHER_PROJECT).await;
    let fights = &world.services.fights;

    fights.create_challenge(PROJECT, "alice", "bob").await.unwrap();

    let own = fights.create_challenge(OTHER_PROJECT, "alice", "carol").await;
    assert!(matches!(own, Err(Error::Conflict(ref m)) if m == ALREADY_IN_FIGHT));

    let theirs = fights.create_challenge(OTHER_PROJECT, "carol", "alice").await;
    assert!(matches!(theirs, Err(Error::Conflict(ref m)) if m == OPPONENT_IN_FIGHT));

    assert_eq!(world.store.challenge_count().unwrap(), 1);
    let current = tokio_test::assert_ok!(fights.current_challenge("alice").await);
    assert_eq!(current.status, FightStatus::WaitingAccept);

    let opponents = fights
        .available_opponents("carol", OTHER_PROJECT)
        .await
        .unwrap();
    let alice = opponents
        .iter()
        .find(|o| o.profile.account_id == "alice")
        .unwrap();
    assert!(alice.in_fight);
}

#[tokio::test]
async fn test_new_challenge_allowed_after_previous_ends() {
    let world = duel().await;
    let fights = &world.services.fights;

    fights.create_challenge(PROJECT, "alice", "bob").await.unwrap();
    fights
        .update_challenge(PROJECT, "bob", "decline", None)
        .await
        .unwrap();

    let rematch = tokio_test::assert_ok!(fights.create_challenge(PROJECT, "bob", "alice").await);
    assert_eq!(rematch.status, FightStatus::WaitingAccept);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_fight_call_sent_to_opponent() {
    let world = duel().await;
    let challenge = world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "bob")
        .await
        .unwrap();

    let call = world
        .notifier
        .get_latest_fight_call(&email_for("bob"))
        .expect("fight call captured");
    assert_eq!(call.challenge_id(), Some(challenge.id));
    assert_eq!(call.message.subject, "New fight challenge");
    assert_eq!(call.message.from, "notification@backend.guard-lite.com");
    assert!(call.message.body_text.contains("Alice"));
    assert!(call.message.body_text.contains("Project PRJ-APOLLO"));
    assert!(!world.notifier.was_fight_call_sent_to(&email_for("alice")));
}

#[tokio::test]
async fn test_no_fight_call_without_opponent_email() {
    let world = TestWorld::new();
    world.player("alice", PROJECT).await;
    world
        .player_with("bob", PROJECT, None, NewTaskogotchi::default())
        .await;

    world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "bob")
        .await
        .unwrap();

    assert_eq!(world.notifier.message_count(), 0);
}

#[test_log::test(tokio::test)]
async fn test_failed_fight_call_keeps_challenge() {
    let world = TestWorld::with_notifier(MockNotificationSender::new_failing());
    world.player("alice", PROJECT).await;
    world.player("bob", PROJECT).await;

    let challenge = world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "bob")
        .await
        .unwrap();

    let stored = world.services.fights.current_challenge("bob").await.unwrap();
    assert_eq!(stored.id, challenge.id);
    assert_eq!(world.notifier.message_count(), 0);
}

// ============================================================================
// Transitions
// ============================================================================

#[tokio::test]
async fn test_accept_then_cancel_from_waiting() {
    let world = duel().await;
    let fights = &world.services.fights;
    fights.create_challenge(PROJECT, "alice", "bob").await.unwrap();

    let accepted = fights
        .update_challenge(PROJECT, "bob", "accept", None)
        .await
        .unwrap();
    assert_eq!(accepted.status, FightStatus::Accepted);

    let canceled = fights
        .update_challenge(PROJECT, "alice", "cancel", None)
        .await
        .unwrap();
    assert_eq!(canceled.status, FightStatus::Canceled);
    assert!(!canceled.draw);
    assert_eq!(canceled.winner_id, None);
}

#[tokio::test]
async fn test_illegal_actions_leave_waiting_challenge_unchanged() {
    let world = duel().await;
    let fights = &world.services.fights;
    let created = fights.create_challenge(PROJECT, "alice", "bob").await.unwrap();

    for action in ["start", "complete"] {
        let result = fights.update_challenge(PROJECT, "bob", action, None).await;
        match result {
            Err(Error::Validation(message)) => {
                assert!(message.contains(action), "{message}");
                assert!(message.contains("waiting_accept"), "{message}");
            }
            other => panic!("{action} should fail, got {other:?}"),
        }
    }

    let stored = fights.current_challenge("alice").await.unwrap();
    assert_eq!(stored, created);
}

#[tokio::test]
async fn test_unsupported_action() {
    let world = duel().await;
    let fights = &world.services.fights;
    fights.create_challenge(PROJECT, "alice", "bob").await.unwrap();

    let result = fights
        .update_challenge(PROJECT, "bob", "surrender", None)
        .await;
    assert!(
        matches!(result, Err(Error::Validation(ref m)) if m.contains("Unsupported action"))
    );
}

#[tokio::test]
async fn test_start_only_from_accepted() {
    let world = duel().await;
    let pending = world.pending_fight().await;
    assert_eq!(pending.status, FightStatus::Pending);

    let again = world
        .services
        .fights
        .update_challenge(PROJECT, "bob", "start", None)
        .await;
    assert!(matches!(again, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_complete_with_initiator_winner() {
    let world = duel().await;
    let pending = world.pending_fight().await;

    let done = world
        .services
        .fights
        .update_challenge(PROJECT, "bob", "complete", Some("alice"))
        .await
        .unwrap();

    assert_eq!(done.status, FightStatus::Completed);
    assert_eq!(done.winner_id, Some(pending.initiator_id));
    assert!(!done.draw);
}

#[tokio::test]
async fn test_complete_without_winner_is_draw() {
    let world = duel().await;
    world.pending_fight().await;

    let done = world
        .services
        .fights
        .update_challenge(PROJECT, "alice", "complete", None)
        .await
        .unwrap();

    assert_eq!(done.status, FightStatus::Completed);
    assert!(done.draw);
    assert_eq!(done.winner_id, None);
}

#[tokio::test]
async fn test_complete_with_bystander_winner_fails() {
    let world = duel().await;
    world.player("carol", PROJECT).await;
    let pending = world.pending_fight().await;

    let result = world
        .services
        .fights
        .update_challenge(PROJECT, "alice", "complete", Some("carol"))
        .await;
    assert!(matches!(
        result,
        Err(Error::Validation(ref m))
            if m == "winner_account_id must be either initiator or opponent account_id"
    ));

    let stored = world.services.fights.current_challenge("alice").await.unwrap();
    assert_eq!(stored, pending);
}

#[tokio::test]
async fn test_complete_with_winner_from_other_project_fails() {
    let world = duel().await;
    world.player("carol", OTHER_PROJECT).await;
    world.pending_fight().await;

    let result = world
        .services
        .fights
        .update_challenge(PROJECT, "alice", "complete", Some("carol"))
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_terminal_challenges_reject_every_action() {
    let world = duel().await;
    let pending = world.pending_fight().await;
    let fights = &world.services.fights;

    let completed = fights
        .process_action(FightAction::Complete, pending.clone(), Some("bob"), false)
        .await
        .unwrap();
    let canceled = fights
        .process_action(FightAction::Cancel, pending, None, false)
        .await
        .unwrap();

    for terminal in [completed, canceled] {
        for action in ALL_ACTIONS {
            let action: FightAction = action.parse().unwrap();
            let result = fights
                .process_action(action, terminal.clone(), None, false)
                .await;
            assert!(
                matches!(result, Err(Error::Validation(_))),
                "{} must reject {}",
                terminal.status,
                action
            );
        }
    }
}

#[tokio::test]
async fn test_no_active_challenge_after_completion() {
    let world = duel().await;
    world.pending_fight().await;
    let fights = &world.services.fights;

    fights
        .update_challenge(PROJECT, "alice", "complete", Some("bob"))
        .await
        .unwrap();

    let result = fights
        .update_challenge(PROJECT, "alice", "cancel", None)
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(matches!(
        fights.current_challenge("bob").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_stale_save_is_a_conflict() {
    let world = duel().await;
    let fights = &world.services.fights;
    let created = fights.create_challenge(PROJECT, "alice", "bob").await.unwrap();

    fights
        .process_action(FightAction::Accept, created.clone(), None, true)
        .await
        .unwrap();
    let late = fights
        .process_action(FightAction::Cancel, created, None, true)
        .await;

    assert!(matches!(late, Err(Error::Conflict(_))));
    let stored = fights.current_challenge("alice").await.unwrap();
    assert_eq!(stored.status, FightStatus::Accepted);
}

#[tokio::test]
async fn test_concurrent_actions_have_one_winner() {
    let world = duel().await;
    let created = world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "bob")
        .await
        .unwrap();

    let accept = world
        .services
        .fights
        .process_action(FightAction::Accept, created.clone(), None, true);
    let cancel = world
        .services
        .fights
        .process_action(FightAction::Cancel, created, None, true);
    let (accepted, canceled) = tokio::join!(accept, cancel);

    assert!(accepted.is_ok() != canceled.is_ok());
}

// ============================================================================
// Opponents and combat
// ============================================================================

#[tokio::test]
async fn test_available_opponents() {
    let world = duel().await;
    world.player("carol", PROJECT).await;
    world.player("dave", OTHER_PROJECT).await;
    world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "bob")
        .await
        .unwrap();

    let opponents = world
        .services
        .fights
        .available_opponents("carol", PROJECT)
        .await
        .unwrap();

    let seen: Vec<(String, bool)> = opponents
        .into_iter()
        .map(|o| (o.profile.account_id, o.in_fight))
        .collect();
    assert_eq!(
        seen,
        vec![("alice".to_string(), true), ("bob".to_string(), true)]
    );

    let for_alice = world
        .services
        .fights
        .available_opponents("alice", PROJECT)
        .await
        .unwrap();
    let carol = for_alice
        .iter()
        .find(|o| o.profile.account_id == "carol")
        .unwrap();
    assert!(!carol.in_fight);
    assert_eq!(carol.taskogotchi, world.pet("carol", PROJECT).await);
}

#[test_log::test(tokio::test)]
async fn test_combat_to_the_death() {
    let world = duel().await;
    let pending = world.pending_fight().await;
    let fights = &world.services.fights;

    let t0 = Utc::now();
    let mut fight = fights.start_combat(pending.id, t0).await.unwrap();
    assert_eq!(fight.initiator.strength, 130);

    let mut now = t0 + Duration::seconds(3);
    while !fight.is_ended(now) {
        fight.attack("alice", now).unwrap();
        now += Duration::milliseconds(100);
    }

    // 13 damage per hit against 100 health
    assert!(fight.opponent.is_dead());
    assert!((fight.initiator.health - 80.0).abs() < f64::EPSILON);

    let done = fights.finish_combat(pending.id, &fight, now).await.unwrap();
    assert_eq!(done.status, FightStatus::Completed);
    assert_eq!(done.winner_id, Some(pending.initiator_id));
}

#[tokio::test]
async fn test_combat_timeout_is_a_draw() {
    let world = duel().await;
    let pending = world.pending_fight().await;
    let fights = &world.services.fights;

    let t0 = Utc::now();
    let mut fight = fights.start_combat(pending.id, t0).await.unwrap();
    fight.attack("bob", t0 + Duration::seconds(5)).unwrap();

    let after_timeout = t0 + Duration::seconds(40);
    let done = fights
        .finish_combat(pending.id, &fight, after_timeout)
        .await
        .unwrap();
    assert!(done.draw);
    assert_eq!(done.winner_id, None);
}

#[tokio::test]
async fn test_combat_requires_pending_challenge() {
    let world = duel().await;
    let created = world
        .services
        .fights
        .create_challenge(PROJECT, "alice", "bob")
        .await
        .unwrap();

    let result = world.services.fights.start_combat(created.id, Utc::now()).await;
    assert!(matches!(result, Err(Error::Validation(_))));
}
