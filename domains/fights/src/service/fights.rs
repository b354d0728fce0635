//! Fight challenge service
//!
//! Creation, the action-driven status workflow and combat completion. Every
//! transition goes through [`FightChallenge::apply`] and is persisted with a
//! compare-and-set on the status it was read in.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::combat::Fight;
use crate::domain::entities::{FightChallenge, ProfileDetails, Taskogotchi};
use crate::domain::state::FightAction;
use crate::repository::{ChallengeStore, ProfileStore};
use crate::service::profile_not_found;
use taskogotchi_common::{Error, Result};
use taskogotchi_notify::{FightCall, NotificationSender};

/// Message when a `complete` winner is one of neither combatant
pub const WINNER_NOT_COMBATANT: &str =
    "winner_account_id must be either initiator or opponent account_id";

/// A possible opponent in the requester's project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentSummary {
    pub profile: ProfileDetails,
    pub taskogotchi: Taskogotchi,
    pub in_fight: bool,
}

/// Runs fight challenges between profiles of one project
#[derive(Clone)]
pub struct FightService {
    profiles: Arc<dyn ProfileStore>,
    challenges: Arc<dyn ChallengeStore>,
    notifier: Arc<dyn NotificationSender>,
}

impl FightService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        challenges: Arc<dyn ChallengeStore>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            profiles,
            challenges,
            notifier,
        }
    }

    async fn profile(&self, account_id: &str, project_id: &str) -> Result<ProfileDetails> {
        self.profiles
            .find_profile(account_id, project_id)
            .await?
            .ok_or_else(profile_not_found)
    }

    async fn taskogotchi(&self, profile: &ProfileDetails) -> Result<Taskogotchi> {
        self.profiles
            .find_taskogotchi(profile.id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Taskogotchi not found for account {}",
                    profile.account_id
                ))
            })
    }

    /// Challenge `opponent_id` to a fight in `project_id`.
    ///
    /// Both sides' current stats are snapshotted. The opponent is notified
    /// afterwards; a failed notification is logged and does not undo the
    /// challenge.
    pub async fn create_challenge(
        &self,
        project_id: &str,
        account_id: &str,
        opponent_id: &str,
    ) -> Result<FightChallenge> {
        let initiator = self.profile(account_id, project_id).await?;
        let opponent = self
            .profiles
            .find_profile(opponent_id, project_id)
            .await?
            .ok_or_else(|| Error::NotFound("Opponent profile not found".to_string()))?;

        let initiator_pet = self.taskogotchi(&initiator).await?;
        let opponent_pet = self.taskogotchi(&opponent).await?;

        let challenge = FightChallenge::new(&initiator, &initiator_pet, &opponent, &opponent_pet)?;
        let created = self.challenges.insert_challenge(&challenge).await?;

        tracing::info!(
            challenge_id = %created.id,
            initiator = %initiator.account_id,
            opponent = %opponent.account_id,
            status = %created.status,
            "Fight challenge created"
        );

        self.notify_fight_call(&created, &initiator, &opponent).await;
        Ok(created)
    }

    async fn notify_fight_call(
        &self,
        challenge: &FightChallenge,
        initiator: &ProfileDetails,
        opponent: &ProfileDetails,
    ) {
        let call = FightCall {
            challenge_id: challenge.id,
            initiator_name: initiator.player_name.clone(),
            initiator_email: initiator.email.clone(),
            project_name: initiator.project_name.clone(),
            opponent_email: opponent.email.clone(),
        };

        match self.notifier.send_fight_call(&call).await {
            Ok(Some(receipt)) => tracing::debug!(
                challenge_id = %challenge.id,
                message_id = %receipt.message_id,
                "Fight call sent"
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!(
                challenge_id = %challenge.id,
                error = %e,
                "Failed to send fight call"
            ),
        }
    }

    /// Apply `action` to the requester's active challenge in `project_id`
    pub async fn update_challenge(
        &self,
        project_id: &str,
        account_id: &str,
        action: &str,
        winner_account_id: Option<&str>,
    ) -> Result<FightChallenge> {
        let action = action
            .parse::<FightAction>()
            .map_err(|e| Error::Validation(e.to_string()))?;

        let profile = self.profile(account_id, project_id).await?;
        let mut active: Vec<FightChallenge> = self
            .challenges
            .active_challenges_for_account(account_id)
            .await?
            .into_iter()
            .filter(|c| c.involves(profile.id))
            .collect();

        let challenge = match active.len() {
            0 => {
                return Err(Error::NotFound(
                    "No active fight challenge found".to_string(),
                ))
            }
            1 => active.remove(0),
            n => {
                return Err(Error::Internal(format!(
                    "Profile {} has {} active fight challenges",
                    profile.id, n
                )))
            }
        };

        self.process_action(action, challenge, winner_account_id, true)
            .await
    }

    /// Run one state machine step on `challenge`.
    ///
    /// For `complete`, `winner_account_id` must name the initiator or the
    /// opponent; without it the fight ends in a draw. With `save` unset the
    /// mutated challenge is returned without touching storage.
    pub async fn process_action(
        &self,
        action: FightAction,
        challenge: FightChallenge,
        winner_account_id: Option<&str>,
        save: bool,
    ) -> Result<FightChallenge> {
        let previous = challenge.status;
        let winner_account_id = winner_account_id
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let winner_id = match winner_account_id {
            Some(account_id)
                if action == FightAction::Complete && challenge.can_transition(action) =>
            {
                Some(self.resolve_winner(&challenge, account_id).await?)
            }
            _ => None,
        };

        let mut updated = challenge;
        updated.apply(action, winner_id)?;

        if !save {
            return Ok(updated);
        }

        let saved = self.challenges.save_transition(&updated, previous).await?;
        tracing::info!(
            challenge_id = %saved.id,
            action = %action,
            from = %previous,
            to = %saved.status,
            draw = saved.draw,
            "Fight challenge transitioned"
        );
        Ok(saved)
    }

    async fn resolve_winner(&self, challenge: &FightChallenge, account_id: &str) -> Result<Uuid> {
        let winner = self
            .profiles
            .find_profile_in_project(account_id, challenge.project_id)
            .await?
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Winner account {} is not a member of this project",
                    account_id
                ))
            })?;

        if !challenge.involves(winner.id) {
            return Err(Error::Validation(WINNER_NOT_COMBATANT.to_string()));
        }
        Ok(winner.id)
    }

    /// The account's single active challenge
    pub async fn current_challenge(&self, account_id: &str) -> Result<FightChallenge> {
        let mut active = self
            .challenges
            .active_challenges_for_account(account_id)
            .await?;

        match active.len() {
            0 => Err(Error::NotFound(
                "No active fight challenge found".to_string(),
            )),
            1 => Ok(active.remove(0)),
            n => Err(Error::Internal(format!(
                "Account {} has {} active fight challenges",
                account_id, n
            ))),
        }
    }

    /// Everyone else in the project who owns a taskogotchi
    pub async fn available_opponents(
        &self,
        account_id: &str,
        project_id: &str,
    ) -> Result<Vec<OpponentSummary>> {
        let requester = self.profile(account_id, project_id).await?;
        let pets = self
            .profiles
            .list_taskogotchis_in_project(requester.project_id, requester.id)
            .await?;

        let mut opponents = Vec::with_capacity(pets.len());
        for pet in pets {
            let in_fight = self.challenges.has_active_challenge(pet.profile.id).await?;
            opponents.push(OpponentSummary {
                profile: pet.profile,
                taskogotchi: pet.taskogotchi,
                in_fight,
            });
        }
        Ok(opponents)
    }

    /// Set up combat for a pending challenge, starting the countdown at `now`
    pub async fn start_combat(&self, challenge_id: Uuid, now: DateTime<Utc>) -> Result<Fight> {
        let challenge = self.find_challenge(challenge_id).await?;
        let initiator = self.profile_by_id(challenge.initiator_id).await?;
        let opponent = self.profile_by_id(challenge.opponent_id).await?;
        Fight::from_challenge(&challenge, &initiator, &opponent, now)
    }

    /// Complete the challenge with the result of a finished fight
    pub async fn finish_combat(
        &self,
        challenge_id: Uuid,
        fight: &Fight,
        now: DateTime<Utc>,
    ) -> Result<FightChallenge> {
        if fight.challenge_id != challenge_id {
            return Err(Error::Validation(
                "Fight does not belong to this challenge".to_string(),
            ));
        }
        let outcome = fight
            .outcome(now)
            .ok_or_else(|| Error::Validation("Fight is still in progress".to_string()))?;

        let challenge = self.find_challenge(challenge_id).await?;
        self.process_action(
            FightAction::Complete,
            challenge,
            outcome.winner_account_id(),
            true,
        )
        .await
    }

    async fn find_challenge(&self, id: Uuid) -> Result<FightChallenge> {
        self.challenges
            .find_challenge(id)
            .await?
            .ok_or_else(|| Error::NotFound("Fight challenge not found".to_string()))
    }

    async fn profile_by_id(&self, id: Uuid) -> Result<ProfileDetails> {
        self.profiles
            .find_profile_by_id(id)
            .await?
            .ok_or_else(profile_not_found)
    }
}
