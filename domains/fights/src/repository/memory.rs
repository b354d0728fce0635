//! In-process store
//!
//! Implements [`ProfileStore`] and [`ChallengeStore`] over maps behind one
//! mutex, so every operation is atomic with respect to the others. Used by
//! tests and by deployments without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{ensure_idle, ChallengeStore, ProfileStore};
use crate::domain::entities::{
    FightChallenge, FightStatus, Player, PlayerProfile, ProfileDetails, ProfilePet, Project,
    Taskogotchi,
};
use taskogotchi_common::{Error, RepositoryError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    projects: HashMap<Uuid, Project>,
    players: HashMap<Uuid, Player>,
    profiles: HashMap<Uuid, PlayerProfile>,
    taskogotchis: HashMap<Uuid, Taskogotchi>,
    challenges: HashMap<Uuid, FightChallenge>,
}

impl MemoryState {
    fn details(&self, profile: &PlayerProfile) -> Option<ProfileDetails> {
        let player = self.players.get(&profile.player_id)?;
        let project = self.projects.get(&profile.project_id)?;
        Some(ProfileDetails::from_parts(profile, player, project))
    }

    fn find_details<F>(&self, predicate: F) -> Option<ProfileDetails>
    where
        F: Fn(&ProfileDetails) -> bool,
    {
        self.profiles
            .values()
            .filter_map(|profile| self.details(profile))
            .find(|details| predicate(details))
    }

    /// Whether the profile's player fights anywhere, in any of their projects
    fn is_busy(&self, profile_id: Uuid) -> bool {
        let Some(player_id) = self.profiles.get(&profile_id).map(|p| p.player_id) else {
            return false;
        };
        let siblings: Vec<Uuid> = self
            .profiles
            .values()
            .filter(|p| p.player_id == player_id)
            .map(|p| p.id)
            .collect();

        self.challenges
            .values()
            .any(|c| !c.is_terminal() && siblings.iter().any(|id| c.involves(*id)))
    }
}

/// Store that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("In-memory store lock poisoned".to_string()))
    }

    /// Number of stored challenges, in any status
    pub fn challenge_count(&self) -> Result<usize> {
        Ok(self.lock()?.challenges.len())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn upsert_project(&self, project: &Project) -> Result<Project> {
        let mut state = self.lock()?;
        let existing = state
            .projects
            .values_mut()
            .find(|p| p.external_id == project.external_id);

        let stored = match existing {
            Some(stored) => {
                stored.name = project.name.clone();
                stored.updated_at = project.updated_at;
                stored.clone()
            }
            None => {
                state.projects.insert(project.id, project.clone());
                project.clone()
            }
        };
        Ok(stored)
    }

    async fn upsert_player(&self, player: &Player) -> Result<Player> {
        let mut state = self.lock()?;
        let existing = state
            .players
            .values_mut()
            .find(|p| p.account_id == player.account_id);

        let stored = match existing {
            Some(stored) => {
                stored.name = player.name.clone();
                stored.email = player.email.clone();
                stored.updated_at = player.updated_at;
                stored.clone()
            }
            None => {
                state.players.insert(player.id, player.clone());
                player.clone()
            }
        };
        Ok(stored)
    }

    async fn get_or_create_profile(&self, profile: &PlayerProfile) -> Result<PlayerProfile> {
        let mut state = self.lock()?;
        if !state.players.contains_key(&profile.player_id)
            || !state.projects.contains_key(&profile.project_id)
        {
            return Err(RepositoryError::InvalidData(
                "Profile references an unknown player or project".to_string(),
            )
            .into());
        }

        let existing = state
            .profiles
            .values()
            .find(|p| p.player_id == profile.player_id && p.project_id == profile.project_id)
            .cloned();

        Ok(match existing {
            Some(stored) => stored,
            None => {
                state.profiles.insert(profile.id, profile.clone());
                profile.clone()
            }
        })
    }

    async fn find_profile(
        &self,
        account_id: &str,
        project_external_id: &str,
    ) -> Result<Option<ProfileDetails>> {
        let state = self.lock()?;
        Ok(state.find_details(|d| {
            d.account_id == account_id && d.project_external_id == project_external_id
        }))
    }

    async fn find_profile_in_project(
        &self,
        account_id: &str,
        project_id: Uuid,
    ) -> Result<Option<ProfileDetails>> {
        let state = self.lock()?;
        Ok(state.find_details(|d| d.account_id == account_id && d.project_id == project_id))
    }

    async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<ProfileDetails>> {
        let state = self.lock()?;
        Ok(state.profiles.get(&id).and_then(|p| state.details(p)))
    }

    async fn find_taskogotchi(&self, profile_id: Uuid) -> Result<Option<Taskogotchi>> {
        let state = self.lock()?;
        Ok(state
            .taskogotchis
            .values()
            .find(|t| t.profile_id == profile_id)
            .cloned())
    }

    async fn insert_taskogotchi(&self, pet: &Taskogotchi) -> Result<Taskogotchi> {
        let mut state = self.lock()?;
        if !state.profiles.contains_key(&pet.profile_id) {
            return Err(RepositoryError::InvalidData(
                "Taskogotchi references an unknown profile".to_string(),
            )
            .into());
        }
        if state
            .taskogotchis
            .values()
            .any(|t| t.profile_id == pet.profile_id || t.id == pet.id)
        {
            return Err(RepositoryError::AlreadyExists.into());
        }
        state.taskogotchis.insert(pet.id, pet.clone());
        Ok(pet.clone())
    }

    async fn update_taskogotchi(&self, pet: &Taskogotchi) -> Result<Taskogotchi> {
        let mut state = self.lock()?;
        let stored = state
            .taskogotchis
            .get_mut(&pet.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.image = pet.image.clone();
        stored.health = pet.health;
        stored.strength = pet.strength;
        stored.last_updated = pet.last_updated;
        Ok(stored.clone())
    }

    async fn list_taskogotchis_in_project(
        &self,
        project_id: Uuid,
        exclude_profile_id: Uuid,
    ) -> Result<Vec<ProfilePet>> {
        let state = self.lock()?;
        let mut pets: Vec<ProfilePet> = state
            .taskogotchis
            .values()
            .filter(|t| t.profile_id != exclude_profile_id)
            .filter_map(|t| {
                let profile = state.profiles.get(&t.profile_id)?;
                if profile.project_id != project_id {
                    return None;
                }
                Some(ProfilePet {
                    profile: state.details(profile)?,
                    taskogotchi: t.clone(),
                })
            })
            .collect();
        pets.sort_by(|a, b| a.profile.account_id.cmp(&b.profile.account_id));
        Ok(pets)
    }
}

#[async_trait]
impl ChallengeStore for InMemoryStore {
    async fn insert_challenge(&self, challenge: &FightChallenge) -> Result<FightChallenge> {
        challenge.validate()?;

        let mut state = self.lock()?;
        for profile_id in [challenge.initiator_id, challenge.opponent_id] {
            match state.profiles.get(&profile_id) {
                Some(profile) if profile.project_id == challenge.project_id => {}
                _ => {
                    return Err(RepositoryError::InvalidData(
                        "Combatant is not a profile of the challenge project".to_string(),
                    )
                    .into())
                }
            }
        }
        if state.challenges.contains_key(&challenge.id) {
            return Err(RepositoryError::AlreadyExists.into());
        }
        ensure_idle(
            state.is_busy(challenge.initiator_id),
            state.is_busy(challenge.opponent_id),
        )?;

        state.challenges.insert(challenge.id, challenge.clone());
        tracing::debug!(challenge_id = %challenge.id, "Fight challenge inserted");
        Ok(challenge.clone())
    }

    async fn find_challenge(&self, id: Uuid) -> Result<Option<FightChallenge>> {
        let state = self.lock()?;
        Ok(state.challenges.get(&id).cloned())
    }

    async fn save_transition(
        &self,
        challenge: &FightChallenge,
        expected: FightStatus,
    ) -> Result<FightChallenge> {
        challenge.validate()?;

        let mut state = self.lock()?;
        let stored = state
            .challenges
            .get_mut(&challenge.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::StaleWrite.into());
        }

        stored.status = challenge.status;
        stored.winner_id = challenge.winner_id;
        stored.draw = challenge.draw;
        stored.updated_at = challenge.updated_at;

        tracing::debug!(
            challenge_id = %stored.id,
            from = %expected,
            to = %stored.status,
            "Fight challenge transition saved"
        );
        Ok(stored.clone())
    }

    async fn active_challenges_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<FightChallenge>> {
        let state = self.lock()?;
        let profile_ids: Vec<Uuid> = state
            .profiles
            .values()
            .filter(|p| {
                state
                    .players
                    .get(&p.player_id)
                    .map(|player| player.account_id == account_id)
                    .unwrap_or(false)
            })
            .map(|p| p.id)
            .collect();

        let mut active: Vec<FightChallenge> = state
            .challenges
            .values()
            .filter(|c| !c.is_terminal() && profile_ids.iter().any(|id| c.involves(*id)))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn has_active_challenge(&self, profile_id: Uuid) -> Result<bool> {
        Ok(self.lock()?.is_busy(profile_id))
    }
}
