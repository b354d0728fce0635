//! Player registration and taskogotchi management

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::{
    Player, PlayerProfile, ProfileDetails, Project, Taskogotchi, TaskogotchiUpdate,
};
use crate::repository::ProfileStore;
use crate::service::{profile_not_found, validation_failed};
use taskogotchi_common::{Error, Result};

/// Identity of a player as reported by the issue tracker
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RegisterPlayerRequest {
    #[validate(length(min = 1, max = 128))]
    pub account_id: String,
    #[validate(length(max = 200))]
    pub player_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub project_id: String,
    #[validate(length(max = 200))]
    pub project_name: Option<String>,
}

/// Initial state of a new taskogotchi
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct NewTaskogotchi {
    pub image: Option<serde_json::Value>,
    #[validate(range(min = 0))]
    pub health: Option<i32>,
    #[validate(range(min = 0))]
    pub strength: Option<i32>,
}

/// Registers players and manages their taskogotchis
#[derive(Clone)]
pub struct RegistrationService {
    profiles: Arc<dyn ProfileStore>,
}

impl RegistrationService {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Record the player and project and make sure the pairing profile exists.
    ///
    /// Names and email are refreshed on every call; ids never change.
    pub async fn register_player(&self, request: RegisterPlayerRequest) -> Result<ProfileDetails> {
        request.validate().map_err(validation_failed)?;

        let project = self
            .profiles
            .upsert_project(&Project::new(request.project_id, request.project_name)?)
            .await?;
        let player = self
            .profiles
            .upsert_player(&Player::new(
                request.account_id,
                request.player_name,
                request.email,
            )?)
            .await?;
        let profile = self
            .profiles
            .get_or_create_profile(&PlayerProfile::new(&player, &project))
            .await?;

        tracing::info!(
            profile_id = %profile.id,
            account_id = %player.account_id,
            project_id = %project.external_id,
            "Player registered"
        );

        Ok(ProfileDetails::from_parts(&profile, &player, &project))
    }

    async fn profile(&self, account_id: &str, project_id: &str) -> Result<ProfileDetails> {
        self.profiles
            .find_profile(account_id, project_id)
            .await?
            .ok_or_else(profile_not_found)
    }

    /// Hatch the profile's taskogotchi; a profile owns at most one
    pub async fn create_taskogotchi(
        &self,
        account_id: &str,
        project_id: &str,
        request: NewTaskogotchi,
    ) -> Result<Taskogotchi> {
        request.validate().map_err(validation_failed)?;
        let profile = self.profile(account_id, project_id).await?;

        if self.profiles.find_taskogotchi(profile.id).await?.is_some() {
            return Err(Error::Conflict("Taskogotchi already exists".to_string()));
        }

        let pet = Taskogotchi::new(profile.id, request.image, request.health, request.strength);
        let created = self.profiles.insert_taskogotchi(&pet).await?;

        tracing::info!(
            taskogotchi_id = %created.id,
            profile_id = %profile.id,
            "Taskogotchi created"
        );
        Ok(created)
    }

    pub async fn get_taskogotchi(&self, account_id: &str, project_id: &str) -> Result<Taskogotchi> {
        let profile = self.profile(account_id, project_id).await?;
        self.profiles
            .find_taskogotchi(profile.id)
            .await?
            .ok_or_else(|| Error::NotFound("Taskogotchi not found".to_string()))
    }

    /// Change image or stats and refresh `last_updated`
    pub async fn update_taskogotchi(
        &self,
        account_id: &str,
        project_id: &str,
        update: TaskogotchiUpdate,
    ) -> Result<Taskogotchi> {
        update.validate().map_err(validation_failed)?;

        let mut pet = self.get_taskogotchi(account_id, project_id).await?;
        pet.apply_update(update);
        let saved = self.profiles.update_taskogotchi(&pet).await?;

        tracing::debug!(taskogotchi_id = %saved.id, "Taskogotchi updated");
        Ok(saved)
    }
}
