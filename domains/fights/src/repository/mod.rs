//! Repository implementations for the Fights domain
//!
//! Services talk to storage through the [`ProfileStore`] and
//! [`ChallengeStore`] traits. [`FightsRepositories`] implements both on
//! PostgreSQL; [`memory::InMemoryStore`] implements both in process.

pub mod challenges;
pub mod memory;
pub mod players;
pub mod profiles;
pub mod projects;
pub mod taskogotchis;
pub mod transactions;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::entities::{
    FightChallenge, FightStatus, Player, PlayerProfile, ProfileDetails, ProfilePet, Project,
    Taskogotchi,
};
use taskogotchi_common::{Error, Result};

pub use challenges::FightChallengeRepository;
pub use memory::InMemoryStore;
pub use players::PlayerRepository;
pub use profiles::ProfileRepository;
pub use projects::ProjectRepository;
pub use taskogotchis::TaskogotchiRepository;

/// Conflict message when the requester already has an active challenge
pub const ALREADY_IN_FIGHT: &str = "You're already in fight.";

/// Conflict message when the opponent already has an active challenge
pub const OPPONENT_IN_FIGHT: &str = "Opponent is already in fight.";

/// Refuse a new challenge while either combatant is busy
pub(crate) fn ensure_idle(initiator_busy: bool, opponent_busy: bool) -> Result<()> {
    if initiator_busy {
        return Err(Error::Conflict(ALREADY_IN_FIGHT.to_string()));
    }
    if opponent_busy {
        return Err(Error::Conflict(OPPONENT_IN_FIGHT.to_string()));
    }
    Ok(())
}

/// Players, projects, profiles and their taskogotchis
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert or refresh a project keyed by its external id
    async fn upsert_project(&self, project: &Project) -> Result<Project>;

    /// Insert or refresh a player keyed by its account id
    async fn upsert_player(&self, player: &Player) -> Result<Player>;

    /// Return the stored (player, project) profile, creating it from `profile` if absent
    async fn get_or_create_profile(&self, profile: &PlayerProfile) -> Result<PlayerProfile>;

    async fn find_profile(
        &self,
        account_id: &str,
        project_external_id: &str,
    ) -> Result<Option<ProfileDetails>>;

    async fn find_profile_in_project(
        &self,
        account_id: &str,
        project_id: Uuid,
    ) -> Result<Option<ProfileDetails>>;

    async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<ProfileDetails>>;

    async fn find_taskogotchi(&self, profile_id: Uuid) -> Result<Option<Taskogotchi>>;

    /// Conflict if the profile already owns a taskogotchi
    async fn insert_taskogotchi(&self, pet: &Taskogotchi) -> Result<Taskogotchi>;

    async fn update_taskogotchi(&self, pet: &Taskogotchi) -> Result<Taskogotchi>;

    /// Every taskogotchi in the project except the one owned by `exclude_profile_id`
    async fn list_taskogotchis_in_project(
        &self,
        project_id: Uuid,
        exclude_profile_id: Uuid,
    ) -> Result<Vec<ProfilePet>>;
}

/// Fight challenge persistence
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Insert a new challenge.
    ///
    /// Fails with a conflict if either combatant's player already has an
    /// active challenge in any project; the check and the insert are one
    /// atomic unit.
    async fn insert_challenge(&self, challenge: &FightChallenge) -> Result<FightChallenge>;

    async fn find_challenge(&self, id: Uuid) -> Result<Option<FightChallenge>>;

    /// Persist status, winner and draw if the stored status is still `expected`
    async fn save_transition(
        &self,
        challenge: &FightChallenge,
        expected: FightStatus,
    ) -> Result<FightChallenge>;

    /// Non-terminal challenges involving any profile of the account
    async fn active_challenges_for_account(&self, account_id: &str)
        -> Result<Vec<FightChallenge>>;

    /// Whether the profile's player has an active challenge in any project
    async fn has_active_challenge(&self, profile_id: Uuid) -> Result<bool>;
}

/// Combined repository access for the Fights domain
#[derive(Clone)]
pub struct FightsRepositories {
    pool: PgPool,
    pub players: PlayerRepository,
    pub projects: ProjectRepository,
    pub profiles: ProfileRepository,
    pub taskogotchis: TaskogotchiRepository,
    pub challenges: FightChallengeRepository,
}

impl FightsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            players: PlayerRepository::new(pool.clone()),
            projects: ProjectRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            taskogotchis: TaskogotchiRepository::new(pool.clone()),
            challenges: FightChallengeRepository::new(pool.clone()),
            pool,
        }
    }

    /// Begin a new database transaction.
    pub async fn begin(&self) -> std::result::Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Get a reference to the underlying database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProfileStore for FightsRepositories {
    async fn upsert_project(&self, project: &Project) -> Result<Project> {
        self.projects.upsert(project).await
    }

    async fn upsert_player(&self, player: &Player) -> Result<Player> {
        self.players.upsert(player).await
    }

    async fn get_or_create_profile(&self, profile: &PlayerProfile) -> Result<PlayerProfile> {
        self.profiles.get_or_create(profile).await
    }

    async fn find_profile(
        &self,
        account_id: &str,
        project_external_id: &str,
    ) -> Result<Option<ProfileDetails>> {
        self.profiles.find_details(account_id, project_external_id).await
    }

    async fn find_profile_in_project(
        &self,
        account_id: &str,
        project_id: Uuid,
    ) -> Result<Option<ProfileDetails>> {
        self.profiles
            .find_details_in_project(account_id, project_id)
            .await
    }

    async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<ProfileDetails>> {
        self.profiles.find_details_by_id(id).await
    }

    async fn find_taskogotchi(&self, profile_id: Uuid) -> Result<Option<Taskogotchi>> {
        self.taskogotchis.find_by_profile(profile_id).await
    }

    async fn insert_taskogotchi(&self, pet: &Taskogotchi) -> Result<Taskogotchi> {
        self.taskogotchis.create(pet).await
    }

    async fn update_taskogotchi(&self, pet: &Taskogotchi) -> Result<Taskogotchi> {
        self.taskogotchis.update(pet).await
    }

    async fn list_taskogotchis_in_project(
        &self,
        project_id: Uuid,
        exclude_profile_id: Uuid,
    ) -> Result<Vec<ProfilePet>> {
        self.taskogotchis
            .list_in_project(project_id, exclude_profile_id)
            .await
    }
}

#[async_trait]
impl ChallengeStore for FightsRepositories {
    async fn insert_challenge(&self, challenge: &FightChallenge) -> Result<FightChallenge> {
        let mut tx = self.begin().await?;

        transactions::lock_players_tx(&mut tx, &[challenge.initiator_id, challenge.opponent_id])
            .await?;
        let initiator_busy =
            transactions::has_active_for_player_tx(&mut tx, challenge.initiator_id).await?;
        let opponent_busy =
            transactions::has_active_for_player_tx(&mut tx, challenge.opponent_id).await?;
        ensure_idle(initiator_busy, opponent_busy)?;

        let created = transactions::create_challenge_tx(&mut tx, challenge).await?;
        tx.commit().await?;

        tracing::debug!(challenge_id = %created.id, "Fight challenge inserted");
        Ok(created)
    }

    async fn find_challenge(&self, id: Uuid) -> Result<Option<FightChallenge>> {
        self.challenges.find(id).await
    }

    async fn save_transition(
        &self,
        challenge: &FightChallenge,
        expected: FightStatus,
    ) -> Result<FightChallenge> {
        let saved = self.challenges.save_transition(challenge, expected).await?;
        tracing::debug!(
            challenge_id = %saved.id,
            from = %expected,
            to = %saved.status,
            "Fight challenge transition saved"
        );
        Ok(saved)
    }

    async fn active_challenges_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<FightChallenge>> {
        self.challenges.list_active_for_account(account_id).await
    }

    async fn has_active_challenge(&self, profile_id: Uuid) -> Result<bool> {
        self.challenges.has_active_for_player(profile_id).await
    }
}
