//! Domain entities for the Taskogotchi fights domain
//!
//! Players and projects mirror identities from the external issue tracker; a
//! profile pairs one player with one project, owns one taskogotchi, and is the
//! unit of identity in fight challenges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use taskogotchi_common::{Error, Result};

use crate::domain::state::{FightAction, FightState, FightStateMachine, StateError};

/// Starting health of a new taskogotchi
pub const DEFAULT_HEALTH: i32 = 100;

/// Starting strength of a new taskogotchi
pub const DEFAULT_STRENGTH: i32 = 100;

/// Maximum length of a tracker account id
pub const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Maximum length of tracker project ids and display names
pub const MAX_NAME_LEN: usize = 200;

fn validate_external_id(kind: &str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() || value.len() > max_len {
        return Err(Error::Validation(format!(
            "{} must be 1-{} characters",
            kind, max_len
        )));
    }
    Ok(())
}

fn validate_display_name(kind: &str, name: Option<&str>) -> Result<()> {
    if let Some(name) = name {
        if name.len() > MAX_NAME_LEN {
            return Err(Error::Validation(format!(
                "{} must be at most {} characters",
                kind, MAX_NAME_LEN
            )));
        }
    }
    Ok(())
}

/// Player entity, identified by the tracker account id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: Uuid,
    pub account_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    /// Create a new player with validation
    pub fn new(account_id: String, name: Option<String>, email: Option<String>) -> Result<Self> {
        let now = Utc::now();
        let player = Player {
            id: Uuid::new_v4(),
            account_id,
            name,
            email,
            created_at: now,
            updated_at: now,
        };
        player.validate()?;
        Ok(player)
    }

    /// Validate invariants
    pub fn validate(&self) -> Result<()> {
        validate_external_id("Account id", &self.account_id, MAX_ACCOUNT_ID_LEN)?;
        validate_display_name("Player name", self.name.as_deref())?;

        if let Some(ref email) = self.email {
            if !email.validate_email() {
                return Err(Error::Validation("Invalid email format".to_string()));
            }
        }

        Ok(())
    }
}

/// Project entity, identified by the tracker project id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub external_id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with validation
    pub fn new(external_id: String, name: Option<String>) -> Result<Self> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            external_id,
            name,
            created_at: now,
            updated_at: now,
        };
        project.validate()?;
        Ok(project)
    }

    /// Validate invariants
    pub fn validate(&self) -> Result<()> {
        validate_external_id("Project id", &self.external_id, MAX_NAME_LEN)?;
        validate_display_name("Project name", self.name.as_deref())
    }
}

/// A player's identity within one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerProfile {
    pub id: Uuid,
    pub player_id: Uuid,
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PlayerProfile {
    pub fn new(player: &Player, project: &Project) -> Self {
        PlayerProfile {
            id: Uuid::new_v4(),
            player_id: player.id,
            project_id: project.id,
            created_at: Utc::now(),
        }
    }
}

/// Profile joined with its player and project, for responses and notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileDetails {
    pub id: Uuid,
    pub player_id: Uuid,
    pub project_id: Uuid,
    pub account_id: String,
    pub player_name: Option<String>,
    pub email: Option<String>,
    pub project_external_id: String,
    pub project_name: Option<String>,
}

impl ProfileDetails {
    pub fn from_parts(profile: &PlayerProfile, player: &Player, project: &Project) -> Self {
        ProfileDetails {
            id: profile.id,
            player_id: player.id,
            project_id: project.id,
            account_id: player.account_id.clone(),
            player_name: player.name.clone(),
            email: player.email.clone(),
            project_external_id: project.external_id.clone(),
            project_name: project.name.clone(),
        }
    }
}

/// Anything that identifies a fighting profile and its project
pub trait Combatant {
    fn profile_id(&self) -> Uuid;
    fn project_id(&self) -> Uuid;
}

impl Combatant for PlayerProfile {
    fn profile_id(&self) -> Uuid {
        self.id
    }

    fn project_id(&self) -> Uuid {
        self.project_id
    }
}

impl Combatant for ProfileDetails {
    fn profile_id(&self) -> Uuid {
        self.id
    }

    fn project_id(&self) -> Uuid {
        self.project_id
    }
}

/// The virtual pet owned by a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Taskogotchi {
    pub id: Uuid,
    pub profile_id: Uuid,
    /// Opaque visual composition, owned by the client
    pub image: Option<Json<serde_json::Value>>,
    pub health: i32,
    pub strength: i32,
    pub last_updated: DateTime<Utc>,
}

impl Taskogotchi {
    /// Create a new taskogotchi, defaulting health and strength
    pub fn new(
        profile_id: Uuid,
        image: Option<serde_json::Value>,
        health: Option<i32>,
        strength: Option<i32>,
    ) -> Self {
        Taskogotchi {
            id: Uuid::new_v4(),
            profile_id,
            image: image.map(Json),
            health: health.unwrap_or(DEFAULT_HEALTH),
            strength: strength.unwrap_or(DEFAULT_STRENGTH),
            last_updated: Utc::now(),
        }
    }

    /// Apply a partial update and refresh `last_updated`
    pub fn apply_update(&mut self, update: TaskogotchiUpdate) {
        if let Some(image) = update.image {
            self.image = Some(Json(image));
        }
        if let Some(health) = update.health {
            self.health = health;
        }
        if let Some(strength) = update.strength {
            self.strength = strength;
        }
        self.touch();
    }

    /// Mark the pet as modified now
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// A taskogotchi together with the profile that owns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePet {
    pub profile: ProfileDetails,
    pub taskogotchi: Taskogotchi,
}

/// Fields of a taskogotchi a client may change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct TaskogotchiUpdate {
    pub image: Option<serde_json::Value>,
    #[validate(range(min = 0))]
    pub health: Option<i32>,
    #[validate(range(min = 0))]
    pub strength: Option<i32>,
}

/// Fight challenge status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "fight_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FightStatus {
    #[default]
    WaitingAccept,
    Accepted,
    Pending,
    Completed,
    Canceled,
}

impl FightStatus {
    /// Check if status is terminal (challenge is over)
    pub fn is_terminal(&self) -> bool {
        self.to_state().is_terminal()
    }

    /// Convert to state machine state
    pub fn to_state(&self) -> FightState {
        match self {
            FightStatus::WaitingAccept => FightState::WaitingAccept,
            FightStatus::Accepted => FightState::Accepted,
            FightStatus::Pending => FightState::Pending,
            FightStatus::Completed => FightState::Completed,
            FightStatus::Canceled => FightState::Canceled,
        }
    }

    /// Create from state machine state
    pub fn from_state(state: FightState) -> Self {
        match state {
            FightState::WaitingAccept => FightStatus::WaitingAccept,
            FightState::Accepted => FightStatus::Accepted,
            FightState::Pending => FightStatus::Pending,
            FightState::Completed => FightStatus::Completed,
            FightState::Canceled => FightStatus::Canceled,
        }
    }

    /// Human readable status
    #[mutants::skip] // Display text only
    pub fn description(&self) -> &'static str {
        match self {
            FightStatus::WaitingAccept => "Waiting for accept",
            FightStatus::Accepted => "Accepted",
            FightStatus::Pending => "Pending",
            FightStatus::Completed => "Completed",
            FightStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for FightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_state())
    }
}

/// Fight challenge entity - a directed pairing of two profiles in one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FightChallenge {
    pub id: Uuid,
    pub project_id: Uuid,
    pub initiator_id: Uuid,
    pub initiator_health: i32,
    pub initiator_strength: i32,
    pub opponent_id: Uuid,
    pub opponent_health: i32,
    pub opponent_strength: i32,
    pub status: FightStatus,
    pub winner_id: Option<Uuid>,
    pub draw: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FightChallenge {
    /// Create a new challenge, snapshotting both pets' current stats
    pub fn new(
        initiator: &impl Combatant,
        initiator_pet: &Taskogotchi,
        opponent: &impl Combatant,
        opponent_pet: &Taskogotchi,
    ) -> Result<Self> {
        if initiator.profile_id() == opponent.profile_id() {
            return Err(Error::Validation(
                "You can't fight with yourself".to_string(),
            ));
        }

        if initiator.project_id() != opponent.project_id() {
            return Err(Error::Validation(
                "You can't fight with someone from another project".to_string(),
            ));
        }

        if initiator_pet.profile_id != initiator.profile_id()
            || opponent_pet.profile_id != opponent.profile_id()
        {
            return Err(Error::Validation(
                "Taskogotchi does not belong to the fighting profile".to_string(),
            ));
        }

        let now = Utc::now();
        let challenge = FightChallenge {
            id: Uuid::new_v4(),
            project_id: initiator.project_id(),
            initiator_id: initiator.profile_id(),
            initiator_health: initiator_pet.health,
            initiator_strength: initiator_pet.strength,
            opponent_id: opponent.profile_id(),
            opponent_health: opponent_pet.health,
            opponent_strength: opponent_pet.strength,
            status: FightStatus::default(),
            winner_id: None,
            draw: false,
            created_at: now,
            updated_at: now,
        };
        challenge.validate()?;
        Ok(challenge)
    }

    /// Check if challenge is terminal
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the profile is one of the two combatants
    pub fn involves(&self, profile_id: Uuid) -> bool {
        self.initiator_id == profile_id || self.opponent_id == profile_id
    }

    /// Opponent accepts the challenge
    pub fn accept(&mut self) -> Result<()> {
        self.apply(FightAction::Accept, None)
    }

    /// Fight begins
    pub fn start(&mut self) -> Result<()> {
        self.apply(FightAction::Start, None)
    }

    /// Fight ends with the given winner, or as a draw when `None`
    pub fn complete(&mut self, winner_id: Option<Uuid>) -> Result<()> {
        self.apply(FightAction::Complete, winner_id)
    }

    /// Either side walks away
    pub fn cancel(&mut self) -> Result<()> {
        self.apply(FightAction::Cancel, None)
    }

    /// Apply an action through the state machine.
    ///
    /// `winner_id` is only read by `Complete`. On error the challenge is left
    /// untouched.
    pub fn apply(&mut self, action: FightAction, winner_id: Option<Uuid>) -> Result<()> {
        let new_state = self.apply_transition(action)?;

        let mut updated = self.clone();
        updated.status = FightStatus::from_state(new_state);

        if action == FightAction::Complete {
            match winner_id {
                Some(winner) => {
                    if !self.involves(winner) {
                        return Err(Error::Validation(
                            "Winner must be either initiator or opponent".to_string(),
                        ));
                    }
                    updated.winner_id = Some(winner);
                    updated.draw = false;
                }
                None => {
                    updated.winner_id = None;
                    updated.draw = true;
                }
            }
        }

        updated.updated_at = Utc::now();
        updated.validate()?;

        *self = updated;
        Ok(())
    }

    /// Apply a state transition using the state machine
    fn apply_transition(&self, action: FightAction) -> Result<FightState> {
        let current_state = self.status.to_state();
        FightStateMachine::transition(current_state, action).map_err(|e| match e {
            StateError::InvalidTransition { from, event } => Error::Validation(format!(
                "Invalid fight transition: cannot apply '{}' action while '{}'",
                event, from
            )),
            StateError::TerminalState(state) => Error::Validation(format!(
                "Fight is in terminal state '{}' and cannot apply '{}' action",
                state, action
            )),
            StateError::UnsupportedAction(name) => {
                Error::Validation(format!("Unsupported action: {}", name))
            }
            StateError::GuardFailed(msg) => Error::Validation(msg),
        })
    }

    /// Check if a transition is valid without applying it
    pub fn can_transition(&self, action: FightAction) -> bool {
        FightStateMachine::can_transition(self.status.to_state(), action)
    }

    /// Validate invariants shared by every write path
    pub fn validate(&self) -> Result<()> {
        if self.initiator_id == self.opponent_id {
            return Err(Error::Validation(
                "You can't fight with yourself".to_string(),
            ));
        }

        let completed = self.status == FightStatus::Completed;
        let has_winner = self.winner_id.is_some();

        if completed && self.draw == has_winner {
            return Err(Error::Validation(
                "A completed fight must have exactly one of a winner or a draw".to_string(),
            ));
        }

        if !completed && (self.draw || has_winner) {
            return Err(Error::Validation(
                "Draw and winner must not be set until the fight is completed".to_string(),
            ));
        }

        if let Some(winner) = self.winner_id {
            if !self.involves(winner) {
                return Err(Error::Validation(
                    "Winner must be either initiator or opponent".to_string(),
                ));
            }
        }

        Ok(())
    }
}
