//! Fights domain: players, profiles, taskogotchis, fight challenges

pub mod domain;
pub mod repository;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::combat::{CombatOutcome, Fight, FightPlayer, FightTimer};
pub use domain::entities::*;
pub use domain::state::{FightAction, FightState, FightStateMachine, StateError};
// Re-export repository types
pub use repository::{
    ChallengeStore, FightChallengeRepository, FightsRepositories, InMemoryStore,
    PlayerRepository, ProfileRepository, ProfileStore, ProjectRepository, TaskogotchiRepository,
    ALREADY_IN_FIGHT, OPPONENT_IN_FIGHT,
};
// Re-export services
pub use service::{
    FightService, NewTaskogotchi, OpponentSummary, RegisterPlayerRequest, RegistrationService,
};
