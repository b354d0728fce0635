//! Application services for the Fights domain
//!
//! Services are the boundary a request layer calls into. They resolve
//! identities through the stores, run domain rules and persist the result.

pub mod fights;
pub mod registration;

use taskogotchi_common::Error;

pub use fights::{FightService, OpponentSummary};
pub use registration::{NewTaskogotchi, RegisterPlayerRequest, RegistrationService};

pub(crate) fn profile_not_found() -> Error {
    Error::NotFound("Player profile not found".to_string())
}

pub(crate) fn validation_failed(err: validator::ValidationErrors) -> Error {
    Error::Validation(format!("Validation failed: {}", err))
}
