//! Fights domain layer: entities, state machine, combat rules

pub mod combat;
pub mod entities;
pub mod state;
