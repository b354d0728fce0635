//! Shared utilities, configuration, and error handling for Taskogotchi
//!
//! This crate provides common functionality used across the Taskogotchi backend:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - State machine error types shared by domain crates

pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub use config::Config;
pub use db::RepositoryError;
pub use error::{Error, Result};
pub use state::StateError;
