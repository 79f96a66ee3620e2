//! # UniCalendar Domain
//!
//! Business domain types and models for the calendar sync engine.
//!
//! This crate contains:
//! - Accounts, events, attendees, time windows and change signals
//! - Domain error type and Result definition
//! - Configuration structures
//! - Local-calendar time helpers
//!
//! ## Architecture
//! - No dependencies on other UniCalendar crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::normalize_email;
pub use utils::time::LocalZone;
