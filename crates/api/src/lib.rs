//! # UniCalendar App
//!
//! Application layer - context wiring, commands and the `unicald` entry point.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Commands for UI shells (event queries, account management, sync)
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
