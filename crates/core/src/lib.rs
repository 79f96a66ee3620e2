//! # UniCalendar Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for remote calendars and local stores
//! - The sync orchestrator and its per-account state machine
//! - The account service
//!
//! ## Architecture Principles
//! - Only depends on `unical-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod accounts;
pub mod calendar_ports;
pub mod sync;

pub use accounts::ports::AccountRepository;
pub use accounts::AccountService;
pub use calendar_ports::{DeltaPage, RemoteEventSource, SeedPage, WindowPage};
pub use sync::ports::{ChangeNotifier, EventStore, TokenStore};
pub use sync::{
    window_pages, AccountSyncReport, CycleOutcome, SyncOrchestrator, SyncReport, SyncSettings,
    SyncStrategy,
};
