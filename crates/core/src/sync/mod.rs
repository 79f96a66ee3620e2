//! Sync engine: backfill, delta and safety-window reconciliation

pub mod orchestrator;
pub mod paging;
pub mod ports;
pub mod report;
pub mod windows;

pub use orchestrator::SyncOrchestrator;
pub use paging::window_pages;
pub use report::{AccountSyncReport, CycleOutcome, SyncReport, SyncStrategy};
pub use windows::SyncSettings;
