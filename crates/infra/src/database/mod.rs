//! Database implementations

pub mod account_repository;
pub mod event_repository;
pub mod manager;
pub mod token_repository;

pub use account_repository::SqliteAccountRepository;
pub use event_repository::SqliteEventStore;
pub use manager::DbManager;
pub use token_repository::SqliteTokenStore;
