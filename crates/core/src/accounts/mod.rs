//! Account lifecycle: connect, reconnect and cascading disconnect

pub mod ports;
pub mod service;

pub use service::AccountService;
