//! Domain types and models

pub mod account;
pub mod event;
pub mod signal;
pub mod window;

pub use account::{Account, AccountStatus, Provider};
pub use event::{Attendee, CalendarEvent, ResponseStatus, StoredEvent};
pub use signal::ChangeSignal;
pub use window::TimeWindow;
