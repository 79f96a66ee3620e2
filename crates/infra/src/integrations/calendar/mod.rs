//! Calendar provider integrations
//!
//! Event sources for:
//! - Google Calendar
//! - Microsoft Calendar (Outlook/365) through Microsoft Graph
//!
//! plus the access-token providers they authenticate with.

pub mod auth;
pub mod providers;

pub use auth::{AccessTokenProvider, OAuthClient, RefreshingTokenProvider, StaticTokenProvider};
pub use providers::{GoogleEventSource, MicrosoftEventSource};
