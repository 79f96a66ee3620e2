//! Macro for implementing Display and FromStr for status enums
//!
//! Provider names, account statuses and attendee responses are all stored as
//! lowercase strings in SQLite. This macro keeps the conversion in one place.
//!
//! # Example
//!
//! ```rust
//! use unical_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Idle,
//!     Running,
//! }
//!
//! impl_domain_status_conversions!(Phase {
//!     Idle => "idle",
//!     Running => "running",
//! });
//! ```

/// Implements Display and FromStr traits for status enums
///
/// This macro generates:
/// - Display trait: converts enum variants to their string form
/// - FromStr trait: parses case-insensitive strings to enum variants
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Connected,
        Syncing,
    }

    impl_domain_status_conversions!(TestStatus {
        Connected => "connected",
        Syncing => "syncing",
    });

    #[test]
    fn test_display_conversion() {
        assert_eq!(TestStatus::Connected.to_string(), "connected");
        assert_eq!(TestStatus::Syncing.to_string(), "syncing");
    }

    #[test]
    fn test_fromstr_mixed_case() {
        assert_eq!(TestStatus::from_str("Connected").unwrap(), TestStatus::Connected);
        assert_eq!(TestStatus::from_str(" SYNCING ").unwrap(), TestStatus::Syncing);
    }

    #[test]
    fn test_fromstr_invalid() {
        let err = TestStatus::from_str("gone").unwrap_err();
        assert!(err.contains("TestStatus"));
    }
}
