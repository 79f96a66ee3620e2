//! Small pure helpers shared across crates

pub mod time;

/// Account keys are lowercased, trimmed emails everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email(" Bob@Example.com\n"), "bob@example.com");
    }
}
