//! Validated primitive types shared across the study workspace.

/// Maximum length, in bytes, of an [`Identifier`].
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Errors that can occur when creating an [`Identifier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The input was empty or contained only whitespace
    #[error("identifier cannot be empty")]
    Empty,
    /// The trimmed input is longer than [`MAX_IDENTIFIER_LEN`]
    #[error("identifier exceeds maximum length of {} characters", MAX_IDENTIFIER_LEN)]
    TooLong,
    /// The input contains characters outside the allowed set
    #[error("identifier '{0}' contains invalid characters (only alphanumeric, '.', '-', '_' allowed)")]
    InvalidCharacters(String),
}

/// An id for a protocol, module, question or condition.
///
/// Identifiers are addressable targets of conditional jumps and are also embedded in file
/// names by the file-backed stores, so the character set is deliberately narrow:
/// ASCII alphanumerics plus `.`, `-` and `_`.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Creates a new `Identifier` from the given input.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] if the trimmed input is empty, too long, or contains
    /// characters outside the allowed set.
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        if trimmed.len() > MAX_IDENTIFIER_LEN {
            return Err(IdentifierError::TooLong);
        }

        let ok = trimmed
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));
        if !ok {
            return Err(IdentifierError::InvalidCharacters(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::new(s)
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl serde::Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Identifier::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_generated_style_ids() {
        assert!(Identifier::new("m1").is_ok());
        assert!(Identifier::new("lq2x9k4f8a").is_ok());
        assert!(Identifier::new("follow-up_v2.1").is_ok());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = Identifier::new("  intake \n").expect("should trim");
        assert_eq!(id.as_str(), "intake");
    }

    #[test]
    fn rejects_empty_and_whitespace_only() {
        assert_eq!(Identifier::new(""), Err(IdentifierError::Empty));
        assert_eq!(Identifier::new("   "), Err(IdentifierError::Empty));
    }

    #[test]
    fn rejects_too_long() {
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert_eq!(Identifier::new(&long), Err(IdentifierError::TooLong));
        assert!(Identifier::new("a".repeat(MAX_IDENTIFIER_LEN)).is_ok());
    }

    #[test]
    fn rejects_path_separators_and_spaces() {
        for bad in ["../etc", "a/b", "a b", "q@1", "quéstion"] {
            let err = Identifier::new(bad).expect_err("should reject");
            assert!(matches!(err, IdentifierError::InvalidCharacters(_)), "{bad}");
        }
    }

    #[test]
    fn deserialisation_runs_validation() {
        let id: Identifier = serde_json::from_str("\"q1\"").expect("valid id");
        assert_eq!(id, "q1");

        let err = serde_json::from_str::<Identifier>("\"bad id\"").expect_err("invalid id");
        assert!(err.to_string().contains("invalid characters"));
    }
}
