//! Participant name validation
//!
//! Participants pick their own display name when joining. Names are not
//! required to be unique: the same person may take the quiz several times
//! and every attempt is ranked on its own.
//!
//! By default any non-empty name is accepted. An admin may opt into
//! [`NamePolicy::Filtered`], which also caps the length and rejects
//! names `rustrict` flags as inappropriate.

use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::participant::MAX_NAME_LENGTH;

/// Errors that can occur during name validation
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
}

/// How strictly requested names are checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamePolicy {
    /// Any name that is not blank
    #[default]
    Open,
    /// Not blank, at most [`MAX_NAME_LENGTH`] characters, and not flagged
    /// as inappropriate
    Filtered,
}

/// Cleans and validates a requested participant name
///
/// # Errors
///
/// * `Error::Empty` - Name is empty after trimming whitespace
/// * `Error::TooLong` - Name exceeds 30 characters (filtered policy only)
/// * `Error::Sinful` - Name contains inappropriate content (filtered policy only)
pub fn validate(name: &str, policy: NamePolicy) -> Result<String, Error> {
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if policy == NamePolicy::Filtered {
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::TooLong);
        }
        if name.is_inappropriate() {
            return Err(Error::Sinful);
        }
    }
    Ok(name.to_owned())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_validate_trims() {
        assert_eq!(validate("  Ann  ", NamePolicy::Open), Ok("Ann".to_owned()));
        assert_eq!(
            validate("  Ann  ", NamePolicy::Filtered),
            Ok("Ann".to_owned())
        );
    }

    #[test]
    fn test_validate_empty() {
        for policy in [NamePolicy::Open, NamePolicy::Filtered] {
            assert_eq!(validate("", policy), Err(Error::Empty));
            assert_eq!(validate("   \t", policy), Err(Error::Empty));
        }
    }

    #[test]
    fn test_open_accepts_any_real_name() {
        for name in [
            "Dick Cheney",
            "Cummings",
            "Hoe Lin",
            "Anal Kumar",
            "Maria Fernanda Rodriguez-Gonzalez",
        ] {
            assert_eq!(validate(name, NamePolicy::Open), Ok(name.to_owned()));
        }
    }

    #[test]
    fn test_filtered_length() {
        assert_eq!(
            validate(&"a".repeat(30), NamePolicy::Filtered),
            Ok("a".repeat(30))
        );
        assert_eq!(
            validate(&"a".repeat(31), NamePolicy::Filtered),
            Err(Error::TooLong)
        );
        assert_eq!(
            validate(&"é".repeat(30), NamePolicy::Filtered),
            Ok("é".repeat(30))
        );
    }

    #[test]
    fn test_filtered_inappropriate() {
        assert_eq!(validate("fuck", NamePolicy::Filtered), Err(Error::Sinful));
        assert_eq!(validate("fuck", NamePolicy::Open), Ok("fuck".to_owned()));
    }
}
