// ABOUTME: Validated git branch name used to build release identifiers.
// ABOUTME: Restricted to characters that are safe inside a single directory name.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BranchNameError {
    #[error("branch name cannot be empty")]
    Empty,

    #[error("branch name cannot start with '{0}'")]
    InvalidStart(char),

    #[error("invalid character in branch name: '{0}'")]
    InvalidChar(char),
}

/// A branch name that can be embedded in a release directory name.
///
/// Slashes are rejected: `feature/x` would turn the release into a nested
/// directory and break release enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn new(value: &str) -> Result<Self, BranchNameError> {
        let trimmed = value.trim();
        let first = trimmed.chars().next().ok_or(BranchNameError::Empty)?;

        if first == '-' || first == '.' {
            return Err(BranchNameError::InvalidStart(first));
        }

        for c in trimmed.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(BranchNameError::InvalidChar(c));
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BranchName {
    type Err = BranchNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
