// ABOUTME: Application name shown in prompts, tag messages and hook environments.
// ABOUTME: Also the default directory under /var/www, so it must be one lowercase path segment.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid application name {name:?}: {reason}")]
pub struct AppNameError {
    pub name: String,
    pub reason: &'static str,
}

/// Lowercase letter first, then lowercase letters, digits, `-` or `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, AppNameError> {
        let reject = |reason| {
            Err(AppNameError {
                name: value.to_string(),
                reason,
            })
        };

        match value.chars().next() {
            None => return reject("must not be empty"),
            Some(c) if !c.is_ascii_lowercase() => {
                return reject("must start with a lowercase letter");
            }
            Some(_) => {}
        }
        if value.len() > MAX_LEN {
            return reject("longer than 64 characters");
        }
        let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_';
        if !value.chars().all(allowed) {
            return reject("only lowercase letters, digits, '-' and '_' are allowed");
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AppName {
    type Error = AppNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
