// ABOUTME: Timestamp-prefixed release identifiers and their generator.
// ABOUTME: Lexical order of identifiers equals the order in which they were generated.

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeDelta, Utc};
use parking_lot::Mutex;
use std::fmt;
use thiserror::Error;

use super::branch::{BranchName, BranchNameError};

/// `strftime` format of the identifier prefix: `YYYY-MM-DD_HH-MM-SS`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const TIMESTAMP_LEN: usize = 19;

#[derive(Debug, Error)]
pub enum ReleaseIdError {
    #[error("release identifier is missing the timestamp prefix: {0}")]
    MissingTimestamp(String),

    #[error("release identifier has an invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("release identifier has an invalid branch: {0}")]
    InvalidBranch(#[from] BranchNameError),
}

/// Identifier of one deploy attempt: `{UTC timestamp}_{branch}`.
///
/// Ordering is the ordering of the string, which is chronological because the
/// timestamp is fixed-width and comes first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseId {
    value: String,
    timestamp: NaiveDateTime,
}

impl ReleaseId {
    /// Build an identifier from a UTC timestamp (sub-second part dropped).
    pub fn new(timestamp: DateTime<Utc>, branch: &BranchName) -> Self {
        Self::from_naive(timestamp.naive_utc().trunc_subsecs(0), branch)
    }

    fn from_naive(timestamp: NaiveDateTime, branch: &BranchName) -> Self {
        Self {
            value: format!("{}_{}", timestamp.format(TIMESTAMP_FORMAT), branch),
            timestamp,
        }
    }

    /// Parse a release directory name.
    pub fn parse(value: &str) -> Result<Self, ReleaseIdError> {
        let value = value.trim();
        let (prefix, rest) = match (value.get(..TIMESTAMP_LEN), value.get(TIMESTAMP_LEN..)) {
            (Some(prefix), Some(rest)) => (prefix, rest),
            _ => return Err(ReleaseIdError::MissingTimestamp(value.to_string())),
        };

        let timestamp = NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT)
            .map_err(|_| ReleaseIdError::InvalidTimestamp(value.to_string()))?;

        let branch = rest
            .strip_prefix('_')
            .ok_or_else(|| ReleaseIdError::MissingTimestamp(value.to_string()))?;
        BranchName::new(branch)?;

        Ok(Self {
            value: value.to_string(),
            timestamp,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// The branch part of the identifier.
    pub fn branch(&self) -> &str {
        &self.value[TIMESTAMP_LEN + 1..]
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Hands out release identifiers with strictly increasing timestamps.
///
/// Two deploys started within the same second would otherwise produce
/// identifiers that sort by branch name rather than by generation order.
#[derive(Debug, Default)]
pub struct ReleaseIdGenerator {
    last: Mutex<Option<NaiveDateTime>>,
}

impl ReleaseIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next identifier for `branch`, stamped with the current time.
    pub fn next(&self, branch: &BranchName) -> ReleaseId {
        self.next_at(Utc::now(), branch)
    }

    /// Next identifier for `branch` at `now`. A timestamp at or before the
    /// previous one is bumped to one second after it.
    pub fn next_at(&self, now: DateTime<Utc>, branch: &BranchName) -> ReleaseId {
        let mut last = self.last.lock();
        let mut timestamp = now.naive_utc().trunc_subsecs(0);
        if let Some(previous) = *last
            && timestamp <= previous
        {
            timestamp = previous + TimeDelta::seconds(1);
        }
        *last = Some(timestamp);
        ReleaseId::from_naive(timestamp, branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn main() -> BranchName {
        BranchName::new("main").unwrap()
    }

    #[test]
    fn formats_timestamp_and_branch() {
        let at = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        let id = ReleaseId::new(at, &main());
        assert_eq!(id.as_str(), "2024-01-03_10-00-00_main");
        assert_eq!(id.branch(), "main");
    }

    #[test]
    fn parse_round_trips_directory_name() {
        let id = ReleaseId::parse("2024-01-02_10-00-00_feature-x").unwrap();
        assert_eq!(id.branch(), "feature-x");
        assert_eq!(id.timestamp().to_string(), "2024-01-02 10:00:00");
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert!(ReleaseId::parse("shared").is_err());
        assert!(ReleaseId::parse("2024-13-02_10-00-00_main").is_err());
        assert!(ReleaseId::parse("2024-01-02_10-00-00").is_err());
        assert!(ReleaseId::parse("2024-01-02_10-00-00_").is_err());
    }

    #[test]
    fn generator_bumps_same_second() {
        let generator = ReleaseIdGenerator::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();

        let first = generator.next_at(at, &BranchName::new("zeta").unwrap());
        let second = generator.next_at(at, &BranchName::new("alpha").unwrap());

        assert_eq!(first.as_str(), "2024-01-03_10-00-00_zeta");
        assert_eq!(second.as_str(), "2024-01-03_10-00-01_alpha");
        assert!(first < second);
    }

    #[test]
    fn generator_never_goes_backwards() {
        let generator = ReleaseIdGenerator::new();
        let later = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();

        let first = generator.next_at(later, &main());
        let second = generator.next_at(earlier, &main());
        assert!(first < second);
    }
}
