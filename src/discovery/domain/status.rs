//! Per-endpoint query status.

use super::ParseQueryStateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of the query for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    /// The endpoint has never been seen.
    Unknown,
    /// The endpoint is claimed and its query is running.
    InProgress,
    /// The query finished and the plugin reported success.
    Successful,
    /// The query finished without success.
    Failed,
}

impl QueryState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::InProgress => "in_progress",
            Self::Successful => "successful",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for states that never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Successful | Self::Failed)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for QueryState {
    type Error = ParseQueryStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "unknown" => Ok(Self::Unknown),
            "in_progress" => Ok(Self::InProgress),
            "successful" => Ok(Self::Successful),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseQueryStateError(value.to_owned())),
        }
    }
}

/// Timestamped query status for an endpoint, with an optional detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStatus {
    state: QueryState,
    recorded_at: DateTime<Utc>,
    detail: Option<String>,
}

impl QueryStatus {
    /// Creates a status without detail.
    #[must_use]
    pub const fn new(state: QueryState, recorded_at: DateTime<Utc>) -> Self {
        Self {
            state,
            recorded_at,
            detail: None,
        }
    }

    /// Creates an `unknown` status.
    #[must_use]
    pub const fn unknown(recorded_at: DateTime<Utc>) -> Self {
        Self::new(QueryState::Unknown, recorded_at)
    }

    /// Creates an `in_progress` status.
    #[must_use]
    pub const fn in_progress(recorded_at: DateTime<Utc>) -> Self {
        Self::new(QueryState::InProgress, recorded_at)
    }

    /// Creates a `successful` status.
    #[must_use]
    pub const fn successful(recorded_at: DateTime<Utc>) -> Self {
        Self::new(QueryState::Successful, recorded_at)
    }

    /// Creates a `failed` status with a diagnostic detail.
    #[must_use]
    pub fn failed(recorded_at: DateTime<Utc>, detail: impl Into<String>) -> Self {
        Self::new(QueryState::Failed, recorded_at).with_detail(detail)
    }

    /// Adds a human-readable detail. Blank details are ignored.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let normalized = detail.into().trim().to_owned();
        if !normalized.is_empty() {
            self.detail = Some(normalized);
        }
        self
    }

    /// Returns the query state.
    #[must_use]
    pub const fn state(&self) -> QueryState {
        self.state
    }

    /// Returns when the status was recorded.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Returns the optional detail.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns `true` when the status is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Returns `true` when the query succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.state == QueryState::Successful
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({detail})", self.state),
            None => write!(f, "{}", self.state),
        }
    }
}
