//! Results returned by query plugins.

use std::fmt;

/// How a plugin judged its query of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The endpoint answered and its descriptions were extracted.
    Successful,
    /// The query was attempted and failed.
    Failed(String),
    /// The plugin does not speak the endpoint's interface.
    WrongInterface,
}

impl QueryOutcome {
    /// Returns `true` for [`QueryOutcome::Successful`].
    #[must_use]
    pub const fn is_successful(&self) -> bool {
        matches!(self, Self::Successful)
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Successful => f.write_str("successful"),
            Self::Failed(detail) => write!(f, "failed: {detail}"),
            Self::WrongInterface => f.write_str("wrong interface"),
        }
    }
}

/// Outcome of one plugin call together with the descriptions it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse<T> {
    outcome: QueryOutcome,
    entities: Vec<T>,
}

impl<T> QueryResponse<T> {
    /// Creates a response from its parts.
    #[must_use]
    pub const fn new(outcome: QueryOutcome, entities: Vec<T>) -> Self {
        Self { outcome, entities }
    }

    /// Creates a successful response carrying `entities`.
    #[must_use]
    pub fn successful(entities: impl IntoIterator<Item = T>) -> Self {
        Self::new(QueryOutcome::Successful, entities.into_iter().collect())
    }

    /// Creates a failed response without entities.
    #[must_use]
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::new(QueryOutcome::Failed(detail.into()), Vec::new())
    }

    /// Creates a response declining the endpoint's interface.
    #[must_use]
    pub const fn wrong_interface() -> Self {
        Self::new(QueryOutcome::WrongInterface, Vec::new())
    }

    /// Returns the outcome.
    #[must_use]
    pub const fn outcome(&self) -> &QueryOutcome {
        &self.outcome
    }

    /// Returns the produced entities.
    #[must_use]
    pub fn entities(&self) -> &[T] {
        &self.entities
    }

    /// Splits the response into outcome and entities.
    #[must_use]
    pub fn into_parts(self) -> (QueryOutcome, Vec<T>) {
        (self.outcome, self.entities)
    }
}
