use crate::predicates::PredicateId;
use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum SearchError {
    #[error("invalid state: {0}")]
    InvalidState(InvalidState),
    #[error("predicate {0} does not exist")]
    NotFound(PredicateId),
    #[error("predicate {id} cannot be committed: {reason}")]
    Rejected { id: PredicateId, reason: RejectReason },
}

#[derive(Debug, PartialEq, Error)]
pub enum InvalidState {
    #[error("predicate {0} is still a draft")]
    DraftInProgress(PredicateId),
    #[error("'{0}' is not a filterable column")]
    UnknownField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("it is already complete")]
    AlreadyComplete,
    #[error("no operator was chosen")]
    MissingOperator,
    #[error("it has no values")]
    NoValues,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("snapshot serialization failed with {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to resolve '{field}': {reason}")]
pub struct ResolutionError {
    pub field: String,
    pub reason: String,
}

impl ResolutionError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<InvalidState> for SearchError {
    fn from(error: InvalidState) -> Self {
        Self::InvalidState(error)
    }
}
