use thiserror::Error;

use crate::database::DatabaseError;

/// Outcome of a denied or failed access-core operation.
///
/// Every variant maps to exactly one HTTP status at the API boundary; see
/// `impl From<AccessError> for ApiError`.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    /// Absent or outside every scope the principal holds. The two cases are not distinguished.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("The owner's role cannot be changed")]
    CannotChangeOwner,

    #[error("The owner cannot be removed")]
    CannotRemoveOwner,

    #[error("The owner role cannot be granted")]
    CannotGrantOwner,

    #[error("You cannot remove yourself")]
    CannotRemoveSelf,

    #[error("Plan limit reached: {current} of {limit} seats in use")]
    PlanLimitExceeded { limit: i64, current: i64 },

    #[error("An invite for this email is already pending")]
    DuplicateInvite,

    #[error("This user already has access")]
    AlreadyHasAccess,

    #[error("A team with this name already exists")]
    DuplicateTeamName,

    #[error("Team still has {count} member(s); reassign them first")]
    TeamHasMembers { count: i64 },

    /// One half of an assignment was written and the other was not.
    #[error("Assignment partially applied (assignment saved: {assignment_saved}, audit saved: {audit_saved})")]
    AssignmentIncomplete { assignment_saved: bool, audit_saved: bool },

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl AccessError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        AccessError::Forbidden(message.into())
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AccessError::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type AccessResult<T> = Result<T, AccessError>;
