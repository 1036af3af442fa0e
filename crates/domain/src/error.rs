//! Common error types used across the workspace.
//!
//! Every fallible operation in the application core reports a
//! [`KitchenError`]. Its [`kind`](KitchenError::kind) is a closed
//! enumeration the presentation layer can branch on; its `Display`
//! implementation is the human-readable message.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::ApplianceAction;
use crate::id::ApplianceId;

/// Top-level error for appliance synchronization.
///
/// Errors are published to store observers, so the type is `Clone` and
/// carries messages rather than non-cloneable source errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KitchenError {
    /// The transport could not reach the resource backing an appliance.
    #[error("appliance {id} is unavailable: {reason}")]
    SourceUnavailable { id: ApplianceId, reason: String },

    /// A response did not decode to a valid appliance snapshot.
    #[error("malformed appliance data: {reason}")]
    MalformedData { reason: String },

    /// The backend declined a dispatched action.
    #[error("update rejected ({action}): {reason}")]
    UpdateRejected {
        action: ApplianceAction,
        reason: String,
    },

    /// An action was dispatched before any appliance was loaded.
    #[error("no appliance loaded")]
    NoApplianceLoaded,

    /// Another action is still pending on the same store.
    #[error("another operation is already in progress")]
    OperationInProgress,

    /// The owning store was shut down before the operation completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl KitchenError {
    /// The closed category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Self::MalformedData { .. } => ErrorKind::MalformedData,
            Self::UpdateRejected { .. } => ErrorKind::UpdateRejected,
            Self::NoApplianceLoaded => ErrorKind::NoApplianceLoaded,
            Self::OperationInProgress => ErrorKind::OperationInProgress,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Shorthand for [`KitchenError::MalformedData`] from any displayable cause.
    pub fn malformed(reason: impl fmt::Display) -> Self {
        Self::MalformedData {
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`KitchenError::SourceUnavailable`].
    pub fn unavailable(id: ApplianceId, reason: impl fmt::Display) -> Self {
        Self::SourceUnavailable {
            id,
            reason: reason.to_string(),
        }
    }
}

/// Closed set of error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceUnavailable,
    MalformedData,
    UpdateRejected,
    NoApplianceLoaded,
    OperationInProgress,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SourceUnavailable => "source_unavailable",
            Self::MalformedData => "malformed_data",
            Self::UpdateRejected => "update_rejected",
            Self::NoApplianceLoaded => "no_appliance_loaded",
            Self::OperationInProgress => "operation_in_progress",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Domain invariant violations detected while building or parsing values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("appliance id must not be empty")]
    EmptyId,

    #[error("appliance name must not be empty")]
    EmptyName,

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl From<ValidationError> for KitchenError {
    fn from(err: ValidationError) -> Self {
        Self::malformed(err)
    }
}
