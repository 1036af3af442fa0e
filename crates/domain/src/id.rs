//! Typed appliance identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Stable identifier of an [`Appliance`](crate::appliance::Appliance).
///
/// Identifiers are opaque strings assigned by the backend (e.g. `"12CFD"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplianceId(String);

impl ApplianceId {
    /// Wrap an existing identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ApplianceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ApplianceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for ApplianceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ApplianceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
