//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for refresh bookkeeping.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Time elapsed since `at`, never negative.
///
/// A timestamp ahead of the clock (wall-clock adjustment) counts as fresh.
#[must_use]
pub fn age_of(at: Timestamp) -> TimeDelta {
    (now() - at).max(TimeDelta::zero())
}
