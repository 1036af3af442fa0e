//! Remote port: the action protocol between the stores and a transport.
//!
//! A transport resolves appliance identifiers into full snapshots and
//! submits actions to the backend-of-record. It never returns deltas: every
//! success value is a complete [`Appliance`] that replaces whatever the
//! caller held before.

use std::future::Future;
use std::sync::Arc;

use kitchenconnect_domain::action::ApplianceAction;
use kitchenconnect_domain::appliance::Appliance;
use kitchenconnect_domain::error::KitchenError;
use kitchenconnect_domain::id::ApplianceId;

/// Backend-of-record for appliance state.
///
/// Implementations live in adapter crates (e.g. `adapter_virtual`). Stores
/// receive one through their constructor, so tests can substitute a double.
pub trait RemoteService: Send + Sync {
    /// Resolve the current full snapshot of one appliance.
    ///
    /// Fails with [`KitchenError::SourceUnavailable`] when the backing
    /// resource cannot be located, or [`KitchenError::MalformedData`] when
    /// its content is not a valid appliance.
    fn fetch_appliance(
        &self,
        id: &ApplianceId,
    ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send;

    /// Submit `action` against the most recently known `appliance` snapshot
    /// and return the authoritative resulting snapshot.
    ///
    /// Fails with [`KitchenError::UpdateRejected`] when the backend declines
    /// the transition, or [`KitchenError::MalformedData`].
    fn perform_action(
        &self,
        action: ApplianceAction,
        appliance: &Appliance,
    ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send;
}

impl<T: RemoteService> RemoteService for Arc<T> {
    fn fetch_appliance(
        &self,
        id: &ApplianceId,
    ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send {
        (**self).fetch_appliance(id)
    }

    fn perform_action(
        &self,
        action: ApplianceAction,
        appliance: &Appliance,
    ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send {
        (**self).perform_action(action, appliance)
    }
}
