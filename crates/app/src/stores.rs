//! Reactive stores: the state the presentation layer observes.
//!
//! Each store owns its observables and an [`Operations`](crate::operations::Operations)
//! tracker, receives its transport by constructor injection, and is the only
//! writer of its own state.

pub mod collection_store;
pub mod detail_store;

pub use collection_store::{ApplianceCollectionStore, ApplianceMap, LoadReport};
pub use detail_store::{ApplianceDetail, ApplianceDetailStore, DetailStatus};

use kitchenconnect_domain::appliance::Appliance;
use kitchenconnect_domain::error::KitchenError;
use kitchenconnect_domain::id::ApplianceId;

/// A response that names another appliance breaks identity and is malformed.
fn ensure_identity(
    expected: &ApplianceId,
    appliance: Appliance,
) -> Result<Appliance, KitchenError> {
    if appliance.id() == expected {
        Ok(appliance)
    } else {
        Err(KitchenError::malformed(format!(
            "expected appliance {expected}, received {}",
            appliance.id()
        )))
    }
}
