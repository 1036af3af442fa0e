//! # kitchenconnect-app
//!
//! Application layer: the transport **port** and the reactive stores built on it.
//!
//! ## Responsibilities
//! - Define the **port trait** that adapters implement (driven/outbound port):
//!   - `RemoteService`: fetch an appliance snapshot, perform an action
//! - Provide the **stores** the presentation layer observes:
//!   - `ApplianceDetailStore`: one appliance, derived display fields, single-flight dispatch
//!   - `ApplianceCollectionStore`: the ordered set of tracked appliances
//! - Provide **in-process infrastructure** that doesn't need IO:
//!   - `Observable` / `Subscription` over `tokio::sync::watch`
//!   - `Operations`: per-store cancellation and task tracking
//!
//! ## Dependency rule
//! Depends on `kitchenconnect-domain` only (plus `tokio` primitives).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod observable;
pub mod operations;
pub mod ports;
pub mod stores;
