//! # kitchenconnect-adapter-virtual
//!
//! Simulated appliance backend implementing the
//! [`RemoteService`](kitchenconnect_app::ports::RemoteService) port.
//!
//! The backend keeps its own authoritative copy of every appliance. Actions
//! are applied to that copy and the result is returned as a full snapshot, so
//! stores see the same behaviour they would against a real remote.
//!
//! ## Seeding
//!
//! | Source | Constructor |
//! |--------|-------------|
//! | Embedded demo oven (`12CFD`) | [`VirtualKitchen::with_default_oven`] |
//! | Directory of `<id>.json` documents, read on first fetch | [`VirtualKitchen::from_dir`] |
//! | Explicit snapshots | [`VirtualKitchen::from_appliances`] |
//!
//! ## Dependency rule
//!
//! Depends on `kitchenconnect-app` (port trait) and `kitchenconnect-domain` only.

pub mod bundle;

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indexmap::IndexMap;

use kitchenconnect_app::ports::RemoteService;
use kitchenconnect_domain::action::ApplianceAction;
use kitchenconnect_domain::appliance::Appliance;
use kitchenconnect_domain::error::KitchenError;
use kitchenconnect_domain::id::ApplianceId;

/// Inclusive range of accepted target temperatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureLimits {
    min: i32,
    max: i32,
}

impl TemperatureLimits {
    /// Returns `None` when `min > max`.
    #[must_use]
    pub fn new(min: i32, max: i32) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    #[must_use]
    pub fn contains(&self, temperature: i32) -> bool {
        (self.min..=self.max).contains(&temperature)
    }
}

impl fmt::Display for TemperatureLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// In-process backend-of-record for appliance snapshots.
#[derive(Debug, Default)]
pub struct VirtualKitchen {
    appliances: Mutex<IndexMap<ApplianceId, Appliance>>,
    bundle_dir: Option<PathBuf>,
    limits: Option<TemperatureLimits>,
    latency: Duration,
}

impl VirtualKitchen {
    /// An empty backend: every fetch reports the source as unavailable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend holding the embedded demo oven.
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::MalformedData`] if the embedded document is invalid.
    pub fn with_default_oven() -> Result<Self, KitchenError> {
        let oven = bundle::decode_appliance(bundle::DEFAULT_OVEN)?;
        Ok(Self::from_appliances([oven]))
    }

    /// A backend that resolves unknown identifiers from `<dir>/<id>.json`.
    ///
    /// A missing directory is not an error here; fetches report it as
    /// [`KitchenError::SourceUnavailable`].
    #[must_use]
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_appliances(appliances: impl IntoIterator<Item = Appliance>) -> Self {
        Self {
            appliances: Mutex::new(
                appliances
                    .into_iter()
                    .map(|appliance| (appliance.id().clone(), appliance))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Reject [`ApplianceAction::ChangeTemperature`] outside `limits`.
    #[must_use]
    pub fn with_limits(mut self, limits: TemperatureLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Delay every response by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Add or replace an appliance, as if it changed on the backend side.
    pub fn insert(&self, appliance: Appliance) {
        self.lock().insert(appliance.id().clone(), appliance);
    }

    /// The backend's current copy of `id`, if it has been seeded or fetched.
    #[must_use]
    pub fn snapshot(&self, id: &ApplianceId) -> Option<Appliance> {
        self.lock().get(id).cloned()
    }

    /// Identifiers currently held in memory.
    #[must_use]
    pub fn ids(&self) -> Vec<ApplianceId> {
        self.lock().keys().cloned().collect()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    async fn resolve(&self, id: &ApplianceId) -> Result<Appliance, KitchenError> {
        if let Some(appliance) = self.snapshot(id) {
            return Ok(appliance);
        }
        let Some(dir) = &self.bundle_dir else {
            return Err(KitchenError::unavailable(id.clone(), "unknown appliance"));
        };
        let appliance = bundle::read_appliance(dir, id).await?;
        tracing::debug!(appliance_id = %id, "appliance read from bundle");
        // a concurrent action may have stored a newer copy meanwhile
        Ok(self
            .lock()
            .entry(id.clone())
            .or_insert(appliance)
            .clone())
    }

    fn check_limits(&self, action: ApplianceAction) -> Result<(), KitchenError> {
        match (action, self.limits) {
            (ApplianceAction::ChangeTemperature { temperature }, Some(limits))
                if !limits.contains(temperature) =>
            {
                Err(KitchenError::UpdateRejected {
                    action,
                    reason: format!("{temperature} is outside {limits}"),
                })
            }
            _ => Ok(()),
        }
    }

    async fn apply(
        &self,
        action: ApplianceAction,
        submitted: &Appliance,
    ) -> Result<Appliance, KitchenError> {
        submitted.validate()?;
        self.check_limits(action)?;
        let current = self.resolve(submitted.id()).await?;
        let next = current.apply_action(action);
        self.insert(next.clone());
        tracing::debug!(appliance_id = %next.id(), %action, "virtual action applied");
        Ok(next)
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<ApplianceId, Appliance>> {
        self.appliances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteService for VirtualKitchen {
    fn fetch_appliance(
        &self,
        id: &ApplianceId,
    ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send {
        async move {
            self.simulate_latency().await;
            self.resolve(id).await
        }
    }

    fn perform_action(
        &self,
        action: ApplianceAction,
        appliance: &Appliance,
    ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send {
        async move {
            self.simulate_latency().await;
            self.apply(action, appliance).await
        }
    }
}
