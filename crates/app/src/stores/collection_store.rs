//! Collection store: the ordered set of tracked appliances.

use std::sync::Arc;

use chrono::TimeDelta;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use indexmap::IndexMap;

use kitchenconnect_domain::appliance::Appliance;
use kitchenconnect_domain::error::KitchenError;
use kitchenconnect_domain::id::ApplianceId;
use kitchenconnect_domain::time::{Timestamp, age_of, now};

use crate::observable::{Observable, Subscription};
use crate::operations::Operations;
use crate::ports::RemoteService;
use crate::stores::detail_store::ApplianceDetailStore;
use crate::stores::ensure_identity;

/// Snapshot of the collection, in first-seen order. Cheap to clone.
pub type ApplianceMap = Arc<IndexMap<ApplianceId, Appliance>>;

/// Outcome of one [`ApplianceCollectionStore::load_all`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Identifiers fetched successfully, in completion order.
    pub loaded: Vec<ApplianceId>,
    pub failures: Vec<KitchenError>,
}

impl LoadReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reactive holder of every tracked appliance.
///
/// The tracked identifiers are fixed at construction. Each fetch upserts
/// independently, so one failing appliance never hides the others.
pub struct ApplianceCollectionStore<R> {
    inner: Arc<Inner<R>>,
}

struct Inner<R> {
    remote: R,
    ops: Operations,
    tracked: Vec<ApplianceId>,
    appliances: Observable<ApplianceMap>,
    error: Observable<Option<KitchenError>>,
    last_refresh: Observable<Option<Timestamp>>,
}

impl<R: RemoteService + 'static> ApplianceCollectionStore<R> {
    pub fn new(remote: R, tracked: impl IntoIterator<Item = ApplianceId>) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                ops: Operations::new(),
                tracked: tracked.into_iter().collect(),
                appliances: Observable::default(),
                error: Observable::new(None),
                last_refresh: Observable::new(None),
            }),
        }
    }

    pub fn tracked_ids(&self) -> &[ApplianceId] {
        &self.inner.tracked
    }

    pub fn appliances(&self) -> ApplianceMap {
        self.inner.appliances.get()
    }

    pub fn appliance(&self, id: &ApplianceId) -> Option<Appliance> {
        self.inner.appliances.with(|map| map.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.inner.appliances.with(|map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent fetch failure, until dismissed.
    pub fn error(&self) -> Option<KitchenError> {
        self.inner.error.get()
    }

    /// When the last [`load_all`](Self::load_all) pass completed.
    pub fn last_refresh(&self) -> Option<Timestamp> {
        self.inner.last_refresh.get()
    }

    /// Time elapsed since the last completed refresh.
    pub fn data_age(&self) -> Option<TimeDelta> {
        self.last_refresh().map(age_of)
    }

    pub fn in_flight(&self) -> usize {
        self.inner.ops.in_flight()
    }

    pub fn subscribe(&self) -> Subscription<ApplianceMap> {
        self.inner.appliances.subscribe()
    }

    pub fn subscribe_error(&self) -> Subscription<Option<KitchenError>> {
        self.inner.error.subscribe()
    }

    pub fn subscribe_last_refresh(&self) -> Subscription<Option<Timestamp>> {
        self.inner.last_refresh.subscribe()
    }

    pub fn dismiss_error(&self) {
        self.inner.error.update_if(|error| error.take().is_some());
    }

    /// Fetch every tracked appliance concurrently.
    ///
    /// Each completion is upserted and published on its own; failures are
    /// recorded on the error channel and collected in the report.
    ///
    /// # Errors
    ///
    /// Only [`KitchenError::Cancelled`], when the store shuts down mid-pass.
    /// Results that completed before the cancellation stay published.
    pub async fn load_all(&self) -> Result<LoadReport, KitchenError> {
        self.inner.load_all().await
    }

    /// Run [`load_all`](Self::load_all) in the background. Returns `false`
    /// once the store is shutting down.
    pub fn spawn_load_all(&self) -> bool {
        let inner = Arc::clone(&self.inner);
        self.inner
            .ops
            .spawn(async move {
                let _ = inner.load_all().await;
            })
            .is_some()
    }

    /// Open a detail store over a loaded appliance, sharing this transport.
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::NoApplianceLoaded`] when `id` is not in the
    /// collection.
    pub fn detail_store(
        &self,
        id: &ApplianceId,
    ) -> Result<ApplianceDetailStore<R>, KitchenError>
    where
        R: Clone,
    {
        let appliance = self.appliance(id).ok_or(KitchenError::NoApplianceLoaded)?;
        Ok(ApplianceDetailStore::with_appliance(
            self.inner.remote.clone(),
            appliance,
        ))
    }

    /// Cancel outstanding fetches, wait for them, then release the store.
    pub async fn shutdown(self) {
        self.inner.ops.shutdown().await;
        tracing::debug!("collection store shut down");
    }
}

impl<R> Drop for ApplianceCollectionStore<R> {
    fn drop(&mut self) {
        self.inner.ops.cancel();
    }
}

impl<R: RemoteService> Inner<R> {
    #[tracing::instrument(skip(self), fields(tracked = self.tracked.len()))]
    async fn load_all(&self) -> Result<LoadReport, KitchenError> {
        let guard = self.ops.begin()?;
        let mut pending: FuturesUnordered<_> = self
            .tracked
            .iter()
            .map(|id| async move { (id, self.remote.fetch_appliance(id).await) })
            .collect();

        let mut report = LoadReport::default();
        loop {
            let next = guard
                .run(async { Ok::<_, KitchenError>(pending.next().await) })
                .await?;
            let Some((id, result)) = next else {
                break;
            };
            guard.ensure_active()?;

            match result.and_then(|appliance| ensure_identity(id, appliance)) {
                Ok(appliance) => {
                    tracing::debug!(%appliance, "appliance loaded");
                    self.upsert(appliance);
                    report.loaded.push(id.clone());
                }
                Err(err) => {
                    tracing::warn!(%err, appliance_id = %id, "failed to load appliance");
                    self.error.set(Some(err.clone()));
                    report.failures.push(err);
                }
            }
        }

        self.last_refresh.set(Some(now()));
        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            "appliance refresh complete"
        );
        Ok(report)
    }

    /// Insert or replace one entry. Returns `false`, without notifying, when
    /// the entry already holds an equal appliance.
    fn upsert(&self, appliance: Appliance) -> bool {
        self.appliances.update_if(|map| {
            if map.get(appliance.id()) == Some(&appliance) {
                return false;
            }
            Arc::make_mut(map).insert(appliance.id().clone(), appliance);
            true
        })
    }
}
