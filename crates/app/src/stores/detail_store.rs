//! Detail store: one appliance, its derived display fields, and dispatch.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kitchenconnect_domain::action::ApplianceAction;
use kitchenconnect_domain::appliance::{Appliance, PowerState, Program};
use kitchenconnect_domain::error::KitchenError;
use kitchenconnect_domain::id::ApplianceId;

use crate::observable::{Observable, Subscription};
use crate::operations::Operations;
use crate::ports::RemoteService;
use crate::stores::ensure_identity;

/// Lifecycle stage of an [`ApplianceDetailStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailStatus {
    /// Nothing loaded yet.
    #[default]
    Idle,
    Loading,
    Ready,
    /// A dispatch is pending.
    Updating,
    /// The last operation failed. Any previously held appliance is kept.
    Errored,
}

impl fmt::Display for DetailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Updating => "updating",
            Self::Errored => "errored",
        })
    }
}

/// Appliance snapshot plus the fields a remote-control screen renders.
///
/// Always derived from a single [`Appliance`], so the fields never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplianceDetail {
    pub appliance: Appliance,
    pub state: PowerState,
    pub display_temperature: String,
    pub selected_program: Program,
    pub target_temperature: i32,
}

impl From<Appliance> for ApplianceDetail {
    fn from(appliance: Appliance) -> Self {
        Self {
            state: appliance.state(),
            display_temperature: appliance.display_temperature_with_unit(),
            selected_program: appliance.program(),
            target_temperature: appliance.target_temperature(),
            appliance,
        }
    }
}

/// Reactive holder of one appliance.
///
/// Every committed appliance comes from the transport; local transitions are
/// only offered as a [`preview`](Self::preview). At most one dispatch is in
/// flight at a time. Dropping the store cancels its outstanding operations;
/// [`shutdown`](Self::shutdown) additionally waits for them.
pub struct ApplianceDetailStore<R> {
    inner: Arc<Inner<R>>,
}

struct Inner<R> {
    remote: R,
    ops: Operations,
    detail: Observable<Option<ApplianceDetail>>,
    error: Observable<Option<KitchenError>>,
    status: Observable<DetailStatus>,
    dispatching: AtomicBool,
}

/// Admission ticket for the single in-flight dispatch.
struct DispatchPermit<'a>(&'a AtomicBool);

impl<'a> DispatchPermit<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DispatchPermit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: RemoteService + 'static> ApplianceDetailStore<R> {
    /// Create an empty store in [`DetailStatus::Idle`].
    pub fn new(remote: R) -> Self {
        Self::build(remote, None, DetailStatus::Idle)
    }

    /// Create a store that already holds `appliance` and is ready for dispatch.
    pub fn with_appliance(remote: R, appliance: Appliance) -> Self {
        Self::build(
            remote,
            Some(ApplianceDetail::from(appliance)),
            DetailStatus::Ready,
        )
    }

    fn build(remote: R, detail: Option<ApplianceDetail>, status: DetailStatus) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                ops: Operations::new(),
                detail: Observable::new(detail),
                error: Observable::new(None),
                status: Observable::new(status),
                dispatching: AtomicBool::new(false),
            }),
        }
    }

    /// The held detail, if any.
    pub fn detail(&self) -> Option<ApplianceDetail> {
        self.inner.detail.get()
    }

    /// The held appliance, if any.
    pub fn appliance(&self) -> Option<Appliance> {
        self.inner
            .detail
            .with(|detail| detail.as_ref().map(|d| d.appliance.clone()))
    }

    pub fn status(&self) -> DetailStatus {
        self.inner.status.get()
    }

    /// The last published error, until the next success or [`dismiss_error`](Self::dismiss_error).
    pub fn error(&self) -> Option<KitchenError> {
        self.inner.error.get()
    }

    /// Number of operations currently running against the transport.
    pub fn in_flight(&self) -> usize {
        self.inner.ops.in_flight()
    }

    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> Subscription<Option<ApplianceDetail>> {
        self.inner.detail.subscribe()
    }

    pub fn subscribe_status(&self) -> Subscription<DetailStatus> {
        self.inner.status.subscribe()
    }

    pub fn subscribe_error(&self) -> Subscription<Option<KitchenError>> {
        self.inner.error.subscribe()
    }

    /// What the held appliance would look like after `action`.
    ///
    /// Purely local; nothing is committed or published.
    pub fn preview(&self, action: ApplianceAction) -> Option<Appliance> {
        self.inner
            .detail
            .with(|detail| detail.as_ref().map(|d| d.appliance.apply_action(action)))
    }

    /// Clear the error channel once it has been shown.
    pub fn dismiss_error(&self) {
        self.inner.error.update_if(|error| error.take().is_some());
    }

    /// Fetch `id` and hold the result.
    ///
    /// # Errors
    ///
    /// Returns the transport failure (also published on the error channel),
    /// [`KitchenError::MalformedData`] if the response carries another id,
    /// or [`KitchenError::Cancelled`] if the store shuts down first.
    pub async fn load(&self, id: &ApplianceId) -> Result<Appliance, KitchenError> {
        self.inner.load(id).await
    }

    /// Submit `action` against the held appliance and hold the response.
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::OperationInProgress`] while another dispatch
    /// is pending, [`KitchenError::NoApplianceLoaded`] when nothing is held,
    /// the transport failure, or [`KitchenError::Cancelled`]. All but the
    /// last are also published on the error channel.
    pub async fn dispatch(&self, action: ApplianceAction) -> Result<Appliance, KitchenError> {
        self.inner.dispatch(action).await
    }

    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn turn_on(&self) -> Result<Appliance, KitchenError> {
        self.dispatch(ApplianceAction::TurnOn).await
    }

    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn turn_off(&self) -> Result<Appliance, KitchenError> {
        self.dispatch(ApplianceAction::TurnOff).await
    }

    /// Turn the appliance on when its label reads off, and off otherwise.
    ///
    /// # Errors
    ///
    /// [`KitchenError::NoApplianceLoaded`] when nothing is held, otherwise
    /// see [`dispatch`](Self::dispatch).
    pub async fn toggle_power(&self) -> Result<Appliance, KitchenError> {
        let action = self.inner.detail.with(|detail| {
            detail
                .as_ref()
                .map(|d| ApplianceAction::toggle_for(&d.appliance))
        });
        match action {
            Some(action) => self.dispatch(action).await,
            None => Err(self.inner.publish_error(KitchenError::NoApplianceLoaded)),
        }
    }

    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn change_program(&self, program: Program) -> Result<Appliance, KitchenError> {
        self.dispatch(ApplianceAction::ChangeProgram { program }).await
    }

    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn change_temperature(&self, temperature: i32) -> Result<Appliance, KitchenError> {
        self.dispatch(ApplianceAction::ChangeTemperature { temperature }).await
    }

    /// Dispatch in the background; the outcome is visible only through the
    /// observables. Returns `false` once the store is shutting down.
    pub fn spawn_dispatch(&self, action: ApplianceAction) -> bool {
        let inner = Arc::clone(&self.inner);
        self.inner
            .ops
            .spawn(async move {
                let _ = inner.dispatch(action).await;
            })
            .is_some()
    }

    /// Load in the background. Returns `false` once the store is shutting down.
    pub fn spawn_load(&self, id: ApplianceId) -> bool {
        let inner = Arc::clone(&self.inner);
        self.inner
            .ops
            .spawn(async move {
                let _ = inner.load(&id).await;
            })
            .is_some()
    }

    /// Cancel outstanding operations, wait for them, then release the store.
    ///
    /// Every subscription sees its stream end once this returns.
    pub async fn shutdown(self) {
        self.inner.ops.shutdown().await;
        tracing::debug!("detail store shut down");
    }
}

impl<R> Drop for ApplianceDetailStore<R> {
    fn drop(&mut self) {
        self.inner.ops.cancel();
    }
}

impl<R: RemoteService> Inner<R> {
    #[tracing::instrument(skip(self, id), fields(appliance_id = %id))]
    async fn load(&self, id: &ApplianceId) -> Result<Appliance, KitchenError> {
        let guard = self.ops.begin()?;
        self.set_load_status(DetailStatus::Loading);

        let result = guard
            .run(self.remote.fetch_appliance(id))
            .await
            .and_then(|appliance| ensure_identity(id, appliance));
        guard.ensure_active()?;

        match result {
            Ok(appliance) => {
                tracing::debug!(%appliance, "appliance loaded");
                self.commit(appliance.clone());
                self.set_load_status(DetailStatus::Ready);
                Ok(appliance)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// A pending dispatch owns the status until its response lands.
    fn set_load_status(&self, status: DetailStatus) {
        if self.dispatching.load(Ordering::Acquire) {
            self.status.set(DetailStatus::Updating);
        } else {
            self.status.set(status);
        }
    }

    #[tracing::instrument(skip(self))]
    async fn dispatch(&self, action: ApplianceAction) -> Result<Appliance, KitchenError> {
        let Some(_permit) = DispatchPermit::try_acquire(&self.dispatching) else {
            tracing::debug!("dispatch rejected, another one is pending");
            return Err(self.publish_error(KitchenError::OperationInProgress));
        };
        let Some(current) = self.appliance() else {
            return Err(self.publish_error(KitchenError::NoApplianceLoaded));
        };
        let guard = self.ops.begin()?;
        self.status.set(DetailStatus::Updating);

        let result = guard
            .run(self.remote.perform_action(action, &current))
            .await
            .and_then(|appliance| ensure_identity(current.id(), appliance));
        guard.ensure_active()?;

        match result {
            Ok(appliance) => {
                tracing::debug!(%appliance, "action applied");
                self.commit(appliance.clone());
                self.status.set(DetailStatus::Ready);
                Ok(appliance)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn appliance(&self) -> Option<Appliance> {
        self.detail
            .with(|detail| detail.as_ref().map(|d| d.appliance.clone()))
    }

    fn commit(&self, appliance: Appliance) {
        self.detail.set(Some(ApplianceDetail::from(appliance)));
        self.error.update_if(|error| error.take().is_some());
    }

    fn fail(&self, err: KitchenError) -> KitchenError {
        if err != KitchenError::Cancelled {
            self.status.set(DetailStatus::Errored);
        }
        self.publish_error(err)
    }

    /// Publish `err` unless it is a cancellation, and hand it back.
    fn publish_error(&self, err: KitchenError) -> KitchenError {
        if err != KitchenError::Cancelled {
            tracing::warn!(%err, "appliance operation failed");
            self.error.set(Some(err.clone()));
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitchenconnect_domain::appliance::{ApplianceState, TemperatureRepresentation};
    use std::future::Future;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn oven() -> Appliance {
        Appliance::builder()
            .id("12CFD")
            .name("My oven")
            .target_temperature(175)
            .program(Program::Grill)
            .target_duration(2220)
            .start_time(-1)
            .appliance_state(ApplianceState::ReadyToStart)
            .display_temperature(24)
            .build()
            .unwrap()
    }

    /// Backend that applies actions to its own copy, or fails on demand.
    #[derive(Default)]
    struct InMemoryRemote {
        appliances: Mutex<Vec<Appliance>>,
        reject_with: Mutex<Option<KitchenError>>,
        respond_as: Mutex<Option<Appliance>>,
    }

    impl InMemoryRemote {
        fn with(appliance: Appliance) -> Self {
            Self {
                appliances: Mutex::new(vec![appliance]),
                ..Self::default()
            }
        }

        fn reject_with(&self, err: KitchenError) {
            *self.reject_with.lock().unwrap() = Some(err);
        }
    }

    impl RemoteService for InMemoryRemote {
        fn fetch_appliance(
            &self,
            id: &ApplianceId,
        ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send {
            let result = if let Some(err) = self.reject_with.lock().unwrap().clone() {
                Err(err)
            } else if let Some(other) = self.respond_as.lock().unwrap().clone() {
                Ok(other)
            } else {
                self.appliances
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|a| a.id() == id)
                    .cloned()
                    .ok_or_else(|| KitchenError::unavailable(id.clone(), "no such file"))
            };
            async { result }
        }

        fn perform_action(
            &self,
            action: ApplianceAction,
            appliance: &Appliance,
        ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send {
            let result = if let Some(err) = self.reject_with.lock().unwrap().clone() {
                Err(err)
            } else if let Some(other) = self.respond_as.lock().unwrap().clone() {
                Ok(other)
            } else {
                Ok(appliance.apply_action(action))
            };
            async { result }
        }
    }

    /// Backend whose actions block until the test releases them. Fetches
    /// answer immediately.
    #[derive(Default)]
    struct GatedRemote {
        entered: Notify,
        release: Notify,
    }

    impl RemoteService for GatedRemote {
        fn fetch_appliance(
            &self,
            id: &ApplianceId,
        ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send {
            let result = if id.as_str() == "12CFD" {
                Ok(oven())
            } else {
                Err(KitchenError::unavailable(id.clone(), "gated"))
            };
            async { result }
        }

        fn perform_action(
            &self,
            action: ApplianceAction,
            appliance: &Appliance,
        ) -> impl Future<Output = Result<Appliance, KitchenError>> + Send {
            let next = appliance.apply_action(action);
            async move {
                self.entered.notify_one();
                self.release.notified().await;
                Ok(next)
            }
        }
    }

    #[tokio::test]
    async fn should_hold_appliance_when_load_succeeds() {
        let store = ApplianceDetailStore::new(InMemoryRemote::with(oven()));
        assert_eq!(store.status(), DetailStatus::Idle);

        let loaded = store.load(&ApplianceId::from("12CFD")).await.unwrap();

        assert_eq!(loaded, oven());
        let detail = store.detail().unwrap();
        assert_eq!(detail.state, PowerState::Off);
        assert_eq!(detail.display_temperature, "24\u{2103}");
        assert_eq!(detail.selected_program, Program::Grill);
        assert_eq!(detail.target_temperature, 175);
        assert_eq!(store.status(), DetailStatus::Ready);
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn should_publish_error_when_load_fails() {
        let store = ApplianceDetailStore::new(InMemoryRemote::default());
        let mut errors = store.subscribe_error();

        let err = store.load(&ApplianceId::from("missing")).await.unwrap_err();

        assert!(matches!(err, KitchenError::SourceUnavailable { .. }));
        assert_eq!(errors.changed().await, Some(Some(err)));
        assert_eq!(store.status(), DetailStatus::Errored);
        assert_eq!(store.detail(), None);
    }

    #[tokio::test]
    async fn should_keep_appliance_when_reload_fails() {
        let remote = Arc::new(InMemoryRemote::with(oven()));
        let store = ApplianceDetailStore::new(Arc::clone(&remote));
        store.load(&ApplianceId::from("12CFD")).await.unwrap();

        remote.reject_with(KitchenError::malformed("truncated document"));
        let result = store.load(&ApplianceId::from("12CFD")).await;

        assert!(result.is_err());
        assert_eq!(store.appliance(), Some(oven()));
        assert_eq!(store.status(), DetailStatus::Errored);
    }

    #[tokio::test]
    async fn should_reject_load_when_response_has_other_id() {
        let remote = InMemoryRemote::with(oven());
        let stranger = Appliance::builder()
            .id("99XYZ")
            .name("Other oven")
            .build()
            .unwrap();
        *remote.respond_as.lock().unwrap() = Some(stranger);
        let store = ApplianceDetailStore::new(remote);

        let err = store.load(&ApplianceId::from("12CFD")).await.unwrap_err();

        assert!(matches!(err, KitchenError::MalformedData { .. }));
        assert_eq!(store.detail(), None);
    }

    #[tokio::test]
    async fn should_replace_appliance_with_response_when_dispatch_succeeds() {
        let store = ApplianceDetailStore::with_appliance(InMemoryRemote::with(oven()), oven());
        let mut sub = store.subscribe();

        let next = store.change_program(Program::Bake).await.unwrap();

        assert_eq!(next.program(), Program::Bake);
        assert_eq!(next.appliance_state(), ApplianceState::ReadyToStart);
        let detail = sub.changed().await.flatten().unwrap();
        assert_eq!(detail.appliance, next);
        assert_eq!(detail.selected_program, Program::Bake);
    }

    #[tokio::test]
    async fn should_flip_only_state_when_turning_on_and_off() {
        let store = ApplianceDetailStore::with_appliance(InMemoryRemote::with(oven()), oven());

        let on = store.turn_on().await.unwrap();
        assert_eq!(on.appliance_state(), ApplianceState::Running);
        assert_eq!(store.detail().unwrap().state, PowerState::On);
        assert_eq!(on.program(), oven().program());
        assert_eq!(on.target_temperature(), oven().target_temperature());

        let off = store.toggle_power().await.unwrap();
        assert_eq!(off, oven());
        assert_eq!(store.detail().unwrap().state, PowerState::Off);
    }

    #[tokio::test]
    async fn should_keep_appliance_when_dispatch_is_rejected() {
        let remote = Arc::new(InMemoryRemote::with(oven()));
        let store = ApplianceDetailStore::with_appliance(Arc::clone(&remote), oven());
        let rejection = KitchenError::UpdateRejected {
            action: ApplianceAction::ChangeTemperature { temperature: 900 },
            reason: "above maximum".to_string(),
        };
        remote.reject_with(rejection.clone());

        let err = store.change_temperature(900).await.unwrap_err();

        assert_eq!(err, rejection);
        assert_eq!(store.appliance(), Some(oven()));
        assert_eq!(store.error(), Some(rejection));
        assert_eq!(store.status(), DetailStatus::Errored);
    }

    #[tokio::test]
    async fn should_clear_error_when_next_dispatch_succeeds() {
        let remote = Arc::new(InMemoryRemote::with(oven()));
        let store = ApplianceDetailStore::with_appliance(Arc::clone(&remote), oven());
        remote.reject_with(KitchenError::malformed("garbage"));
        store.turn_on().await.unwrap_err();

        *remote.reject_with.lock().unwrap() = None;
        store.turn_on().await.unwrap();

        assert_eq!(store.error(), None);
        assert_eq!(store.status(), DetailStatus::Ready);
    }

    #[tokio::test]
    async fn should_fail_dispatch_when_nothing_loaded() {
        let store = ApplianceDetailStore::new(InMemoryRemote::with(oven()));

        let err = store.turn_on().await.unwrap_err();

        assert_eq!(err, KitchenError::NoApplianceLoaded);
        assert_eq!(store.error(), Some(KitchenError::NoApplianceLoaded));
        assert_eq!(store.detail(), None);
        assert!(!store.is_dispatching());
    }

    #[tokio::test]
    async fn should_reject_second_dispatch_when_one_is_pending() {
        let remote = Arc::new(GatedRemote::default());
        let store = ApplianceDetailStore::with_appliance(Arc::clone(&remote), oven());
        let mut sub = store.subscribe();

        assert!(store.spawn_dispatch(ApplianceAction::TurnOn));
        remote.entered.notified().await;
        assert!(store.is_dispatching());
        assert_eq!(store.status(), DetailStatus::Updating);

        let err = store.turn_off().await.unwrap_err();
        assert_eq!(err, KitchenError::OperationInProgress);
        assert_eq!(store.appliance(), Some(oven()));

        remote.release.notify_one();
        let detail = sub
            .wait_for(|d| d.as_ref().is_some_and(|d| d.state == PowerState::On))
            .await
            .flatten()
            .unwrap();
        assert_eq!(detail.appliance.appliance_state(), ApplianceState::Running);
    }

    #[tokio::test]
    async fn should_cancel_pending_dispatch_when_shut_down() {
        let remote = Arc::new(GatedRemote::default());
        let store = ApplianceDetailStore::with_appliance(Arc::clone(&remote), oven());
        let mut detail = store.subscribe();
        let mut errors = store.subscribe_error();

        assert!(store.spawn_dispatch(ApplianceAction::TurnOn));
        remote.entered.notified().await;
        assert_eq!(store.in_flight(), 1);

        store.shutdown().await;

        assert_eq!(detail.changed().await, None);
        assert_eq!(errors.changed().await, None);
        assert_eq!(
            detail.current().as_ref().map(|d| d.appliance.clone()),
            Some(oven())
        );
    }

    #[tokio::test]
    async fn should_stay_updating_when_load_completes_during_dispatch() {
        let remote = Arc::new(GatedRemote::default());
        let store = ApplianceDetailStore::with_appliance(Arc::clone(&remote), oven());
        let mut status = store.subscribe_status();

        assert!(store.spawn_dispatch(ApplianceAction::TurnOn));
        remote.entered.notified().await;
        store.load(&ApplianceId::from("12CFD")).await.unwrap();

        assert!(store.is_dispatching());
        assert_eq!(store.status(), DetailStatus::Updating);

        remote.release.notify_one();
        let settled = status
            .wait_for(|s| *s == DetailStatus::Ready)
            .await
            .unwrap();
        assert_eq!(settled, DetailStatus::Ready);
        assert_eq!(store.detail().unwrap().state, PowerState::On);
    }

    #[tokio::test]
    async fn should_end_subscriptions_when_dropped_with_pending_dispatch() {
        let remote = Arc::new(GatedRemote::default());
        let store = ApplianceDetailStore::with_appliance(Arc::clone(&remote), oven());
        let mut status = store.subscribe_status();

        store.spawn_dispatch(ApplianceAction::TurnOn);
        remote.entered.notified().await;
        drop(store);

        let last = status.wait_for(|_| false).await;
        assert_eq!(last, None);
    }

    #[tokio::test]
    async fn should_preview_without_committing() {
        let store = ApplianceDetailStore::with_appliance(InMemoryRemote::with(oven()), oven());

        let preview = store.preview(ApplianceAction::TurnOn).unwrap();

        assert_eq!(preview.state(), PowerState::On);
        assert_eq!(store.appliance(), Some(oven()));
    }

    #[tokio::test]
    async fn should_clear_error_when_dismissed() {
        let store = ApplianceDetailStore::new(InMemoryRemote::default());
        store.turn_on().await.unwrap_err();

        store.dismiss_error();

        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn should_load_in_background() {
        let store = ApplianceDetailStore::new(InMemoryRemote::with(oven()));
        let mut sub = store.subscribe();

        assert!(store.spawn_load(ApplianceId::from("12CFD")));

        let detail = sub.changed().await.flatten().unwrap();
        assert_eq!(detail.appliance, oven());
    }

    #[test]
    fn should_derive_fahrenheit_display() {
        let appliance = Appliance::builder()
            .id("12CFD")
            .name("My oven")
            .temperature_representation(TemperatureRepresentation::Fahrenheit)
            .display_temperature(75)
            .build()
            .unwrap();

        let detail = ApplianceDetail::from(appliance);

        assert_eq!(detail.display_temperature, "75\u{2109}");
    }
}
