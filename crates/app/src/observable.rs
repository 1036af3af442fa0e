//! Observable values backed by a tokio [`watch`] channel.
//!
//! Every store field the presentation layer can see is an [`Observable`].
//! A mutation replaces (or edits in place) the whole value in a single send,
//! so a subscriber never observes a half-applied update. Subscribing returns
//! a [`Subscription`]; dropping it (or calling
//! [`unsubscribe`](Subscription::unsubscribe)) releases the observer.

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A value holder that notifies all current subscribers on mutation.
///
/// Mutations succeed even when nobody is subscribed.
#[derive(Debug)]
pub struct Observable<T> {
    sender: watch::Sender<T>,
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    /// Edit the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.sender.send_modify(f);
    }

    /// Edit the value in place, notifying only when `f` returns `true`.
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.sender.send_if_modified(f)
    }

    /// Register a new observer.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription::new(self.sender.subscribe())
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone + Send + Sync + 'static + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// A registered observer of an [`Observable`].
///
/// Provides both point-in-time access and change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
#[derive(Debug)]
pub struct Subscription<T> {
    current: T,
    receiver: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    fn new(mut receiver: watch::Receiver<T>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The value seen at subscription time or at the last [`changed`](Self::changed).
    #[must_use]
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The latest published value, which may be newer than [`current`](Self::current).
    #[must_use]
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change and return the new value.
    ///
    /// Returns `None` once the owning store has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        let value = self.receiver.borrow_and_update().clone();
        self.current = value.clone();
        Some(value)
    }

    /// Wait until the published value satisfies `predicate`.
    ///
    /// Returns `None` if the owning store is dropped first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        let value = self
            .receiver
            .wait_for(|value| predicate(value))
            .await
            .ok()?
            .clone();
        self.current = value.clone();
        Some(value)
    }

    /// Convert into a `Stream`. The first item is the latest value.
    #[must_use]
    pub fn into_stream(self) -> WatchStream<T> {
        WatchStream::new(self.receiver)
    }

    /// Stop observing. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}
