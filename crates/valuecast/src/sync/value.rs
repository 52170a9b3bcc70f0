#![forbid(unsafe_code)]

//! `Arc`/`Mutex` value dispatcher and its restricted view.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use parking_lot::ReentrantMutex;
use tracing::trace;

use super::subscription::Unsubscribe;
use crate::config::DispatcherConfig;
use crate::delivery::deliver;
use crate::error::DispatchError;
use crate::handlers::{Detach, HandlerList};

type SyncHandler<T> = Arc<dyn Fn(&T) + Send + Sync>;

// Handlers never run while the value or handler lock is held; poisoning can only
// follow a panic in `T::clone` or an `update` closure, and the data is still
// a valid `T`.
fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ValueCore<T> {
    value: Mutex<T>,
    handlers: Arc<Mutex<HandlerList<SyncHandler<T>>>>,
    // Held from a store or registration until its delivery has finished.
    // Reentrant: a handler may set the value again on the same thread.
    turn: ReentrantMutex<()>,
    config: DispatcherConfig,
}

impl<T: Clone + Send + 'static> ValueCore<T> {
    fn current(&self) -> T {
        lock(&self.value).clone()
    }

    fn subscribe(&self, handler: SyncHandler<T>, dispatch_immediately: bool) -> Unsubscribe {
        let _turn = self.turn.lock();
        let id = lock(&self.handlers).push(Arc::clone(&handler));
        trace!(dispatcher = self.config.label(), handler = ?id, "subscribed");
        let registry: Arc<dyn Detach + Send + Sync> = self.handlers.clone();
        let unsubscribe = Unsubscribe::new(Arc::downgrade(&registry), id);

        if dispatch_immediately {
            trace!(dispatcher = self.config.label(), "immediate dispatch");
            let value = self.current();
            handler(&value);
        }
        unsubscribe
    }

    fn broadcast(&self, value: &T) -> Result<(), DispatchError> {
        let snapshot = lock(&self.handlers).snapshot();
        deliver(&snapshot, value, &self.config)
    }

    fn set(&self, value: T) -> Result<(), DispatchError> {
        let _turn = self.turn.lock();
        let delivered = value.clone();
        let previous = std::mem::replace(&mut *lock(&self.value), value);
        drop(previous);
        self.broadcast(&delivered)
    }

    fn update(&self, f: impl FnOnce(&mut T)) -> Result<(), DispatchError> {
        let _turn = self.turn.lock();
        let delivered = {
            let mut value = lock(&self.value);
            f(&mut value);
            value.clone()
        };
        self.broadcast(&delivered)
    }
}

/// Thread-safe [`crate::ValueDispatcher`].
pub struct ValueDispatcher<T> {
    core: Arc<ValueCore<T>>,
    subscribable: SubscribableValueEvent<T>,
}

impl<T: Clone + Send + 'static> ValueDispatcher<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::with_config(initial, DispatcherConfig::default())
    }

    #[must_use]
    pub fn with_config(initial: T, config: DispatcherConfig) -> Self {
        let core = Arc::new(ValueCore {
            value: Mutex::new(initial),
            handlers: Arc::new(Mutex::new(HandlerList::default())),
            turn: ReentrantMutex::new(()),
            config,
        });
        let subscribable = SubscribableValueEvent {
            core: Arc::downgrade(&core),
        };
        Self { core, subscribable }
    }

    /// A clone of the current value.
    #[must_use]
    pub fn current(&self) -> T {
        self.core.current()
    }

    /// Borrow the current value under the lock.
    ///
    /// `f` must not set the value of this dispatcher (it would deadlock).
    pub fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.core.value))
    }

    /// Store `value` and broadcast it before returning.
    ///
    /// Broadcasts on one dispatcher take turns: a `set` from another thread
    /// waits until the running delivery has reached every subscriber, so the
    /// last value a subscriber sees always matches [`current`](Self::current).
    /// A handler must not wait on another thread that sets this dispatcher.
    pub fn set(&self, value: T) -> Result<(), DispatchError> {
        self.core.set(value)
    }

    /// Mutate the value under the lock, then broadcast the result.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<(), DispatchError> {
        self.core.update(f)
    }

    /// Subscribe and immediately invoke `handler` with the current value.
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Unsubscribe {
        self.core.subscribe(Arc::new(handler), true)
    }

    /// Subscribe, optionally invoking `handler` once with the current value.
    pub fn subscribe_with(
        &self,
        handler: impl Fn(&T) + Send + Sync + 'static,
        dispatch_immediately: bool,
    ) -> Unsubscribe {
        self.core.subscribe(Arc::new(handler), dispatch_immediately)
    }

    #[must_use]
    pub fn subscribable(&self) -> &SubscribableValueEvent<T> {
        &self.subscribable
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.core.handlers).len()
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.core.config
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueDispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ValueDispatcher");
        match self.core.value.try_lock() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<locked>"),
        };
        s.field("label", &self.core.config.label())
            .finish_non_exhaustive()
    }
}

/// Thread-safe [`crate::SubscribableValueEvent`].
pub struct SubscribableValueEvent<T> {
    core: Weak<ValueCore<T>>,
}

impl<T: Clone + Send + 'static> SubscribableValueEvent<T> {
    /// The dispatcher's current value, or `None` if it was dropped.
    #[must_use]
    pub fn current(&self) -> Option<T> {
        self.core.upgrade().map(|core| core.current())
    }

    /// Borrow the current value under the lock.
    pub fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let core = self.core.upgrade()?;
        let value = lock(&core.value);
        Some(f(&value))
    }

    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Unsubscribe {
        self.subscribe_with(handler, true)
    }

    pub fn subscribe_with(
        &self,
        handler: impl Fn(&T) + Send + Sync + 'static,
        dispatch_immediately: bool,
    ) -> Unsubscribe {
        match self.core.upgrade() {
            Some(core) => core.subscribe(Arc::new(handler), dispatch_immediately),
            None => Unsubscribe::inert(),
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.core.strong_count() > 0
    }
}

impl<T> Clone for SubscribableValueEvent<T> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for SubscribableValueEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribableValueEvent")
            .field("live", &(self.core.strong_count() > 0))
            .finish()
    }
}
