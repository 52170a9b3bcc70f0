#![forbid(unsafe_code)]

//! Plain event dispatch: the handler registry and broadcast machinery.
//!
//! [`EventDispatcher<T>`] broadcasts values it does not keep. It is also the
//! base that [`ValueDispatcher`](crate::ValueDispatcher) builds on: both share
//! the same registration, removal and delivery rules.
//!
//! # Re-entrancy
//!
//! The handler list is snapshotted before delivery and no borrow is held while
//! handlers run. A handler may therefore subscribe, unsubscribe (itself or
//! others) or dispatch again. Changes made during a broadcast take effect from
//! the next broadcast on; the one in progress still reaches exactly the
//! handlers that were registered when it began.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::config::DispatcherConfig;
use crate::delivery::deliver;
use crate::error::DispatchError;
use crate::handlers::{Detach, HandlerList};
use crate::subscription::Unsubscribe;

pub(crate) type Handler<T> = Rc<dyn Fn(&T)>;

/// Registry and broadcast logic shared by the single-threaded dispatchers.
pub(crate) struct EventCore<T> {
    handlers: Rc<RefCell<HandlerList<Handler<T>>>>,
    config: DispatcherConfig,
}

impl<T: 'static> EventCore<T> {
    pub(crate) fn new(config: DispatcherConfig) -> Self {
        Self {
            handlers: Rc::new(RefCell::new(HandlerList::default())),
            config,
        }
    }

    pub(crate) fn subscribe(&self, handler: Handler<T>) -> Unsubscribe {
        let id = self.handlers.borrow_mut().push(handler);
        trace!(dispatcher = self.config.label(), handler = ?id, "subscribed");
        let registry: Rc<dyn Detach> = self.handlers.clone();
        Unsubscribe::new(Rc::downgrade(&registry), id)
    }

    pub(crate) fn notify(&self, value: &T) -> Result<(), DispatchError> {
        let snapshot = self.handlers.borrow().snapshot();
        deliver(&snapshot, value, &self.config)
    }

    pub(crate) fn clear(&self) {
        let removed = self.handlers.borrow_mut().take_all();
        trace!(
            dispatcher = self.config.label(),
            removed = removed.len(),
            "cleared subscribers"
        );
    }
}

impl<T> EventCore<T> {
    pub(crate) fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub(crate) fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

/// Dispatcher for events that carry no stored value.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use valuecast::EventDispatcher;
///
/// let finished = EventDispatcher::<&'static str>::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&log);
/// finished.subscribable().subscribe(move |name| sink.borrow_mut().push(*name));
///
/// finished.dispatch(&"intro").unwrap();
/// assert_eq!(*log.borrow(), vec!["intro"]);
/// ```
pub struct EventDispatcher<T> {
    core: Rc<EventCore<T>>,
    subscribable: SubscribableEvent<T>,
}

impl<T: 'static> EventDispatcher<T> {
    /// Create a dispatcher with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher with the given configuration.
    #[must_use]
    pub fn with_config(config: DispatcherConfig) -> Self {
        let core = Rc::new(EventCore::new(config));
        let subscribable = SubscribableEvent {
            core: Rc::downgrade(&core),
        };
        Self { core, subscribable }
    }

    /// Register `handler`. The returned handle removes exactly this
    /// registration, even if the same closure is registered more than once.
    pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> Unsubscribe {
        self.core.subscribe(Rc::new(handler))
    }

    /// Deliver `value` to every handler registered at this moment, in
    /// registration order.
    ///
    /// A panicking handler does not stop delivery to the others. The first
    /// fault is then reported according to the configured
    /// [`FaultPolicy`](crate::FaultPolicy).
    pub fn notify_subscribers(&self, value: &T) -> Result<(), DispatchError> {
        self.core.notify(value)
    }

    /// Alias of [`notify_subscribers`](Self::notify_subscribers).
    pub fn dispatch(&self, value: &T) -> Result<(), DispatchError> {
        self.core.notify(value)
    }

    /// Number of live registrations.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.len()
    }

    /// Remove every registration. Outstanding handles become no-ops.
    pub fn clear(&self) {
        self.core.clear();
    }

    /// The restricted, subscribe-only view of this dispatcher.
    #[must_use]
    pub fn subscribable(&self) -> &SubscribableEvent<T> {
        &self.subscribable
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        self.core.config()
    }
}

impl<T: 'static> Default for EventDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventDispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("label", &self.core.config().label())
            .field("subscriber_count", &self.core.len())
            .finish()
    }
}

/// Subscribe-only view of an [`EventDispatcher`].
///
/// Holds a weak reference: it never keeps the dispatcher alive. Once the
/// dispatcher is dropped, subscribing registers nothing and returns a handle
/// that does nothing.
pub struct SubscribableEvent<T> {
    core: Weak<EventCore<T>>,
}

impl<T: 'static> SubscribableEvent<T> {
    /// Register `handler` on the underlying dispatcher.
    pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> Unsubscribe {
        match self.core.upgrade() {
            Some(core) => core.subscribe(Rc::new(handler)),
            None => Unsubscribe::inert(),
        }
    }

    /// Whether the underlying dispatcher still exists.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.core.strong_count() > 0
    }
}

// Manual Clone: a view is clonable regardless of `T`.
impl<T> Clone for SubscribableEvent<T> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for SubscribableEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribableEvent")
            .field("live", &(self.core.strong_count() > 0))
            .finish()
    }
}
