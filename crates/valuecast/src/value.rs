#![forbid(unsafe_code)]

//! Value dispatcher with a restricted subscribe-only view.
//!
//! # Design
//!
//! [`ValueDispatcher<T>`] owns the current value and the handler list behind
//! an `Rc`. Every [`set`](ValueDispatcher::set) stores the value and then
//! broadcasts a clone of it to all handlers before returning. Unlike a
//! change-detecting observable, setting an equal value still broadcasts.
//!
//! The dispatcher owns exactly one [`SubscribableValueEvent<T>`], a `Weak`
//! back-reference that can read the value and subscribe but has no way to set
//! or dispatch. Hand the view to outside code; keep the dispatcher private.
//!
//! ```
//! use valuecast::{SubscribableValueEvent, ValueDispatcher};
//!
//! struct Clip {
//!     frame: ValueDispatcher<u32>,
//! }
//!
//! impl Clip {
//!     fn on_frame_changed(&self) -> &SubscribableValueEvent<u32> {
//!         self.frame.subscribable()
//!     }
//!
//!     fn advance(&self) {
//!         let next = self.frame.current() + 1;
//!         self.frame.set(next).expect("frame subscribers must not panic");
//!     }
//! }
//!
//! let clip = Clip { frame: ValueDispatcher::new(0) };
//! let view = clip.on_frame_changed().clone();
//! clip.advance();
//! assert_eq!(view.current(), Some(1));
//! ```
//!
//! # Failure Modes
//!
//! - **Panicking subscriber**: isolated; see [`FaultPolicy`](crate::FaultPolicy).
//! - **Panicking immediate dispatch**: the panic propagates out of
//!   `subscribe`; the registration it made is kept.
//! - **Setting from inside [`with_current`](ValueDispatcher::with_current) or
//!   [`update`](ValueDispatcher::update)**: panics (`RefCell` borrow rules).
//!   Setting from inside a subscriber is fine.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::config::DispatcherConfig;
use crate::dispatcher::{EventCore, Handler};
use crate::error::DispatchError;
use crate::subscription::Unsubscribe;

/// Shared state behind a [`ValueDispatcher`] and its view.
struct ValueCore<T> {
    value: RefCell<T>,
    events: EventCore<T>,
}

impl<T: Clone + 'static> ValueCore<T> {
    fn current(&self) -> T {
        self.value.borrow().clone()
    }

    fn subscribe(&self, handler: Handler<T>, dispatch_immediately: bool) -> Unsubscribe {
        let unsubscribe = self.events.subscribe(Rc::clone(&handler));
        if dispatch_immediately {
            trace!(
                dispatcher = self.events.config().label(),
                "immediate dispatch"
            );
            let value = self.current();
            handler(&value);
        }
        unsubscribe
    }

    fn set(&self, value: T) -> Result<(), DispatchError> {
        let delivered = value.clone();
        drop(self.value.replace(value));
        self.events.notify(&delivered)
    }
}

/// Holds a current value and notifies subscribers whenever it is set.
pub struct ValueDispatcher<T> {
    core: Rc<ValueCore<T>>,
    subscribable: SubscribableValueEvent<T>,
}

impl<T: Clone + 'static> ValueDispatcher<T> {
    /// Create a dispatcher holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::with_config(initial, DispatcherConfig::default())
    }

    /// Create a dispatcher holding `initial` with the given configuration.
    #[must_use]
    pub fn with_config(initial: T, config: DispatcherConfig) -> Self {
        let core = Rc::new(ValueCore {
            value: RefCell::new(initial),
            events: EventCore::new(config),
        });
        let subscribable = SubscribableValueEvent {
            core: Rc::downgrade(&core),
        };
        Self { core, subscribable }
    }

    /// A clone of the current value.
    #[must_use]
    pub fn current(&self) -> T {
        self.core.current()
    }

    /// Borrow the current value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` sets the value of this dispatcher.
    pub fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.core.value.borrow())
    }

    /// Store `value` and broadcast it to every subscriber, in subscription
    /// order, before returning.
    ///
    /// The value is stored even if a subscriber panics; the first fault is
    /// then reported according to the configured
    /// [`FaultPolicy`](crate::FaultPolicy).
    pub fn set(&self, value: T) -> Result<(), DispatchError> {
        self.core.set(value)
    }

    /// Mutate the value in place, then broadcast the result.
    ///
    /// # Panics
    ///
    /// Panics if `f` reads or sets the value of this dispatcher.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<(), DispatchError> {
        let delivered = {
            let mut value = self.core.value.borrow_mut();
            f(&mut value);
            value.clone()
        };
        self.core.events.notify(&delivered)
    }

    /// Subscribe and immediately invoke `handler` with the current value.
    ///
    /// Equivalent to `subscribe_with(handler, true)`.
    pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> Unsubscribe {
        self.core.subscribe(Rc::new(handler), true)
    }

    /// Subscribe, optionally invoking `handler` once with the current value
    /// before returning.
    ///
    /// With `dispatch_immediately == false` the handler is first called on the
    /// next [`set`](Self::set).
    pub fn subscribe_with(
        &self,
        handler: impl Fn(&T) + 'static,
        dispatch_immediately: bool,
    ) -> Unsubscribe {
        self.core.subscribe(Rc::new(handler), dispatch_immediately)
    }

    /// The restricted view to hand out to code that must not set the value.
    #[must_use]
    pub fn subscribable(&self) -> &SubscribableValueEvent<T> {
        &self.subscribable
    }

    /// Number of live registrations.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.events.len()
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        self.core.events.config()
    }
}

impl<T: Default + Clone + 'static> Default for ValueDispatcher<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueDispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ValueDispatcher");
        match self.core.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.field("label", &self.core.events.config().label())
            .finish_non_exhaustive()
    }
}

/// Read-and-subscribe view of a [`ValueDispatcher`].
///
/// Forwards every call to the dispatcher it was created by; it has no state
/// of its own and cannot be rebound. It holds a `Weak` reference, so it never
/// keeps the dispatcher alive: once the dispatcher is dropped,
/// [`current`](Self::current) returns `None` and subscribing does nothing.
pub struct SubscribableValueEvent<T> {
    core: Weak<ValueCore<T>>,
}

impl<T: Clone + 'static> SubscribableValueEvent<T> {
    /// The dispatcher's current value, or `None` if it was dropped.
    #[must_use]
    pub fn current(&self) -> Option<T> {
        self.core.upgrade().map(|core| core.current())
    }

    /// Borrow the current value without cloning.
    pub fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let core = self.core.upgrade()?;
        let value = core.value.borrow();
        Some(f(&value))
    }

    /// Subscribe and immediately invoke `handler` with the current value.
    pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> Unsubscribe {
        self.subscribe_with(handler, true)
    }

    /// Subscribe, optionally invoking `handler` once with the current value.
    ///
    /// See [`ValueDispatcher::subscribe_with`].
    pub fn subscribe_with(
        &self,
        handler: impl Fn(&T) + 'static,
        dispatch_immediately: bool,
    ) -> Unsubscribe {
        match self.core.upgrade() {
            Some(core) => core.subscribe(Rc::new(handler), dispatch_immediately),
            None => Unsubscribe::inert(),
        }
    }

    /// Whether the underlying dispatcher still exists.
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FaultPolicy;
    use std::cell::Cell;

    fn log_handler(log: &Rc<RefCell<Vec<(char, i32)>>>, name: char) -> impl Fn(&i32) + 'static {
        let log = Rc::clone(log);
        move |value: &i32| log.borrow_mut().push((name, *value))
    }

    #[test]
    fn get_set_basic() {
        let dispatcher = ValueDispatcher::new(42);
        assert_eq!(dispatcher.current(), 42);

        dispatcher.set(99).unwrap();
        assert_eq!(dispatcher.current(), 99);
    }

    #[test]
    fn subscribe_dispatches_immediately_by_default() {
        let dispatcher = ValueDispatcher::new(3);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);

        let _handle = dispatcher.subscribe(move |v| seen_clone.borrow_mut().push(*v));
        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn deferred_subscription_waits_for_next_set() {
        let dispatcher = ValueDispatcher::new(3);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let _handle =
            dispatcher.subscribe_with(move |_| count_clone.set(count_clone.get() + 1), false);
        assert_eq!(count.get(), 0);

        dispatcher.set(4).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn equal_value_still_broadcasts() {
        let dispatcher = ValueDispatcher::new(1);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let _handle =
            dispatcher.subscribe_with(move |_| count_clone.set(count_clone.get() + 1), false);

        dispatcher.set(1).unwrap();
        dispatcher.set(1).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn scenario_zero_five_nine_one() {
        let dispatcher = ValueDispatcher::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let h1 = dispatcher.subscribe(log_handler(&log, '1'));
        assert_eq!(*log.borrow(), vec![('1', 0)]);

        dispatcher.set(5).unwrap();
        assert_eq!(*log.borrow(), vec![('1', 0), ('1', 5)]);

        let _h2 = dispatcher.subscribe_with(log_handler(&log, '2'), false);
        assert_eq!(log.borrow().len(), 2);

        dispatcher.set(9).unwrap();
        assert_eq!(log.borrow()[2..], [('1', 9), ('2', 9)]);

        h1.unsubscribe();
        dispatcher.set(1).unwrap();
        assert_eq!(log.borrow()[4..], [('2', 1)]);
    }

    #[test]
    fn notification_order_is_subscription_order() {
        let dispatcher = ValueDispatcher::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = dispatcher.subscribe_with(log_handler(&log, 'A'), false);
        let _b = dispatcher.subscribe_with(log_handler(&log, 'B'), false);
        let _c = dispatcher.subscribe_with(log_handler(&log, 'C'), false);

        dispatcher.set(1).unwrap();
        let order: Vec<char> = log.borrow().iter().map(|(name, _)| *name).collect();
        assert_eq!(order, vec!['A', 'B', 'C']);
    }

    #[test]
    fn view_reads_same_value_as_dispatcher() {
        let dispatcher = ValueDispatcher::new("a".to_string());
        let view = dispatcher.subscribable();
        assert_eq!(view.current(), Some(dispatcher.current()));

        dispatcher.set("b".to_string()).unwrap();
        assert_eq!(view.current().as_deref(), Some("b"));
        assert_eq!(view.with_current(String::len), Some(1));
    }

    #[test]
    fn view_subscribe_forwards_to_dispatcher() {
        let dispatcher = ValueDispatcher::new(10);
        let view = dispatcher.subscribable().clone();
        let last = Rc::new(Cell::new(0));
        let last_clone = Rc::clone(&last);

        let handle = view.subscribe(move |v| last_clone.set(*v));
        assert_eq!(last.get(), 10);
        assert_eq!(dispatcher.subscriber_count(), 1);

        dispatcher.set(11).unwrap();
        assert_eq!(last.get(), 11);

        assert!(handle.unsubscribe());
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[test]
    fn view_after_dispatcher_dropped() {
        let dispatcher = ValueDispatcher::new(5);
        let view = dispatcher.subscribable().clone();
        let handle = view.subscribe_with(|_| {}, false);
        drop(dispatcher);

        assert!(!view.is_live());
        assert_eq!(view.current(), None);
        assert_eq!(view.with_current(|v| *v), None);
        assert!(!handle.unsubscribe());

        let called = Rc::new(Cell::new(false));
        let called_clone = Rc::clone(&called);
        let late = view.subscribe(move |_| called_clone.set(true));
        assert!(!called.get());
        assert!(!late.is_subscribed());
    }

    #[test]
    fn unsubscribe_twice_is_noop() {
        let dispatcher = ValueDispatcher::new(0);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let handle = dispatcher.subscribe(move |_| count_clone.set(count_clone.get() + 1));
        assert_eq!(count.get(), 1);

        assert!(handle.unsubscribe());
        assert!(!handle.unsubscribe());
        dispatcher.set(1).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn self_unsubscribe_during_broadcast() {
        let dispatcher = ValueDispatcher::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let slot: Rc<RefCell<Option<Unsubscribe>>> = Rc::default();
        let slot_in_handler = Rc::clone(&slot);
        let log_a = Rc::clone(&log);
        let handle = dispatcher.subscribe_with(
            move |v: &i32| {
                log_a.borrow_mut().push(('A', *v));
                if let Some(handle) = slot_in_handler.borrow().as_ref() {
                    handle.unsubscribe();
                }
            },
            false,
        );
        *slot.borrow_mut() = Some(handle);
        let _b = dispatcher.subscribe_with(log_handler(&log, 'B'), false);

        dispatcher.set(1).unwrap();
        dispatcher.set(2).unwrap();
        assert_eq!(*log.borrow(), vec![('A', 1), ('B', 1), ('B', 2)]);
    }

    #[test]
    fn unsubscribing_a_later_handler_mid_broadcast_still_delivers_to_it() {
        let dispatcher = ValueDispatcher::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let victim: Rc<RefCell<Option<Unsubscribe>>> = Rc::default();
        let victim_in_handler = Rc::clone(&victim);
        let _a = dispatcher.subscribe_with(
            move |_: &i32| {
                if let Some(handle) = victim_in_handler.borrow().as_ref() {
                    handle.unsubscribe();
                }
            },
            false,
        );
        let b = dispatcher.subscribe_with(log_handler(&log, 'B'), false);
        *victim.borrow_mut() = Some(b);

        dispatcher.set(1).unwrap();
        dispatcher.set(2).unwrap();
        assert_eq!(*log.borrow(), vec![('B', 1)]);
    }

    #[test]
    fn reentrant_set_from_subscriber() {
        let dispatcher = Rc::new(ValueDispatcher::new(0));
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner = Rc::clone(&dispatcher);
        let _clamp = dispatcher.subscribe_with(
            move |v: &i32| {
                if *v > 10 {
                    inner.set(10).unwrap();
                }
            },
            false,
        );
        let _observer = dispatcher.subscribe_with(log_handler(&log, 'O'), false);

        dispatcher.set(50).unwrap();
        assert_eq!(dispatcher.current(), 10);
        // Nested broadcast completes before the outer one resumes.
        assert_eq!(*log.borrow(), vec![('O', 10), ('O', 50)]);
    }

    #[test]
    fn update_mutates_and_broadcasts() {
        let dispatcher = ValueDispatcher::new(vec![1, 2, 3]);
        let last_len = Rc::new(Cell::new(0usize));
        let last_clone = Rc::clone(&last_len);
        let _sub = dispatcher.subscribe_with(move |v: &Vec<i32>| last_clone.set(v.len()), false);

        dispatcher.update(|v| v.push(4)).unwrap();
        assert_eq!(last_len.get(), 4);
        assert_eq!(dispatcher.with_current(|v| v.iter().sum::<i32>()), 10);
    }

    #[test]
    fn panicking_subscriber_is_isolated() {
        let dispatcher = ValueDispatcher::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _bad = dispatcher.subscribe_with(
            |_: &i32| {
                panic!("subscriber exploded");
            },
            false,
        );
        let _good = dispatcher.subscribe_with(log_handler(&log, 'G'), false);

        let err = dispatcher.set(7).unwrap_err();
        assert_eq!(dispatcher.current(), 7);
        assert_eq!(*log.borrow(), vec![('G', 7)]);
        assert!(matches!(
            err,
            DispatchError::HandlerPanicked { position: 0, faults: 1, .. }
        ));
    }

    #[test]
    fn resume_policy_reraises_after_delivery() {
        let config = DispatcherConfig::new().with_fault_policy(FaultPolicy::Resume);
        let dispatcher = ValueDispatcher::with_config(0, config);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _bad = dispatcher.subscribe_with(
            |_: &i32| {
                panic!("resume me");
            },
            false,
        );
        let _good = dispatcher.subscribe_with(log_handler(&log, 'G'), false);

        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| dispatcher.set(1)));
        assert!(outcome.is_err());
        assert_eq!(*log.borrow(), vec![('G', 1)]);
    }

    #[test]
    fn immediate_dispatch_panic_propagates_and_keeps_registration() {
        let dispatcher = ValueDispatcher::new(0);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            dispatcher.subscribe(|_: &i32| {
                panic!("immediate");
            })
        }));
        assert!(outcome.is_err());
        assert_eq!(dispatcher.subscriber_count(), 1);
    }

    #[test]
    fn default_uses_type_default() {
        let dispatcher: ValueDispatcher<String> = ValueDispatcher::default();
        assert_eq!(dispatcher.current(), "");
    }

    #[test]
    fn debug_format() {
        let dispatcher =
            ValueDispatcher::with_config(42, DispatcherConfig::new().with_label("answer"));
        let dbg = format!("{dispatcher:?}");
        assert!(dbg.contains("ValueDispatcher"));
        assert!(dbg.contains("42"));
        assert!(dbg.contains("answer"));
    }
}
