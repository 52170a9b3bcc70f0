#![forbid(unsafe_code)]

//! Synchronous value dispatchers with restricted subscribe-only views.
//!
//! This crate provides a small publish/subscribe primitive for in-process
//! change notification:
//!
//! - [`ValueDispatcher`]: owns a current value; every [`set`](ValueDispatcher::set)
//!   broadcasts the new value to all subscribers before returning.
//! - [`SubscribableValueEvent`]: the restricted view a dispatcher hands out to
//!   external code. It can read the current value and subscribe, nothing else.
//! - [`EventDispatcher`] / [`SubscribableEvent`]: the same machinery for plain
//!   events that carry no stored value.
//! - [`Unsubscribe`]: the handle returned by every subscription. Idempotent,
//!   safe to call from inside a handler and after the dispatcher is gone.
//! - [`sync`]: `Send + Sync` counterparts built on `Arc` and `Mutex`.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use valuecast::ValueDispatcher;
//!
//! let progress = ValueDispatcher::new(0u32);
//! let view = progress.subscribable().clone();
//!
//! let seen = Rc::new(Cell::new(0));
//! let seen_in_handler = Rc::clone(&seen);
//! let handle = view.subscribe(move |value| seen_in_handler.set(*value));
//! assert_eq!(seen.get(), 0);
//!
//! progress.set(7).unwrap();
//! assert_eq!(seen.get(), 7);
//! assert_eq!(view.current(), Some(7));
//!
//! handle.unsubscribe();
//! progress.set(9).unwrap();
//! assert_eq!(seen.get(), 7);
//! ```
//!
//! # Invariants
//!
//! 1. Handlers are invoked in registration order.
//! 2. A broadcast reaches exactly the handlers registered when it began.
//! 3. No internal borrow or lock is held while a handler runs.
//! 4. A panicking handler never prevents delivery to the handlers after it.

pub mod config;
mod delivery;
pub mod dispatcher;
pub mod error;
mod handlers;
pub mod subscription;
pub mod sync;
pub mod value;

pub use config::{DispatcherConfig, FaultPolicy};
pub use dispatcher::{EventDispatcher, SubscribableEvent};
pub use error::{ConfigError, DispatchError};
pub use subscription::{SubscriptionGuard, Unsubscribe};
pub use value::{SubscribableValueEvent, ValueDispatcher};
