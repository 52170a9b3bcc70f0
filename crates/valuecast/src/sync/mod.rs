#![forbid(unsafe_code)]

//! Thread-safe value dispatchers.
//!
//! Same API and delivery rules as the crate-root types, built on `Arc` and
//! `Mutex` so that dispatchers, views and handles can cross threads. Handlers
//! must be `Send + Sync`.
//!
//! # Locking
//!
//! The value and the handler list each sit behind their own mutex, and
//! neither is held while a handler runs. Each dispatcher also has a reentrant
//! turn lock (`parking_lot::ReentrantMutex`) held from a store until its
//! broadcast finishes, and from a registration until its immediate dispatch
//! returns. Handlers may subscribe, unsubscribe or set the value again on the
//! same thread without deadlocking.
//!
//! Two threads calling [`ValueDispatcher::set`] concurrently take turns. Which
//! goes first is unspecified, but each broadcast reaches every subscriber
//! before the next store, so the last value a subscriber received is always
//! the stored value. A handler that blocks on another thread setting the same
//! dispatcher deadlocks.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::thread;
//! use valuecast::sync::ValueDispatcher;
//!
//! let playhead = Arc::new(ValueDispatcher::new(0u64));
//! let view = playhead.subscribable().clone();
//! let last = Arc::new(AtomicU64::new(0));
//! let last_in_handler = Arc::clone(&last);
//! let _handle = view.subscribe(move |v| last_in_handler.store(*v, Ordering::SeqCst));
//!
//! let writer = Arc::clone(&playhead);
//! thread::spawn(move || writer.set(240).unwrap()).join().unwrap();
//! assert_eq!(last.load(Ordering::SeqCst), 240);
//! assert_eq!(view.current(), Some(240));
//! ```

mod subscription;
mod value;

pub use subscription::{SubscriptionGuard, Unsubscribe};
pub use value::{SubscribableValueEvent, ValueDispatcher};
