#![forbid(unsafe_code)]

//! Ordered handler registry shared by the local and `sync` dispatchers.
//!
//! Each registration gets a fresh [`HandlerId`], so the same callback
//! registered twice is two independent entries. Removal preserves the order
//! of the remaining entries.

use std::cell::RefCell;
use std::sync::{Mutex, PoisonError};

/// Identity of a single registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HandlerId(u64);

struct Entry<H> {
    id: HandlerId,
    handler: H,
}

/// Handlers in registration order.
pub(crate) struct HandlerList<H> {
    entries: Vec<Entry<H>>,
    next_id: u64,
}

impl<H> Default for HandlerList<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<H> HandlerList<H> {
    pub(crate) fn push(&mut self, handler: H) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, handler });
        id
    }

    /// Removes the registration, handing the handler back so the caller can
    /// drop it after releasing any borrow or lock on the list.
    pub(crate) fn remove(&mut self, id: HandlerId) -> Option<H> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index).handler)
    }

    pub(crate) fn contains(&self, id: HandlerId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes every registration. Same drop contract as [`remove`](Self::remove).
    pub(crate) fn take_all(&mut self) -> Vec<H> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|entry| entry.handler)
            .collect()
    }
}

impl<H: Clone> HandlerList<H> {
    /// Copy of the current handlers, for delivery outside the borrow.
    pub(crate) fn snapshot(&self) -> Vec<H> {
        self.entries.iter().map(|entry| entry.handler.clone()).collect()
    }
}

/// Type-erased removal used by unsubscribe handles.
pub(crate) trait Detach {
    fn detach(&self, id: HandlerId) -> bool;
    fn is_attached(&self, id: HandlerId) -> bool;
}

impl<H> Detach for RefCell<HandlerList<H>> {
    fn detach(&self, id: HandlerId) -> bool {
        let removed = self.borrow_mut().remove(id);
        removed.is_some()
    }

    fn is_attached(&self, id: HandlerId) -> bool {
        self.borrow().contains(id)
    }
}

// Handlers never run under this lock, so poisoning can only come from a
// panic inside the list bookkeeping itself; the list is still consistent.
impl<H> Detach for Mutex<HandlerList<H>> {
    fn detach(&self, id: HandlerId) -> bool {
        let removed = self
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        removed.is_some()
    }

    fn is_attached(&self, id: HandlerId) -> bool {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}
