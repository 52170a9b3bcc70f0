#![forbid(unsafe_code)]

//! Unsubscribe handles for the thread-safe dispatchers.

use std::fmt;
use std::sync::Weak;

use tracing::trace;

use crate::handlers::{Detach, HandlerId};

/// `Send + Sync` counterpart of [`crate::Unsubscribe`].
///
/// Same contract: removes exactly one registration, idempotent, a no-op once
/// the dispatcher is gone, and dropping it does not unsubscribe.
#[derive(Clone)]
pub struct Unsubscribe {
    target: Option<(Weak<dyn Detach + Send + Sync>, HandlerId)>,
}

impl Unsubscribe {
    pub(crate) fn new(registry: Weak<dyn Detach + Send + Sync>, id: HandlerId) -> Self {
        Self {
            target: Some((registry, id)),
        }
    }

    pub(crate) fn inert() -> Self {
        Self { target: None }
    }

    /// Cancel the subscription. Returns `true` only on the call that removed it.
    pub fn unsubscribe(&self) -> bool {
        let Some((registry, id)) = &self.target else {
            return false;
        };
        let Some(registry) = registry.upgrade() else {
            return false;
        };
        let removed = registry.detach(*id);
        if removed {
            trace!(handler = ?id, "unsubscribed");
        }
        removed
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.target
            .as_ref()
            .and_then(|(registry, id)| registry.upgrade().map(|r| r.is_attached(*id)))
            .unwrap_or(false)
    }

    /// Tie the subscription to a guard that cancels it on drop.
    #[must_use]
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { handle: Some(self) }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("handler", &self.target.as_ref().map(|(_, id)| *id))
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

/// RAII guard that unsubscribes when dropped.
#[must_use = "dropping the guard cancels the subscription immediately"]
pub struct SubscriptionGuard {
    handle: Option<Unsubscribe>,
}

impl SubscriptionGuard {
    #[must_use]
    pub fn into_handle(mut self) -> Unsubscribe {
        self.handle.take().unwrap_or_else(Unsubscribe::inert)
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.handle.as_ref().is_some_and(Unsubscribe::is_subscribed)
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.unsubscribe();
        }
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("handle", &self.handle)
            .finish()
    }
}
