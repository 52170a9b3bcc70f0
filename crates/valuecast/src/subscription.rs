#![forbid(unsafe_code)]

//! Unsubscribe handles for the single-threaded dispatchers.
//!
//! An [`Unsubscribe`] removes exactly one registration. It holds only a weak
//! reference to the dispatcher's handler list, so it never keeps a dispatcher
//! alive and becomes a no-op once the dispatcher is dropped.
//!
//! Dropping an [`Unsubscribe`] does **not** cancel the subscription. Convert it
//! with [`Unsubscribe::into_guard`] for scope-bound behaviour.

use std::fmt;
use std::rc::Weak;

use tracing::trace;

use crate::handlers::{Detach, HandlerId};

/// Handle that cancels one subscription.
///
/// Cloning yields another handle to the same registration; whichever clone
/// is invoked first performs the removal.
#[derive(Clone)]
pub struct Unsubscribe {
    target: Option<(Weak<dyn Detach>, HandlerId)>,
}

impl Unsubscribe {
    pub(crate) fn new(registry: Weak<dyn Detach>, id: HandlerId) -> Self {
        Self {
            target: Some((registry, id)),
        }
    }

    /// A handle that refers to nothing, returned when subscribing through a
    /// view whose dispatcher is gone.
    pub(crate) fn inert() -> Self {
        Self { target: None }
    }

    /// Cancel the subscription.
    ///
    /// Returns `true` if this call removed the registration. Calling it again,
    /// from inside a handler, or after the dispatcher was dropped is a no-op
    /// returning `false`.
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

    /// Whether the registration is still present on a live dispatcher.
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
    /// Give up scope-bound behaviour and return the plain handle.
    #[must_use]
    pub fn into_handle(mut self) -> Unsubscribe {
        self.handle.take().unwrap_or_else(Unsubscribe::inert)
    }

    /// Whether the guarded registration is still present.
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
