#![forbid(unsafe_code)]

//! Broadcast loop with per-handler panic isolation.

use std::any::Any;
use std::ops::Deref;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use tracing::{trace, warn};

use crate::config::{DispatcherConfig, FaultPolicy};
use crate::error::DispatchError;

/// Deliver `value` to every handler in `handlers`, in order.
///
/// A panicking handler is logged and skipped; the rest still run. The first
/// fault is then surfaced according to `config.fault_policy`.
pub(crate) fn deliver<T, H, F>(
    handlers: &[H],
    value: &T,
    config: &DispatcherConfig,
) -> Result<(), DispatchError>
where
    H: Deref<Target = F>,
    F: Fn(&T) + ?Sized,
{
    trace!(
        dispatcher = config.label(),
        subscribers = handlers.len(),
        "broadcast"
    );

    let mut first: Option<(usize, Box<dyn Any + Send>)> = None;
    let mut faults = 0usize;

    for (position, handler) in handlers.iter().enumerate() {
        let handler: &F = handler;
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(value))) {
            faults += 1;
            warn!(
                dispatcher = config.label(),
                position,
                reason = %panic_message(payload.as_ref()),
                "subscriber panicked during broadcast"
            );
            if first.is_none() {
                first = Some((position, payload));
            }
        }
    }

    let Some((position, payload)) = first else {
        return Ok(());
    };
    match config.fault_policy {
        FaultPolicy::Report => Err(DispatchError::HandlerPanicked {
            position,
            message: panic_message(payload.as_ref()),
            faults,
        }),
        FaultPolicy::Resume => resume_unwind(payload),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
