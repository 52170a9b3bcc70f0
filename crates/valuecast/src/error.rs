#![forbid(unsafe_code)]

//! Error types for dispatch and configuration.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Handler panic | A subscriber panicked during a broadcast | Remaining handlers still run; first fault returned as [`DispatchError`] (or re-raised, see [`FaultPolicy`](crate::FaultPolicy)) |
//! | Repeated unsubscribe | Handle invoked twice | No-op, `unsubscribe()` returns `false` |
//! | Dead dispatcher | Handle or view used after the owner dropped | No-op, no error |
//! | Bad policy string | Unknown `VALUECAST_FAULT_POLICY` value | [`ConfigError::UnknownFaultPolicy`] |

use std::fmt;

/// Errors surfaced by a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// At least one handler panicked while the value was being delivered.
    ///
    /// Every handler in the broadcast was still invoked; this reports the
    /// first one that failed.
    HandlerPanicked {
        /// Zero-based position of the failing handler within the broadcast.
        position: usize,
        /// Panic message of the first failure.
        message: String,
        /// Total number of handlers that panicked during the broadcast.
        faults: usize,
    },
}

impl DispatchError {
    /// Number of handlers that failed during the broadcast.
    #[must_use]
    pub fn fault_count(&self) -> usize {
        match self {
            Self::HandlerPanicked { faults, .. } => *faults,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandlerPanicked {
                position,
                message,
                faults,
            } => {
                write!(f, "subscriber #{position} panicked: {message}")?;
                if *faults > 1 {
                    write!(f, " ({} more failed)", faults - 1)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Errors from building a [`DispatcherConfig`](crate::DispatcherConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A fault policy name was not recognised.
    UnknownFaultPolicy(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFaultPolicy(name) => {
                write!(f, "unknown fault policy '{name}' (expected 'report' or 'resume')")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
