#![forbid(unsafe_code)]

//! Dispatcher configuration.
//!
//! A [`DispatcherConfig`] carries the label used in log output and the
//! [`FaultPolicy`] applied when a subscriber panics during a broadcast.
//!
//! ```
//! use valuecast::{DispatcherConfig, FaultPolicy, ValueDispatcher};
//!
//! let config = DispatcherConfig::new()
//!     .with_label("playhead")
//!     .with_fault_policy(FaultPolicy::Report);
//! let playhead = ValueDispatcher::with_config(0.0_f64, config);
//! assert_eq!(playhead.config().label(), "playhead");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Environment variable read by [`DispatcherConfig::from_env`].
pub const FAULT_POLICY_ENV: &str = "VALUECAST_FAULT_POLICY";

const UNLABELLED: &str = "unlabelled";

/// How the first handler panic of a broadcast is surfaced.
///
/// Under both policies every handler in the broadcast is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Return the first fault as an `Err` from the broadcasting call.
    #[default]
    Report,
    /// Re-raise the first panic once all handlers have run.
    Resume,
}

impl FaultPolicy {
    /// Stable lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Resume => "resume",
        }
    }
}

impl fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "resume" | "propagate" => Ok(Self::Resume),
            _ => Err(ConfigError::UnknownFaultPolicy(s.to_string())),
        }
    }
}

/// Configuration shared by every dispatcher type.
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Name reported in the `dispatcher` field of log events.
    pub label: Option<String>,
    /// Policy for handler panics during a broadcast.
    pub fault_policy: FaultPolicy,
}

impl DispatcherConfig {
    /// Unlabelled configuration with the [`FaultPolicy::Report`] policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label used in log output.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the fault policy.
    #[must_use]
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// The configured label, or `"unlabelled"`.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(UNLABELLED)
    }

    /// Build a configuration from the process environment.
    ///
    /// Reads [`FAULT_POLICY_ENV`]; an unset variable yields the default policy.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable variable lookup.
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fault_policy = match get_env(FAULT_POLICY_ENV) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => FaultPolicy::default(),
        };
        Ok(Self {
            label: None,
            fault_policy,
        })
    }
}
