#![forbid(unsafe_code)]

//! Command-line argument parsing for the scene demo.
//!
//! Parses args manually (no external dependencies) to keep the binary lean.
//! Supports environment variable overrides via `VALUECAST_DEMO_*` prefix.

use std::env;
use std::process;
use std::time::Duration;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
valuecast scene demo

Plays a clip for a fixed time while an overlay follows its state and
playhead through subscribe-only views.

USAGE:
    valuecast-demo [OPTIONS]

OPTIONS:
    --clip=NAME          Clip name (default: intro)
    --clip-length=SECS   Clip length in seconds (default: 10)
    --duration=SECS      How long the scene plays (default: 7)
    --step-ms=N          Playhead step in milliseconds (default: 500)
    --instant            Advance without sleeping between steps
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    VALUECAST_DEMO_CLIP          Override --clip
    VALUECAST_DEMO_CLIP_LENGTH   Override --clip-length
    VALUECAST_DEMO_DURATION      Override --duration
    VALUECAST_DEMO_STEP_MS       Override --step-ms
    VALUECAST_DEMO_INSTANT       Set to 1 or true for --instant
    VALUECAST_FAULT_POLICY       Subscriber panic handling: report or resume
    RUST_LOG                     Log filter (default: info)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    pub clip: String,
    pub clip_length: f64,
    pub duration: f64,
    pub step_ms: u64,
    pub instant: bool,
}

#[derive(Debug, PartialEq)]
enum ParseError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            clip: "intro".into(),
            clip_length: 10.0,
            duration: 7.0,
            step_ms: 500,
            instant: false,
        }
    }
}

impl Opts {
    /// Parse from the process environment and arguments, exiting on
    /// `--help`, `--version` or bad input.
    pub fn parse() -> Self {
        match Self::parse_from_env_and_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ParseError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ParseError::Version) => {
                println!("valuecast-demo {VERSION}");
                process::exit(0);
            }
            Err(ParseError::InvalidValue { flag, value }) => {
                eprintln!("Invalid {flag} value: {value}");
                process::exit(1);
            }
            Err(ParseError::UnknownArg(arg)) => {
                eprintln!("Unknown argument: {arg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration)
    }

    #[must_use]
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    fn parse_from_env_and_args<I, S, F>(args: I, get_env: F) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        // Environment first, arguments override.
        if let Some(val) = get_env("VALUECAST_DEMO_CLIP")
            && !val.trim().is_empty()
        {
            opts.clip = val;
        }
        if let Some(val) = get_env("VALUECAST_DEMO_CLIP_LENGTH")
            && let Some(secs) = parse_seconds(&val)
        {
            opts.clip_length = secs;
        }
        if let Some(val) = get_env("VALUECAST_DEMO_DURATION")
            && let Some(secs) = parse_seconds(&val)
        {
            opts.duration = secs;
        }
        if let Some(val) = get_env("VALUECAST_DEMO_STEP_MS")
            && let Ok(n) = val.trim().parse()
        {
            opts.step_ms = n;
        }
        if let Some(val) = get_env("VALUECAST_DEMO_INSTANT") {
            opts.instant = val == "1" || val.eq_ignore_ascii_case("true");
        }

        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--help" | "-h" => return Err(ParseError::Help),
                "--version" | "-V" => return Err(ParseError::Version),
                "--instant" => opts.instant = true,
                other => {
                    if let Some(val) = other.strip_prefix("--clip=") {
                        opts.clip = val.to_string();
                    } else if let Some(val) = other.strip_prefix("--clip-length=") {
                        opts.clip_length =
                            parse_seconds(val).ok_or_else(|| ParseError::InvalidValue {
                                flag: "--clip-length",
                                value: val.to_string(),
                            })?;
                    } else if let Some(val) = other.strip_prefix("--duration=") {
                        opts.duration =
                            parse_seconds(val).ok_or_else(|| ParseError::InvalidValue {
                                flag: "--duration",
                                value: val.to_string(),
                            })?;
                    } else if let Some(val) = other.strip_prefix("--step-ms=") {
                        opts.step_ms = val.parse().map_err(|_| ParseError::InvalidValue {
                            flag: "--step-ms",
                            value: val.to_string(),
                        })?;
                    } else {
                        return Err(ParseError::UnknownArg(other.to_string()));
                    }
                }
            }
        }

        Ok(opts)
    }
}

/// Finite, non-negative seconds that fit in a `Duration`.
fn parse_seconds(raw: &str) -> Option<f64> {
    let secs: f64 = raw.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0 && secs <= 86_400.0).then_some(secs)
}
