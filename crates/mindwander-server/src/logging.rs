//! Logging configuration and initialization.
//!
//! Targets live under `mindwander::` (`startup`, `api`, `ws`, `ws::ping`,
//! `session`, `registry`). `RUST_LOG` takes precedence over everything here.

use std::collections::HashMap;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const TARGET_PREFIX: &str = "mindwander::";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Lifecycle events only; per-broadcast and ping traces off
    #[default]
    Production,
    Verbose,
    Debug,
    Trace,
    /// Warnings and errors only
    Quiet,
}

impl LogPreset {
    fn directives(self) -> Vec<&'static str> {
        match self {
            LogPreset::Production => vec![
                "mindwander::startup=info",
                "mindwander::api=info",
                "mindwander::ws=info",
                "mindwander::ws::ping=off",
                "mindwander::session=info",
                "mindwander::registry=warn",
                "tower_http=warn",
            ],
            LogPreset::Verbose => vec![
                "mindwander=info",
                "mindwander::ws::ping=off",
                "tower_http=info",
            ],
            LogPreset::Debug => vec![
                "mindwander=debug",
                "mindwander::ws::ping=off",
                "tower_http=debug",
            ],
            LogPreset::Trace => vec!["mindwander=trace", "tower_http=trace"],
            LogPreset::Quiet => vec!["mindwander=warn", "tower_http=error"],
        }
    }
}

/// Logging configuration built from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    /// Per-target level overrides, keyed by full target name
    pub overrides: HashMap<String, Level>,
    pub format: LogFormat,
}

impl LogConfig {
    /// Build from CLI flags. The quietest flag wins, then the most detailed.
    pub fn from_cli(
        verbose: bool,
        debug: bool,
        trace: bool,
        quiet: bool,
        log_overrides: Vec<String>,
        format: LogFormat,
    ) -> Self {
        let preset = if quiet {
            LogPreset::Quiet
        } else if trace {
            LogPreset::Trace
        } else if debug {
            LogPreset::Debug
        } else if verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        };

        // Each override is "target=level", comma separated or repeated.
        let overrides = log_overrides
            .iter()
            .flat_map(|s| s.split(','))
            .filter_map(|part| {
                let (target, level) = part.split_once('=')?;
                let level = parse_level(level.trim())?;
                Some((normalize_target(target.trim()), level))
            })
            .collect();

        Self {
            preset,
            overrides,
            format,
        }
    }

    /// Build an EnvFilter from this configuration.
    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }
        EnvFilter::try_new(self.directives()).unwrap_or_else(|_| EnvFilter::new("info"))
    }

    fn directives(&self) -> String {
        let mut directives: Vec<String> = self
            .preset
            .directives()
            .into_iter()
            .map(String::from)
            .collect();
        for (target, level) in &self.overrides {
            directives.push(format!("{}={}", target, level.to_string().to_lowercase()));
        }
        directives.join(",")
    }
}

/// "session" -> "mindwander::session"; full names and tower_http pass through.
fn normalize_target(target: &str) -> String {
    if target.starts_with(TARGET_PREFIX) || target == "mindwander" || target == "tower_http" {
        target.to_string()
    } else {
        format!("{}{}", TARGET_PREFIX, target)
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize the tracing subscriber with the given configuration.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_thread_ids(false))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}
