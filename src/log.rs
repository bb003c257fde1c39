//! Leveled stderr logging for the driver binaries.
//!
//! A process-wide threshold filters what [`info!`](crate::info),
//! [`warn!`](crate::warn), and [`error!`](crate::error) emit. Lines are
//! stamped with the seconds elapsed since the driver first logged; a VM
//! run lasts milliseconds, so a run-relative clock reads better than
//! wall-clock time. The threshold is set once at startup (from the
//! `STACKMACH_LOG` environment variable in the drivers) and is
//! effectively read-only afterwards.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

/// Severity of a driver log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    /// Parses a level name as used by the `STACKMACH_LOG` environment
    /// variable.
    pub fn from_name(name: &str) -> Option<Level> {
        match name.to_ascii_lowercase().as_str() {
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

static THRESHOLD: AtomicU8 = AtomicU8::new(Level::Info as u8);
static STARTED: OnceLock<Instant> = OnceLock::new();

/// Sets the minimum level that reaches stderr.
pub fn init(level: Level) {
    THRESHOLD.store(level as u8, Ordering::Relaxed);
}

fn passes(level: Level) -> bool {
    level as u8 >= THRESHOLD.load(Ordering::Relaxed)
}

/// Seconds since the first call into the logger.
fn elapsed() -> f64 {
    STARTED.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Emits one line to stderr when `level` clears the threshold.
pub fn write(level: Level, message: &str) {
    if !passes(level) {
        return;
    }
    eprintln!("[{:9.3}s {:<5}] {}", elapsed(), level.label(), message);
}

/// Logs an info-level message.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::Level::Info, &format!($($arg)*))
    };
}

/// Logs a warning-level message.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::Level::Warn, &format!($($arg)*))
    };
}

/// Logs an error-level message.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::Level::Error, &format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn level_from_name() {
        assert_eq!(Level::from_name("info"), Some(Level::Info));
        assert_eq!(Level::from_name("WARN"), Some(Level::Warn));
        assert_eq!(Level::from_name("Error"), Some(Level::Error));
        assert_eq!(Level::from_name("debug"), None);
        assert_eq!(Level::from_name(""), None);
    }

    #[test]
    fn labels_are_lowercase() {
        assert_eq!(Level::Info.label(), "info");
        assert_eq!(Level::Warn.label(), "warn");
        assert_eq!(Level::Error.label(), "error");
    }

    #[test]
    fn threshold_filters_lower_levels() {
        init(Level::Warn);
        assert!(!passes(Level::Info));
        assert!(passes(Level::Warn));
        assert!(passes(Level::Error));

        // Restore the default for any test logging afterwards.
        init(Level::Info);
        assert!(passes(Level::Info));
    }

    #[test]
    fn elapsed_never_runs_backwards() {
        let first = elapsed();
        let second = elapsed();
        assert!(first >= 0.0);
        assert!(second >= first);
    }
}
