//! Logging configuration for shieldr.
//!
//! Sets up the tracing subscriber used by the server and the CLI.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much the server and CLI log, picked from `-q`/`-v` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// Startup, SOS events and zone sources.
    #[default]
    Normal,
    /// Adds upstream queries and store writes (`-v`).
    Verbose,
    /// Everything, including per-request spans (`-vv`).
    Trace,
}

impl Verbosity {
    /// Pick a verbosity from the repeat count of `-v` and the `-q` flag.
    ///
    /// `-q` wins over any number of `-v`.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Most detailed level that is emitted.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    ///
    /// `tower_http` follows the crate level so request traces appear with `-v`.
    #[must_use]
    pub fn default_directives(self) -> String {
        let level = self.level();
        format!("shieldr={level},tower_http={level}")
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `verbosity` when set. Later calls are no-ops.
///
/// # Examples
///
/// ```no_run
/// use shieldr::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directives()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    let _ = subscriber.try_init();
}

/// Warn-level logging captured by the test harness.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
