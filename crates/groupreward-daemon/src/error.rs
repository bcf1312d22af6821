//! Error types for the daemon binary.
//!
//! [`DaemonError`] is the top-level error type that wraps all possible
//! failure modes during startup and shutdown.

/// Top-level error for the daemon binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: groupreward_core::ConfigError,
    },

    /// The HTTP client for the member list could not be built.
    #[error("fetcher error: {source}")]
    Fetcher {
        /// The underlying fetch error.
        #[from]
        source: groupreward_core::FetchError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: groupreward_observer::ServerError,
    },

    /// Installing the shutdown signal handler failed.
    #[error("signal error: {0}")]
    Signal(std::io::Error),

    /// A background task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}
