use thiserror::Error;

/// Failures raised by a `BrowserPage` implementation.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Driver process failed to spawn
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the driver process failed
    #[error("Browser session I/O error: {0}")]
    SessionIO(String),

    /// Driver answered a command with `ok: false`
    #[error("Browser command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    /// Session was already closed
    #[error("Browser session is closed")]
    Closed,

    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Element '{selector}' not found")]
    ElementNotFound { selector: String },

    /// Handle refers to an element from a previous document
    #[error("Element handle {handle} is stale")]
    StaleElement { handle: u64 },

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl BrowserError {
    /// Whether the browser process itself is gone. Everything else is
    /// recoverable at page or element level.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BrowserError::SubprocessSpawn { .. } | BrowserError::SessionIO(_) | BrowserError::Closed
        )
    }
}

/// Cycle-level failures.
#[derive(Debug, Error)]
pub enum TestFoxError {
    #[error("App runner failed to start the application: {0}")]
    AppStart(String),

    #[error("Application at {url} was not reachable after {waited_ms}ms")]
    AppNotReady { url: String, waited_ms: u128 },

    #[error("Browser failed to launch: {0}")]
    BrowserLaunch(#[source] BrowserError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to install signal handler: {0}")]
    SignalSetup(String),
}
