//! Store configuration.

use std::time::Duration;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the engine bucket backing the store.
    pub bucket: String,

    /// Whether to base64-encode each key segment in the flat namespace.
    ///
    /// Required for segments whose text contains the flat separator (`.`),
    /// such as dotted IP addresses; without it such segments do not survive
    /// the round trip through the flat namespace.
    pub encode_keys: bool,

    /// How long a new watch suppresses updates before forwarding.
    ///
    /// The engine replays current values when a subscription is
    /// established; updates arriving within this window are treated as that
    /// replay and discarded.
    pub replay_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: "kvstore".to_string(),
            encode_keys: false,
            replay_window: Duration::from_millis(500),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bucket name.
    #[must_use]
    pub fn bucket(mut self, name: impl Into<String>) -> Self {
        self.bucket = name.into();
        self
    }

    /// Sets whether key segments are base64-encoded.
    #[must_use]
    pub const fn encode_keys(mut self, value: bool) -> Self {
        self.encode_keys = value;
        self
    }

    /// Sets the watch replay-suppression window.
    #[must_use]
    pub const fn replay_window(mut self, window: Duration) -> Self {
        self.replay_window = window;
        self
    }
}
