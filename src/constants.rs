//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Group size thresholds used by the category classifier
pub mod group {
    /// Largest member count still treated as a solo player
    pub const SOLO_MAX_MEMBERS: u8 = 1;

    /// Largest member count still treated as a light (4-man) party
    pub const LIGHT_PARTY_MAX_MEMBERS: u8 = 4;

    /// A forced member count above this implies an alliance
    pub const FORCED_ALLIANCE_THRESHOLD: u8 = 8;
}

/// Zone reference table constants
pub mod zones {
    /// Territory intended-use codes for alliance-like duties
    pub const ALLIANCE_LIKE_INTENDED_USE: [u32; 2] = [41, 48];
}

/// Configuration file constants
pub mod config {
    /// Directory under the user config dir
    pub const APP_DIR: &str = "clarity-in-chaos";

    /// Persisted configuration file name
    pub const FILENAME: &str = "config.json";

    /// Current schema version of the persisted configuration
    pub const SCHEMA_VERSION: u32 = 0;
}

/// IPC constants
pub mod ipc {
    /// Socket path relative to the runtime (or cache) directory
    pub const SOCKET_RELATIVE_PATH: &str = "clarity-in-chaos/control.sock";

    /// Maximum message size (1 MB)
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

    /// How long a connected client may stay silent before it is dropped
    pub const CLIENT_READ_TIMEOUT_MS: u64 = 2000;
}

/// Daemon loop constants
pub mod daemon {
    /// Default delay between two engine ticks
    pub const DEFAULT_TICK_MS: u64 = 100;
}
