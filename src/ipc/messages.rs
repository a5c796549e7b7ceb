//! IPC message types for edit surface ↔ daemon communication

use serde::{Deserialize, Serialize};

use crate::config::{BundlePatch, Configuration, DebugPatch};
use crate::engine::StatusReport;
use crate::types::Category;

/// Requests sent from the edit surface to the daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ControlRequest {
    /// Health check
    Ping,

    /// Current category, active profile and live values
    Status,

    /// Full persisted configuration
    GetConfig,

    /// Flip the master enable
    SetEnabled(bool),

    /// Toggle the edit surface visibility flag
    ToggleVisible,

    /// Edit one profile. `active` tells the daemon the edited profile is the
    /// one governing the live settings, so it is pushed right away.
    UpdateProfile {
        category: Category,
        patch: BundlePatch,
        active: bool,
    },

    /// Change the debug overrides
    UpdateDebug(DebugPatch),
}

/// Responses sent from the daemon to the edit surface
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ControlResponse {
    /// Health check response
    Pong,

    Status(StatusReport),

    Config(Configuration),

    /// Whether the request changed any stored value
    Updated { changed: bool },

    /// New visibility after a toggle
    Visible(bool),

    /// Error occurred
    Error(String),
}
