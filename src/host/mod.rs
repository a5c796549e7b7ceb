//! Capability ports onto the host application
//!
//! The engine never touches host state directly. It sees the host through
//! three small traits so the daemon can plug in the JSON snapshot host and
//! tests can plug in an in-memory fake.

mod file;
mod live;

#[cfg(test)]
pub mod fake;

pub use file::FileHost;
pub use live::{LiveSettings, LiveSnapshot};

use serde::{Deserialize, Serialize};

use crate::types::{HighlightColor, HighlightTarget};

/// Raw key/value access to the host's live configuration
pub trait SettingsSurface {
    /// `None` when the host has no value for `key`
    fn try_get(&self, key: &str) -> Option<u32>;
    fn set(&mut self, key: &str, value: u32);
}

/// Group counters as reported by the host's group manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupState {
    pub member_count: u8,
    pub alliance_flags: u8,
}

/// Host condition flags that make up the "bound by duty" special context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DutyConditions {
    pub bound_by_duty: bool,
    pub between_areas: bool,
    pub occupied_in_cutscene: bool,
}

impl DutyConditions {
    /// In a duty, and not in a loading screen or cutscene
    pub fn in_duty(&self) -> bool {
        self.bound_by_duty && !self.between_areas && !self.occupied_in_cutscene
    }
}

/// Read-only runtime signals used for classification
pub trait GroupSource {
    fn group_state(&self) -> GroupState;
    fn territory(&self) -> u32;
    fn duty_conditions(&self) -> DutyConditions;
}

/// Derived highlight overlays
pub trait HighlightSurface {
    fn clear_highlights(&mut self);
    fn set_highlight(&mut self, target: HighlightTarget, color: HighlightColor);
}

/// Everything the engine needs from the host
pub trait Host: SettingsSurface + GroupSource + HighlightSurface {}

impl<T: SettingsSurface + GroupSource + HighlightSurface> Host for T {}
