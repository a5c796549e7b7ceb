//! JSON snapshot host for the standalone daemon
//!
//! The game-side bridge writes the host's live state into a JSON file; the
//! daemon re-reads it at the start of every tick and writes back the settings
//! and highlights it changed at the end of the tick.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{DutyConditions, GroupSource, GroupState, HighlightSurface, SettingsSurface};
use crate::types::{HighlightColor, HighlightTarget};

/// Highlight colors currently requested from the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightState {
    pub own: HighlightColor,
    pub party: HighlightColor,
    pub others: HighlightColor,
}

/// On-disk layout of the host state file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSnapshot {
    /// Host option name -> raw value
    pub settings: BTreeMap<String, u32>,
    pub group: GroupState,
    pub territory: u32,
    pub conditions: DutyConditions,
    pub highlights: HighlightState,
}

pub struct FileHost {
    path: PathBuf,
    snapshot: HostSnapshot,
    /// Settings written since the last flush
    pending_settings: BTreeMap<String, u32>,
    /// Highlights changed since the last flush
    pending_highlights: bool,
}

impl FileHost {
    /// Open the snapshot at `path`; a missing file starts from an empty snapshot
    pub fn open(path: PathBuf) -> Self {
        let mut host = Self {
            path,
            snapshot: HostSnapshot::default(),
            pending_settings: BTreeMap::new(),
            pending_highlights: false,
        };
        if host.refresh() {
            info!(
                path = %host.path.display(),
                settings = host.snapshot.settings.len(),
                "Loaded host snapshot"
            );
        } else {
            warn!(path = %host.path.display(), "Host snapshot not readable yet, starting empty");
        }
        host
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn has_pending(&self) -> bool {
        !self.pending_settings.is_empty() || self.pending_highlights
    }

    fn read_file(&self) -> Result<Option<HostSnapshot>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read host snapshot {:?}", self.path));
            }
        };
        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse host snapshot {:?}", self.path))?;
        Ok(Some(snapshot))
    }

    /// Lay the unflushed writes over `base`
    fn overlay_pending(&self, base: &mut HostSnapshot) {
        for (key, value) in &self.pending_settings {
            base.settings.insert(key.clone(), *value);
        }
        if self.pending_highlights {
            base.highlights = self.snapshot.highlights;
        }
    }

    /// Re-read the snapshot, keeping unflushed writes on top. Returns false and
    /// keeps the previous snapshot when the file is missing or malformed.
    pub fn refresh(&mut self) -> bool {
        match self.read_file() {
            Ok(Some(mut snapshot)) => {
                self.overlay_pending(&mut snapshot);
                self.snapshot = snapshot;
                true
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "Host snapshot missing");
                false
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = ?e, "Host snapshot refresh failed");
                false
            }
        }
    }

    /// Merge the settings and highlights written since the last flush into the
    /// file's current contents. Everything else in the file is left as the
    /// bridge last wrote it. On error the writes stay pending.
    pub fn flush(&mut self) -> Result<()> {
        if !self.has_pending() {
            return Ok(());
        }

        let mut merged = self.read_file()?.unwrap_or_default();
        self.overlay_pending(&mut merged);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create host state directory {:?}", parent)
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&merged)
            .context("Failed to serialize host snapshot")?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json)
            .with_context(|| format!("Failed to write host snapshot to {:?}", staging))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("Failed to replace host snapshot {:?}", self.path))?;

        debug!(
            path = %self.path.display(),
            settings = self.pending_settings.len(),
            highlights = self.pending_highlights,
            "Flushed host snapshot"
        );
        self.snapshot = merged;
        self.pending_settings.clear();
        self.pending_highlights = false;
        Ok(())
    }
}

impl SettingsSurface for FileHost {
    fn try_get(&self, key: &str) -> Option<u32> {
        self.snapshot.settings.get(key).copied()
    }

    fn set(&mut self, key: &str, value: u32) {
        self.snapshot.settings.insert(key.to_string(), value);
        self.pending_settings.insert(key.to_string(), value);
    }
}

impl GroupSource for FileHost {
    fn group_state(&self) -> GroupState {
        self.snapshot.group
    }

    fn territory(&self) -> u32 {
        self.snapshot.territory
    }

    fn duty_conditions(&self) -> DutyConditions {
        self.snapshot.conditions
    }
}

impl HighlightSurface for FileHost {
    fn clear_highlights(&mut self) {
        self.snapshot.highlights = HighlightState::default();
        self.pending_highlights = true;
    }

    fn set_highlight(&mut self, target: HighlightTarget, color: HighlightColor) {
        let slot = match target {
            HighlightTarget::Own => &mut self.snapshot.highlights.own,
            HighlightTarget::Party => &mut self.snapshot.highlights.party,
            HighlightTarget::Others => &mut self.snapshot.highlights.others,
        };
        *slot = color;
        self.pending_highlights = true;
    }
}
