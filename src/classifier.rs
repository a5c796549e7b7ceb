//! Category classification from live group counters and the current zone

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::DebugSettings;
use crate::constants::{group, zones};
use crate::host::GroupSource;
use crate::types::Category;

/// One row of the zone reference table
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneRow {
    pub row_id: u32,
    #[serde(default)]
    pub intended_use: u32,
}

/// Zones that always count as alliance content, whatever the group size says
#[derive(Debug, Clone, Default)]
pub struct AllianceZones {
    ids: HashSet<u32>,
}

impl AllianceZones {
    /// Keep the rows whose intended use is an alliance-like purpose code
    pub fn from_rows<I: IntoIterator<Item = ZoneRow>>(rows: I) -> Self {
        let ids = rows
            .into_iter()
            .filter(|row| zones::ALLIANCE_LIKE_INTENDED_USE.contains(&row.intended_use))
            .map(|row| row.row_id)
            .collect();
        Self { ids }
    }

    /// Load the zone reference table (a JSON array of rows)
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read zone table from {:?}", path))?;
        let rows: Vec<ZoneRow> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse zone table from {:?}", path))?;
        let total = rows.len();
        let zones = Self::from_rows(rows);
        info!(rows = total, alliance_like = zones.len(), "Built alliance-like zone set");
        Ok(zones)
    }

    pub fn contains(&self, territory: u32) -> bool {
        self.ids.contains(&territory)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Maps runtime state to a [`Category`]. Holds no per-tick cache.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    zones: AllianceZones,
}

impl Classifier {
    pub fn new(zones: AllianceZones) -> Self {
        Self { zones }
    }

    pub fn is_alliance_like_zone(&self, territory: u32) -> bool {
        self.zones.contains(territory)
    }

    pub fn classify<S: GroupSource + ?Sized>(&self, source: &S, debug: &DebugSettings) -> Category {
        let state = source.group_state();
        let mut member_count = state.member_count;
        let mut alliance_flags = state.alliance_flags;

        if debug.force_party_size {
            member_count = u8::try_from(debug.party_size).unwrap_or(u8::MAX);
            if member_count > group::FORCED_ALLIANCE_THRESHOLD {
                alliance_flags = 1;
            }
        }

        if self.is_alliance_like_zone(source.territory()) {
            return Category::Alliance;
        }

        match member_count {
            n if n <= group::SOLO_MAX_MEMBERS => Category::Solo,
            n if n <= group::LIGHT_PARTY_MAX_MEMBERS => Category::LightParty,
            _ if alliance_flags != 0 => Category::Alliance,
            _ => Category::FullParty,
        }
    }

    /// Whether restricted ("only in duty") profiles are eligible right now
    pub fn special_context<S: GroupSource + ?Sized>(
        &self,
        source: &S,
        debug: &DebugSettings,
    ) -> bool {
        debug.force_in_duty || source.duty_conditions().in_duty()
    }
}
