//! In-memory host used by unit tests

use std::collections::HashMap;

use super::{DutyConditions, GroupSource, GroupState, HighlightSurface, SettingsSurface};
use crate::types::{
    BattleEffect, HighlightColor, HighlightTarget, NameplateVisibility, SettingField, SettingValue,
};

/// Records every write the engine makes so tests can assert on redundancy
#[derive(Debug, Default)]
pub struct FakeHost {
    pub settings: HashMap<String, u32>,
    pub group: GroupState,
    pub territory: u32,
    pub conditions: DutyConditions,
    pub highlights: HashMap<HighlightTarget, HighlightColor>,
    pub writes: Vec<(String, u32)>,
    pub highlight_clears: usize,
    pub highlight_sets: usize,
}

impl FakeHost {
    /// Every battle effect and every nameplate set to the same value
    pub fn uniform(effect: BattleEffect, nameplate: NameplateVisibility) -> Self {
        let mut host = Self::default();
        host.group.member_count = 1;
        for field in SettingField::ALL {
            let raw = match field.decode(0) {
                Some(SettingValue::Effect(_)) => effect.raw(),
                _ => nameplate.raw(),
            };
            host.settings.insert(field.key().to_string(), raw);
        }
        host
    }

    /// Simulate the user changing a setting through the host UI (not recorded as a write)
    pub fn user_edit(&mut self, field: SettingField, value: SettingValue) {
        self.settings.insert(field.key().to_string(), value.raw());
    }

    pub fn value(&self, field: SettingField) -> Option<SettingValue> {
        self.settings
            .get(field.key())
            .and_then(|&raw| field.decode(raw))
    }

    pub fn take_writes(&mut self) -> Vec<(String, u32)> {
        std::mem::take(&mut self.writes)
    }
}

impl SettingsSurface for FakeHost {
    fn try_get(&self, key: &str) -> Option<u32> {
        self.settings.get(key).copied()
    }

    fn set(&mut self, key: &str, value: u32) {
        self.settings.insert(key.to_string(), value);
        self.writes.push((key.to_string(), value));
    }
}

impl GroupSource for FakeHost {
    fn group_state(&self) -> GroupState {
        self.group
    }

    fn territory(&self) -> u32 {
        self.territory
    }

    fn duty_conditions(&self) -> DutyConditions {
        self.conditions
    }
}

impl HighlightSurface for FakeHost {
    fn clear_highlights(&mut self) {
        self.highlights.clear();
        self.highlight_clears += 1;
    }

    fn set_highlight(&mut self, target: HighlightTarget, color: HighlightColor) {
        self.highlights.insert(target, color);
        self.highlight_sets += 1;
    }
}
