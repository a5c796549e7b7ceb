//! Partial updates submitted by the edit surface
//!
//! The edit surface never mutates bundles directly; it sends a patch and the
//! engine applies it on the tick thread.

use serde::{Deserialize, Serialize};

use super::profile::{DebugSettings, SettingsBundle, replace};
use crate::types::{BattleEffect, HighlightColor, NameplateVisibility};

fn merge<T: PartialEq + Copy>(slot: &mut T, value: Option<T>) -> bool {
    value.is_some_and(|value| replace(slot, value))
}

/// Fields to overwrite in one bundle; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlePatch {
    pub effect_self: Option<BattleEffect>,
    pub effect_party: Option<BattleEffect>,
    pub effect_other: Option<BattleEffect>,
    pub nameplate_own: Option<NameplateVisibility>,
    pub nameplate_party: Option<NameplateVisibility>,
    pub nameplate_alliance: Option<NameplateVisibility>,
    pub nameplate_others: Option<NameplateVisibility>,
    pub nameplate_friends: Option<NameplateVisibility>,
    pub highlight_own: Option<HighlightColor>,
    pub highlight_party: Option<HighlightColor>,
    pub highlight_others: Option<HighlightColor>,
    pub only_in_duty: Option<bool>,
}

impl BundlePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to `bundle`, returning whether any stored value changed
    pub fn apply(&self, bundle: &mut SettingsBundle) -> bool {
        let mut changed = false;
        changed |= merge(&mut bundle.effect_self, self.effect_self);
        changed |= merge(&mut bundle.effect_party, self.effect_party);
        changed |= merge(&mut bundle.effect_other, self.effect_other);
        changed |= merge(&mut bundle.nameplate_own, self.nameplate_own);
        changed |= merge(&mut bundle.nameplate_party, self.nameplate_party);
        changed |= merge(&mut bundle.nameplate_alliance, self.nameplate_alliance);
        changed |= merge(&mut bundle.nameplate_others, self.nameplate_others);
        changed |= merge(&mut bundle.nameplate_friends, self.nameplate_friends);
        changed |= merge(&mut bundle.highlight_own, self.highlight_own);
        changed |= merge(&mut bundle.highlight_party, self.highlight_party);
        changed |= merge(&mut bundle.highlight_others, self.highlight_others);
        changed |= merge(&mut bundle.only_in_duty, self.only_in_duty);
        changed
    }
}

/// Changes to the debug overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugPatch {
    pub messages: Option<bool>,
    pub force_party_size: Option<bool>,
    /// Negative sizes are clamped to 0
    pub party_size: Option<i64>,
    pub force_in_duty: Option<bool>,
}

impl DebugPatch {
    pub fn apply(&self, debug: &mut DebugSettings) -> bool {
        let party_size = self
            .party_size
            .map(|size| u32::try_from(size.max(0)).unwrap_or(u32::MAX));

        let mut changed = false;
        changed |= merge(&mut debug.messages, self.messages);
        changed |= merge(&mut debug.force_party_size, self.force_party_size);
        changed |= merge(&mut debug.party_size, party_size);
        changed |= merge(&mut debug.force_in_duty, self.force_in_duty);
        changed
    }
}
