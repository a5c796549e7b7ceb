//! Typed accessor over the raw settings surface

use serde::{Deserialize, Serialize};

use super::SettingsSurface;
use crate::types::{SettingField, SettingValue};

/// Typed get/set for each tracked setting.
///
/// Nothing is cached: every read goes to the surface, so a value the user changed
/// through the host UI is visible on the next call.
pub trait LiveSettings: SettingsSurface {
    /// Current value, `None` on a missing or out-of-range read
    fn read(&self, field: SettingField) -> Option<SettingValue> {
        self.try_get(field.key()).and_then(|raw| field.decode(raw))
    }

    fn write(&mut self, field: SettingField, value: SettingValue) {
        self.set(field.key(), value.raw());
    }

    /// Tracked settings the surface cannot report right now
    fn unreadable(&self) -> Vec<SettingField> {
        SettingField::ALL
            .into_iter()
            .filter(|&field| self.read(field).is_none())
            .collect()
    }

    fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            values: SettingField::ALL
                .iter()
                .map(|&field| (field, self.read(field)))
                .collect(),
        }
    }
}

impl<T: SettingsSurface + ?Sized> LiveSettings for T {}

/// Point-in-time copy of all tracked live settings (for status reports)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub values: Vec<(SettingField, Option<SettingValue>)>,
}
