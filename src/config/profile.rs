//! Per-category settings profiles and the persisted configuration root
//!
//! One [`SettingsBundle`] exists for every [`Category`]. The bundles live in a
//! fixed lookup table ([`Profiles`]) owned by the [`Configuration`] root, which
//! is serialized to JSON as a whole.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants;
use crate::host::{LiveSettings, SettingsSurface};
use crate::types::{
    BattleEffect, Category, HighlightColor, HighlightTarget, NameplateVisibility, SettingField,
    SettingValue,
};

/// Overwrite `slot` with `value`, reporting whether anything changed
pub(crate) fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Display settings for one category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsBundle {
    /// Slot this bundle belongs to (re-stamped on load)
    pub category: Category,

    // Battle effects
    pub effect_self: BattleEffect,
    pub effect_party: BattleEffect,
    pub effect_other: BattleEffect,

    // Nameplates
    pub nameplate_own: NameplateVisibility,
    pub nameplate_party: NameplateVisibility,
    pub nameplate_alliance: NameplateVisibility,
    pub nameplate_others: NameplateVisibility,
    pub nameplate_friends: NameplateVisibility,

    // Highlights (derived side effects, not live settings)
    pub highlight_own: HighlightColor,
    pub highlight_party: HighlightColor,
    pub highlight_others: HighlightColor,

    /// Only eligible while bound by duty; ignored for `Backup`
    pub only_in_duty: bool,
}

impl SettingsBundle {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            ..Self::default()
        }
    }

    /// Copy the current live values; fields the host cannot report keep their defaults
    pub fn seeded_from<S: SettingsSurface + ?Sized>(category: Category, live: &S) -> Self {
        let mut bundle = Self::new(category);
        for field in SettingField::ALL {
            if let Some(value) = live.read(field) {
                bundle.set(field, value);
            }
        }
        bundle
    }

    pub fn get(&self, field: SettingField) -> SettingValue {
        match field {
            SettingField::EffectSelf => SettingValue::Effect(self.effect_self),
            SettingField::EffectParty => SettingValue::Effect(self.effect_party),
            SettingField::EffectOther => SettingValue::Effect(self.effect_other),
            SettingField::NameplateOwn => SettingValue::Nameplate(self.nameplate_own),
            SettingField::NameplateParty => SettingValue::Nameplate(self.nameplate_party),
            SettingField::NameplateAlliance => SettingValue::Nameplate(self.nameplate_alliance),
            SettingField::NameplateOthers => SettingValue::Nameplate(self.nameplate_others),
            SettingField::NameplateFriends => SettingValue::Nameplate(self.nameplate_friends),
        }
    }

    /// Store `value` for `field`. A value of the wrong kind is ignored.
    pub fn set(&mut self, field: SettingField, value: SettingValue) -> bool {
        match (field, value) {
            (SettingField::EffectSelf, SettingValue::Effect(v)) => {
                replace(&mut self.effect_self, v)
            }
            (SettingField::EffectParty, SettingValue::Effect(v)) => {
                replace(&mut self.effect_party, v)
            }
            (SettingField::EffectOther, SettingValue::Effect(v)) => {
                replace(&mut self.effect_other, v)
            }
            (SettingField::NameplateOwn, SettingValue::Nameplate(v)) => {
                replace(&mut self.nameplate_own, v)
            }
            (SettingField::NameplateParty, SettingValue::Nameplate(v)) => {
                replace(&mut self.nameplate_party, v)
            }
            (SettingField::NameplateAlliance, SettingValue::Nameplate(v)) => {
                replace(&mut self.nameplate_alliance, v)
            }
            (SettingField::NameplateOthers, SettingValue::Nameplate(v)) => {
                replace(&mut self.nameplate_others, v)
            }
            (SettingField::NameplateFriends, SettingValue::Nameplate(v)) => {
                replace(&mut self.nameplate_friends, v)
            }
            _ => {
                warn!(field = ?field, value = ?value, "Ignoring value of the wrong kind");
                false
            }
        }
    }

    pub fn highlight(&self, target: HighlightTarget) -> HighlightColor {
        match target {
            HighlightTarget::Own => self.highlight_own,
            HighlightTarget::Party => self.highlight_party,
            HighlightTarget::Others => self.highlight_others,
        }
    }

    /// `only_in_duty`, except that `Backup` is never restricted
    pub fn restricted(&self) -> bool {
        self.only_in_duty && self.category != Category::Backup
    }
}

/// Lookup table with exactly one bundle per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profiles {
    pub backup: SettingsBundle,
    pub solo: SettingsBundle,
    pub light_party: SettingsBundle,
    pub full_party: SettingsBundle,
    pub alliance: SettingsBundle,
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            backup: SettingsBundle::new(Category::Backup),
            solo: SettingsBundle::new(Category::Solo),
            light_party: SettingsBundle::new(Category::LightParty),
            full_party: SettingsBundle::new(Category::FullParty),
            alliance: SettingsBundle::new(Category::Alliance),
        }
    }
}

impl Profiles {
    /// Every bundle seeded with the same live values
    pub fn seeded_from<S: SettingsSurface + ?Sized>(live: &S) -> Self {
        let template = SettingsBundle::seeded_from(Category::Backup, live);
        let mut profiles = Self {
            backup: template.clone(),
            solo: template.clone(),
            light_party: template.clone(),
            full_party: template.clone(),
            alliance: template,
        };
        profiles.normalize();
        profiles
    }

    pub fn get(&self, category: Category) -> &SettingsBundle {
        match category {
            Category::Backup => &self.backup,
            Category::Solo => &self.solo,
            Category::LightParty => &self.light_party,
            Category::FullParty => &self.full_party,
            Category::Alliance => &self.alliance,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut SettingsBundle {
        match category {
            Category::Backup => &mut self.backup,
            Category::Solo => &mut self.solo,
            Category::LightParty => &mut self.light_party,
            Category::FullParty => &mut self.full_party,
            Category::Alliance => &mut self.alliance,
        }
    }

    /// Category whose bundle governs `category` right now.
    ///
    /// Inside the special context the bundle applies as stored. Outside it, a
    /// restricted bundle defers to the next lower category until an unrestricted
    /// one (at the latest `Backup`) is found.
    pub fn resolve_category(&self, category: Category, special_context: bool) -> Category {
        if special_context {
            return category;
        }

        let mut current = category;
        while self.get(current).restricted() {
            match current.lower() {
                Some(lower) => current = lower,
                None => break,
            }
        }
        current
    }

    pub fn resolve(&self, category: Category, special_context: bool) -> &SettingsBundle {
        self.get(self.resolve_category(category, special_context))
    }

    /// Re-stamp each bundle's category from its slot
    pub fn normalize(&mut self) {
        for category in Category::ALL {
            self.get_mut(category).category = category;
        }
    }
}

/// Testing aids: force a group size or the duty flag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    /// Log engine changes at info instead of debug
    pub messages: bool,
    pub force_party_size: bool,
    pub party_size: u32,
    pub force_in_duty: bool,
}

/// Persisted configuration root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub version: u32,
    /// Master enable
    pub enabled: bool,
    /// Whether the edit surface should be shown
    pub visible: bool,
    pub profiles: Profiles,
    pub debug: DebugSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            version: constants::config::SCHEMA_VERSION,
            enabled: true,
            visible: true,
            profiles: Profiles::default(),
            debug: DebugSettings::default(),
        }
    }
}

impl Configuration {
    /// Fresh configuration whose bundles all mirror the current live settings,
    /// so a new install changes nothing until the user customizes a profile
    pub fn seeded_from<S: SettingsSurface + ?Sized>(live: &S) -> Self {
        Self {
            profiles: Profiles::seeded_from(live),
            ..Self::default()
        }
    }

    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::FILENAME);
        path
    }

    /// Load from `path`; `Ok(None)` when no file exists
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let mut config: Configuration = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;

        if config.version > constants::config::SCHEMA_VERSION {
            warn!(
                found = config.version,
                supported = constants::config::SCHEMA_VERSION,
                "Config was written by a newer version"
            );
        }
        config.profiles.normalize();

        info!(path = %path.display(), enabled = config.enabled, "Loaded config");
        Ok(Some(config))
    }

    /// Load from `path`, or seed a fresh configuration from the live settings and save it.
    ///
    /// Seeding fails without touching disk unless every tracked setting is readable.
    pub fn load_or_seed<S: SettingsSurface + ?Sized>(path: &Path, live: &S) -> Result<Self> {
        if let Some(config) = Self::load(path)? {
            return Ok(config);
        }

        // a partial read would bake enum defaults into Backup for good
        let unreadable = live.unreadable();
        if !unreadable.is_empty() {
            bail!(
                "Cannot seed config from live settings, unreadable: {:?}",
                unreadable
            );
        }

        info!(path = %path.display(), "Config file not found, seeding profiles from live settings");
        let config = Self::seeded_from(live);
        config.save_to(path)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;
    use tempfile::TempDir;

    // Profiles where each category has a distinct battle effect on self
    fn distinct_profiles() -> Profiles {
        let mut profiles = Profiles::default();
        profiles.solo.effect_self = BattleEffect::Limited;
        profiles.light_party.effect_self = BattleEffect::None;
        profiles.full_party.nameplate_own = NameplateVisibility::Never;
        profiles.alliance.nameplate_own = NameplateVisibility::OutOfBattle;
        profiles
    }

    #[test]
    fn test_resolve_in_duty_returns_stored_bundle() {
        let mut profiles = distinct_profiles();
        for category in Category::ALL {
            profiles.get_mut(category).only_in_duty = true;
        }

        for category in Category::ALL {
            assert_eq!(profiles.resolve(category, true), profiles.get(category));
            assert_eq!(profiles.resolve_category(category, true), category);
        }
    }

    #[test]
    fn test_resolve_unrestricted_returns_same_bundle() {
        let profiles = distinct_profiles();
        for category in Category::ALL {
            assert_eq!(profiles.resolve_category(category, false), category);
        }
    }

    #[test]
    fn test_resolve_restricted_falls_back_one_step() {
        let mut profiles = distinct_profiles();
        profiles.light_party.only_in_duty = true;

        assert_eq!(profiles.resolve_category(Category::LightParty, false), Category::Solo);
        assert_eq!(
            profiles.resolve(Category::LightParty, false).effect_self,
            BattleEffect::Limited
        );
    }

    #[test]
    fn test_resolve_cascades_to_backup() {
        let mut profiles = distinct_profiles();
        profiles.alliance.only_in_duty = true;
        profiles.full_party.only_in_duty = true;
        profiles.light_party.only_in_duty = true;
        profiles.solo.only_in_duty = true;

        assert_eq!(profiles.resolve_category(Category::Alliance, false), Category::Backup);
        assert_eq!(profiles.resolve_category(Category::Solo, false), Category::Backup);
    }

    #[test]
    fn test_resolve_skips_only_restricted_links() {
        let mut profiles = distinct_profiles();
        profiles.alliance.only_in_duty = true;
        profiles.full_party.only_in_duty = true;

        assert_eq!(profiles.resolve_category(Category::Alliance, false), Category::LightParty);
        assert_eq!(profiles.resolve_category(Category::FullParty, false), Category::LightParty);
    }

    #[test]
    fn test_backup_flag_is_ignored() {
        let mut profiles = distinct_profiles();
        profiles.backup.only_in_duty = true;
        profiles.solo.only_in_duty = true;

        assert!(!profiles.backup.restricted());
        assert_eq!(profiles.resolve_category(Category::Backup, false), Category::Backup);
        assert_eq!(profiles.resolve_category(Category::Solo, false), Category::Backup);
    }

    #[test]
    fn test_bundle_set_reports_changes() {
        let mut bundle = SettingsBundle::new(Category::Solo);
        let value = SettingValue::Effect(BattleEffect::Limited);

        assert!(bundle.set(SettingField::EffectParty, value));
        assert!(!bundle.set(SettingField::EffectParty, value));
        assert_eq!(bundle.get(SettingField::EffectParty), value);

        // wrong kind for the field
        assert!(!bundle.set(
            SettingField::EffectParty,
            SettingValue::Nameplate(NameplateVisibility::Never)
        ));
        assert_eq!(bundle.get(SettingField::EffectParty), value);
    }

    #[test]
    fn test_seeded_from_live_settings() {
        let mut host = FakeHost::uniform(BattleEffect::Limited, NameplateVisibility::WhenTargeted);
        host.settings.remove("NamePlateDispTypeFriend");

        let config = Configuration::seeded_from(&host);
        for category in Category::ALL {
            let bundle = config.profiles.get(category);
            assert_eq!(bundle.category, category);
            assert_eq!(bundle.effect_other, BattleEffect::Limited);
            assert_eq!(bundle.nameplate_alliance, NameplateVisibility::WhenTargeted);
            // missing read keeps the enumeration default
            assert_eq!(bundle.nameplate_friends, NameplateVisibility::Always);
        }
        assert!(config.enabled);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Configuration::default();
        config.profiles = distinct_profiles();
        config.profiles.full_party.only_in_duty = true;
        config.debug.party_size = 6;
        config.save_to(&path).unwrap();

        let loaded = Configuration::load(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(Configuration::load(&dir.path().join("config.json")).unwrap().is_none());
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ enabled: ").unwrap();
        assert!(Configuration::load(&path).is_err());
    }

    #[test]
    fn test_load_fills_defaults_and_restamps_categories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"enabled":false,"profiles":{"solo":{"category":"Alliance","effect_self":"None"}}}"#,
        )
        .unwrap();

        let loaded = Configuration::load(&path).unwrap().unwrap();
        assert!(!loaded.enabled);
        assert!(loaded.visible);
        assert_eq!(loaded.profiles.solo.category, Category::Solo);
        assert_eq!(loaded.profiles.solo.effect_self, BattleEffect::None);
        assert_eq!(loaded.profiles.alliance.category, Category::Alliance);
    }

    #[test]
    fn test_load_or_seed_writes_fresh_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let host = FakeHost::uniform(BattleEffect::None, NameplateVisibility::Never);

        let config = Configuration::load_or_seed(&path, &host).unwrap();
        assert!(path.exists());
        assert_eq!(config.profiles.backup.effect_party, BattleEffect::None);

        // second call loads instead of re-seeding
        let other = FakeHost::uniform(BattleEffect::All, NameplateVisibility::Always);
        let again = Configuration::load_or_seed(&path, &other).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_load_or_seed_refuses_incomplete_live_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        assert!(Configuration::load_or_seed(&path, &FakeHost::default()).is_err());
        assert!(!path.exists());

        let mut host = FakeHost::uniform(BattleEffect::None, NameplateVisibility::Never);
        host.settings.remove("BattleEffectOther");
        assert!(Configuration::load_or_seed(&path, &host).is_err());
        assert!(!path.exists());
    }
}
