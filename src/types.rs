//! Shared enumerations for group categories and tracked display settings

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete group context. `Backup` is the sentinel holding the user's original settings.
///
/// The declaration order is the fallback order: a restricted profile defers to the
/// next lower variant, and `Backup` is the floor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
)]
pub enum Category {
    #[default]
    Backup,
    Solo,
    LightParty,
    FullParty,
    Alliance,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Backup,
        Category::Solo,
        Category::LightParty,
        Category::FullParty,
        Category::Alliance,
    ];

    /// Next broader fallback, `None` for `Backup`
    pub fn lower(self) -> Option<Category> {
        match self {
            Category::Backup => None,
            Category::Solo => Some(Category::Backup),
            Category::LightParty => Some(Category::Solo),
            Category::FullParty => Some(Category::LightParty),
            Category::Alliance => Some(Category::FullParty),
        }
    }

    /// Human readable heading used by the edit surface
    pub fn label(self) -> &'static str {
        match self {
            Category::Backup => "Backup",
            Category::Solo => "Solo",
            Category::LightParty => "Light Party (4-man)",
            Category::FullParty => "Full Party (8-man)",
            Category::Alliance => "Alliance (24-man)",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Battle effect visibility (host raw values 0..=2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum BattleEffect {
    #[default]
    All,
    Limited,
    None,
}

impl BattleEffect {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::All),
            1 => Some(Self::Limited),
            2 => Some(Self::None),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// Nameplate display mode (host raw values 0..=4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum NameplateVisibility {
    #[default]
    Always,
    DuringBattle,
    WhenTargeted,
    Never,
    OutOfBattle,
}

impl NameplateVisibility {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Always),
            1 => Some(Self::DuringBattle),
            2 => Some(Self::WhenTargeted),
            3 => Some(Self::Never),
            4 => Some(Self::OutOfBattle),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// Object highlight color applied as a derived side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum HighlightColor {
    #[default]
    None,
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Magenta,
    Black,
}

/// Which set of entities a highlight color applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighlightTarget {
    Own,
    Party,
    Others,
}

impl HighlightTarget {
    pub const ALL: [HighlightTarget; 3] = [
        HighlightTarget::Own,
        HighlightTarget::Party,
        HighlightTarget::Others,
    ];
}

/// One tracked setting on the host's live configuration surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingField {
    EffectSelf,
    EffectParty,
    EffectOther,
    NameplateOwn,
    NameplateParty,
    NameplateAlliance,
    NameplateOthers,
    NameplateFriends,
}

impl SettingField {
    pub const ALL: [SettingField; 8] = [
        SettingField::EffectSelf,
        SettingField::EffectParty,
        SettingField::EffectOther,
        SettingField::NameplateOwn,
        SettingField::NameplateParty,
        SettingField::NameplateAlliance,
        SettingField::NameplateOthers,
        SettingField::NameplateFriends,
    ];

    /// Option name on the host configuration surface
    pub fn key(self) -> &'static str {
        match self {
            SettingField::EffectSelf => "BattleEffectSelf",
            SettingField::EffectParty => "BattleEffectParty",
            SettingField::EffectOther => "BattleEffectOther",
            SettingField::NameplateOwn => "NamePlateDispTypeSelf",
            SettingField::NameplateParty => "NamePlateDispTypeParty",
            SettingField::NameplateAlliance => "NamePlateDispTypeAlliance",
            SettingField::NameplateOthers => "NamePlateDispTypeOther",
            SettingField::NameplateFriends => "NamePlateDispTypeFriend",
        }
    }

    /// Coerce a raw host value into this field's enumeration.
    /// Out-of-range values are treated like a missing read.
    pub fn decode(self, raw: u32) -> Option<SettingValue> {
        match self {
            SettingField::EffectSelf | SettingField::EffectParty | SettingField::EffectOther => {
                BattleEffect::from_raw(raw).map(SettingValue::Effect)
            }
            _ => NameplateVisibility::from_raw(raw).map(SettingValue::Nameplate),
        }
    }
}

/// A decoded value of one tracked setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingValue {
    Effect(BattleEffect),
    Nameplate(NameplateVisibility),
}

impl SettingValue {
    pub fn raw(self) -> u32 {
        match self {
            SettingValue::Effect(effect) => effect.raw(),
            SettingValue::Nameplate(nameplate) => nameplate.raw(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Effect(effect) => write!(f, "{effect:?}"),
            SettingValue::Nameplate(nameplate) => write!(f, "{nameplate:?}"),
        }
    }
}
