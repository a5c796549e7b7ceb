//! CLI argument parsing for Clarity In Chaos.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{BundlePatch, DebugPatch};
use crate::constants::daemon::DEFAULT_TICK_MS;
use crate::types::{BattleEffect, Category, HighlightColor, NameplateVisibility};

#[derive(Parser)]
#[command(
    name = "clarity-in-chaos",
    about = "Swap battle effect and nameplate settings to match your party size",
    version
)]
pub struct Cli {
    /// Path to the daemon control socket
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the reconciliation daemon in the foreground
    Run {
        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON snapshot of the host's live settings and group state
        #[arg(long)]
        host_state: PathBuf,

        /// Zone reference table (JSON rows of row_id/intended_use)
        #[arg(long)]
        zones: Option<PathBuf>,

        /// Milliseconds between two ticks
        #[arg(long, default_value_t = DEFAULT_TICK_MS)]
        tick_ms: u64,
    },

    /// Show current category, active profile and live values
    Status,

    /// Turn automatic switching on
    Enable,

    /// Turn automatic switching off and restore the backup settings
    Disable,

    /// Toggle the settings window flag
    ToggleWindow,

    /// Show one stored profile
    Show {
        category: Category,
    },

    /// Edit one stored profile
    Set(SetArgs),

    /// Debug overrides
    Debug(DebugArgs),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Profile to edit
    pub category: Category,

    /// Own battle effects
    #[arg(long = "self")]
    pub effect_self: Option<BattleEffect>,

    /// Party battle effects
    #[arg(long = "party")]
    pub effect_party: Option<BattleEffect>,

    /// Everyone else's battle effects
    #[arg(long = "other")]
    pub effect_other: Option<BattleEffect>,

    #[arg(long = "own-nameplate")]
    pub nameplate_own: Option<NameplateVisibility>,

    #[arg(long = "party-nameplate")]
    pub nameplate_party: Option<NameplateVisibility>,

    #[arg(long = "alliance-nameplate")]
    pub nameplate_alliance: Option<NameplateVisibility>,

    #[arg(long = "others-nameplate")]
    pub nameplate_others: Option<NameplateVisibility>,

    #[arg(long = "friends-nameplate")]
    pub nameplate_friends: Option<NameplateVisibility>,

    #[arg(long = "own-highlight")]
    pub highlight_own: Option<HighlightColor>,

    #[arg(long = "party-highlight")]
    pub highlight_party: Option<HighlightColor>,

    #[arg(long = "others-highlight")]
    pub highlight_others: Option<HighlightColor>,

    /// Only use this profile inside duties
    #[arg(long)]
    pub only_in_duty: Option<bool>,

    /// Push the profile to the live settings right away
    #[arg(long)]
    pub apply: bool,
}

impl SetArgs {
    pub fn patch(&self) -> BundlePatch {
        BundlePatch {
            effect_self: self.effect_self,
            effect_party: self.effect_party,
            effect_other: self.effect_other,
            nameplate_own: self.nameplate_own,
            nameplate_party: self.nameplate_party,
            nameplate_alliance: self.nameplate_alliance,
            nameplate_others: self.nameplate_others,
            nameplate_friends: self.nameplate_friends,
            highlight_own: self.highlight_own,
            highlight_party: self.highlight_party,
            highlight_others: self.highlight_others,
            only_in_duty: self.only_in_duty,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct DebugArgs {
    /// Pretend the group has N members
    #[arg(long, allow_negative_numbers = true, conflicts_with = "no_force_size")]
    pub force_size: Option<i64>,

    /// Go back to the real member count
    #[arg(long)]
    pub no_force_size: bool,

    /// Pretend to be inside a duty
    #[arg(long)]
    pub force_duty: Option<bool>,

    /// Log profile changes at info level
    #[arg(long)]
    pub messages: Option<bool>,
}

impl DebugArgs {
    pub fn patch(&self) -> DebugPatch {
        let force_party_size = match (self.force_size, self.no_force_size) {
            (Some(_), _) => Some(true),
            (None, true) => Some(false),
            (None, false) => None,
        };
        DebugPatch {
            messages: self.messages,
            force_party_size,
            party_size: self.force_size,
            force_in_duty: self.force_duty,
        }
    }
}
