//! Reconciliation engine
//!
//! Once per tick the engine classifies the group, resolves the profile that
//! governs it and reconciles that profile with the host's live settings:
//!
//! - disabled, first tick after being enabled: push `Backup` (restore originals)
//! - disabled, steady: pull live values into `Backup`
//! - enabled, resolved profile changed since last tick: push the new profile
//! - enabled, same profile as last tick: pull live edits into that profile
//!
//! Pushes and pulls both diff field by field, so a tick with nothing to do
//! writes nothing to the host and saves nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::classifier::Classifier;
use crate::config::{BundlePatch, Configuration, DebugPatch, SettingsBundle};
use crate::host::{GroupSource, HighlightSurface, Host, LiveSettings, LiveSnapshot, SettingsSurface};
use crate::persistence::Persist;
use crate::types::{Category, HighlightColor, HighlightTarget, SettingField};

type HighlightPlan = [HighlightColor; 3];

fn highlight_plan(bundle: &SettingsBundle) -> HighlightPlan {
    HighlightTarget::ALL.map(|target| bundle.highlight(target))
}

/// Write every stored value that differs from the live one (or cannot be read).
/// Returns the number of writes.
fn push<S: SettingsSurface + ?Sized>(live: &mut S, bundle: &SettingsBundle) -> usize {
    let mut writes = 0;
    for field in SettingField::ALL {
        let stored = bundle.get(field);
        if live.read(field) != Some(stored) {
            live.write(field, stored);
            writes += 1;
        }
    }
    writes
}

/// Copy every readable live value that differs into the bundle.
/// Returns the number of fields changed.
fn pull<S: SettingsSurface + ?Sized>(live: &S, bundle: &mut SettingsBundle) -> usize {
    let mut changed = 0;
    for field in SettingField::ALL {
        if let Some(value) = live.read(field) {
            if bundle.set(field, value) {
                changed += 1;
            }
        }
    }
    changed
}

/// Read-only summary for the edit surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub enabled: bool,
    pub visible: bool,
    /// Classified group category
    pub category: Category,
    /// Profile currently governing the live settings
    pub active_profile: Category,
    pub alliance_like_zone: bool,
    pub in_duty: bool,
    pub live: LiveSnapshot,
    pub backup: SettingsBundle,
}

pub struct Engine<P: Persist> {
    config: Configuration,
    classifier: Classifier,
    persister: P,
    /// Profile pushed or pulled on the previous tick
    last_applied: Option<Category>,
    last_enabled: bool,
    last_highlights: Option<HighlightPlan>,
}

impl<P: Persist> Engine<P> {
    pub fn new(config: Configuration, classifier: Classifier, persister: P) -> Self {
        let last_enabled = config.enabled;
        Self {
            config,
            classifier,
            persister,
            last_applied: None,
            last_enabled,
            last_highlights: None,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    #[cfg(test)]
    pub fn persister(&self) -> &P {
        &self.persister
    }

    /// Category derived from the current group state
    pub fn current_category<G: GroupSource + ?Sized>(&self, host: &G) -> Category {
        self.classifier.classify(host, &self.config.debug)
    }

    pub fn special_context<G: GroupSource + ?Sized>(&self, host: &G) -> bool {
        self.classifier.special_context(host, &self.config.debug)
    }

    /// Profile that governs the live settings right now
    pub fn active_profile<G: GroupSource + ?Sized>(&self, host: &G) -> Category {
        if !self.config.enabled {
            return Category::Backup;
        }
        let category = self.current_category(host);
        self.config
            .profiles
            .resolve(category, self.special_context(host))
            .category
    }

    /// Per-tick entry point
    pub fn on_update<H: Host + ?Sized>(&mut self, host: &mut H) {
        let enabled = self.config.enabled;
        let was_enabled = std::mem::replace(&mut self.last_enabled, enabled);

        let (active, changed) = if !enabled {
            if was_enabled {
                let writes = push(host, &self.config.profiles.backup);
                self.notice(writes, "Restored backup settings after disable");
                (Category::Backup, writes > 0)
            } else {
                let changed = pull(&*host, &mut self.config.profiles.backup);
                if changed > 0 {
                    self.notice(changed, "Captured live edits into backup");
                    self.persist();
                }
                (Category::Backup, changed > 0)
            }
        } else {
            let active = self.active_profile(&*host);
            if self.last_applied != Some(active) {
                debug!(from = ?self.last_applied, to = ?active, "Active profile changed");
                let writes = push(host, self.config.profiles.get(active));
                self.notice(writes, "Applied profile settings");
                (active, writes > 0)
            } else {
                let changed = pull(&*host, self.config.profiles.get_mut(active));
                if changed > 0 {
                    self.notice(changed, "Captured live edits into active profile");
                    self.persist();
                }
                (active, changed > 0)
            }
        };

        self.sync_highlights(host, active, changed);
        self.last_applied = Some(active);
    }

    /// Push the profile that `category` resolves to right away, e.g. after the
    /// user edited the profile that currently governs the live settings
    pub fn apply_category<H: Host + ?Sized>(&mut self, host: &mut H, category: Category) {
        if !self.config.enabled && category != Category::Backup {
            debug!(category = ?category, "Master enable is off, not applying profile");
            return;
        }

        let active = if self.config.enabled {
            self.config
                .profiles
                .resolve(category, self.special_context(&*host))
                .category
        } else {
            Category::Backup
        };

        let writes = push(host, self.config.profiles.get(active));
        self.notice(writes, "Applied edited profile");
        self.sync_highlights(host, active, true);
        self.last_applied = Some(active);
    }

    /// Shutdown: put every tracked setting back to the backup values
    pub fn restore<H: Host + ?Sized>(&mut self, host: &mut H) {
        for field in SettingField::ALL {
            host.write(field, self.config.profiles.backup.get(field));
        }
        host.clear_highlights();
        self.last_highlights = None;
        self.last_applied = Some(Category::Backup);
        info!("Restored backup settings");
    }

    /// Apply an edit-surface patch to `category`'s stored bundle. When `active`
    /// is set the result is pushed to the live settings immediately.
    pub fn submit_patch<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        category: Category,
        patch: &BundlePatch,
        active: bool,
    ) -> bool {
        let changed = patch.apply(self.config.profiles.get_mut(category));
        if changed {
            debug!(category = ?category, patch = ?patch, "Profile edited");
            self.persist();
        }
        if active {
            self.apply_category(host, category);
        }
        changed
    }

    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.config.enabled == enabled {
            return false;
        }
        self.config.enabled = enabled;
        info!(enabled, "Master enable changed");
        self.persist();
        true
    }

    pub fn set_visible(&mut self, visible: bool) -> bool {
        if self.config.visible == visible {
            return false;
        }
        self.config.visible = visible;
        self.persist();
        true
    }

    /// Flip edit surface visibility and return the new state
    pub fn toggle_visible(&mut self) -> bool {
        let visible = !self.config.visible;
        self.set_visible(visible);
        visible
    }

    pub fn apply_debug(&mut self, patch: &DebugPatch) -> bool {
        let changed = patch.apply(&mut self.config.debug);
        if changed {
            debug!(debug = ?self.config.debug, "Debug overrides changed");
            self.persist();
        }
        changed
    }

    pub fn status<H: Host + ?Sized>(&self, host: &H) -> StatusReport {
        StatusReport {
            enabled: self.config.enabled,
            visible: self.config.visible,
            category: self.current_category(host),
            active_profile: self.active_profile(host),
            alliance_like_zone: self.classifier.is_alliance_like_zone(host.territory()),
            in_duty: self.special_context(host),
            live: host.snapshot(),
            backup: self.config.profiles.backup.clone(),
        }
    }

    /// Clear and reapply highlights when settings changed or the wanted colors differ
    fn sync_highlights<H: HighlightSurface + ?Sized>(
        &mut self,
        host: &mut H,
        active: Category,
        changed: bool,
    ) {
        let plan = highlight_plan(self.config.profiles.get(active));
        if !changed && self.last_highlights == Some(plan) {
            return;
        }

        host.clear_highlights();
        for (target, color) in HighlightTarget::ALL.into_iter().zip(plan) {
            if color != HighlightColor::None {
                host.set_highlight(target, color);
            }
        }
        self.last_highlights = Some(plan);
    }

    fn persist(&mut self) {
        if let Err(e) = self.persister.save(&self.config) {
            error!(error = ?e, "Failed to save config");
        }
    }

    fn notice(&self, count: usize, message: &str) {
        if count == 0 {
            return;
        }
        if self.config.debug.messages {
            info!(fields = count, "{message}");
        } else {
            debug!(fields = count, "{message}");
        }
    }
}
