use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

use crate::config::Configuration;

/// Durable storage for the configuration root.
///
/// The engine calls `save` after every change it makes and never waits on or
/// retries the result beyond logging it.
pub trait Persist {
    fn save(&mut self, config: &Configuration) -> Result<()>;
}

/// Writes the configuration as pretty JSON to a fixed path
pub struct JsonFilePersister {
    path: PathBuf,
}

impl JsonFilePersister {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Persist for JsonFilePersister {
    fn save(&mut self, config: &Configuration) -> Result<()> {
        config.save_to(&self.path)?;
        debug!(path = %self.path.display(), "Saved config");
        Ok(())
    }
}

/// Counts saves and keeps the last saved copy
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingPersister {
    pub saves: usize,
    pub last: Option<Configuration>,
    pub fail: bool,
}

#[cfg(test)]
impl Persist for RecordingPersister {
    fn save(&mut self, config: &Configuration) -> Result<()> {
        self.saves += 1;
        if self.fail {
            anyhow::bail!("simulated persistence failure");
        }
        self.last = Some(config.clone());
        Ok(())
    }
}
