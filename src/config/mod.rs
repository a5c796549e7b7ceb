//! Configuration management for Clarity In Chaos
//!
//! - **profile**: per-category settings bundles, the fallback resolver and the persisted root
//! - **patch**: partial updates sent by the edit surface

pub mod patch;
pub mod profile;

pub use patch::{BundlePatch, DebugPatch};
pub use profile::{Configuration, DebugSettings, SettingsBundle};
