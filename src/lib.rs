//! Gauntlet - Scripted Arena Boss Encounter Library
//!
//! Ten escalating boss waves followed by a shielded guardian, driven by a
//! single controller the host embeds. The host forwards world events into
//! the controller and ticks it; everything the encounter needs from the
//! outside world crosses the traits in [`host`].

pub mod core;
pub mod fight;
pub mod host;
pub mod settings;

pub use fight::{Command, CommandError, FightController};
pub use settings::{settings_path, SettingsError, SettingsStore};
