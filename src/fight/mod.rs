//! The encounter itself: durable record, stage catalog, transition
//! animation, spawn search, the controller that ties them together, and
//! the command surface on top.

pub mod animation;
pub mod commands;
pub mod controller;
pub mod record;
pub mod spawn;
pub mod stage;
pub mod supervisor;

pub use animation::{StageTransition, TransitionStep};
pub use commands::{execute, Command, CommandError};
pub use controller::{
    DamageVerdict, FightController, PlaceVerdict, SkipOutcome, StageCommandError,
};
pub use record::FightRecord;
pub use spawn::{boss_spawn_location, fallback_spawn_location};
pub use stage::{wave_loot_table_id, Stage, StageCatalog};
