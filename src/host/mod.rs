//! External-collaborator interfaces: the game-world host and the mob/loot
//! subsystem. Everything the encounter consumes from outside crosses one of
//! the traits defined here.

pub mod loot;
pub mod types;
pub mod world;

pub use loot::{LootTables, SpawnedDrops};
pub use types::{
    BarColor, Effect, EntityId, EntityKind, GuardianPhase, IndicatorView, ItemStack, Location,
    PlayerId, SpawnReason,
};
pub use world::{TerrainQuery, WorldHost};
