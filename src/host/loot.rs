//! The mob/loot subsystem boundary.

use super::types::{EntityId, ItemStack, Location};

/// Creatures spawned by one weighted-random roll of a loot table.
#[derive(Debug, Clone, Default)]
pub struct SpawnedDrops {
    pub mobs: Vec<EntityId>,
}

/// Weighted-random drop generation and entity classification, consumed from
/// the external mob/loot definition subsystem.
pub trait LootTables {
    /// Generate a weighted-random set of creatures from the named table at
    /// the given location. `None` if the table does not exist.
    fn generate_drops(&mut self, table_id: &str, loc: Location) -> Option<SpawnedDrops>;

    /// Draw a single weighted-random item from the named table. `None` if
    /// the table is missing, empty, or rolled an undefined item.
    fn choose_one_item(&mut self, table_id: &str) -> Option<ItemStack>;

    /// The definition id of the entity's creature type, for logging and
    /// `info` listings.
    fn definition_id(&self, id: EntityId) -> Option<String>;

    /// Exchange the contents of two loot tables, creating empty tables for
    /// missing ids. Used when stage configurations are swapped.
    fn swap_tables(&mut self, a: &str, b: &str);
}
