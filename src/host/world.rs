//! The world-host boundary.
//!
//! The game-world host owns entities, physics and players; this crate only
//! ever talks to it through [`WorldHost`] and [`TerrainQuery`]. The fight
//! controller is handed an implementation per call rather than holding one,
//! so tests drive the whole encounter against a fake world.

use super::types::{Effect, EntityId, EntityKind, IndicatorView, ItemStack, Location, PlayerId};

/// Entity, player and UI operations consumed from the game-world host.
///
/// All mutation happens on the host's single simulation thread; none of
/// these methods block.
pub trait WorldHost {
    // ── Entities ────────────────────────────────────────────────

    /// Whether the entity still exists and has not been removed.
    fn is_valid(&self, id: EntityId) -> bool;

    fn entity_location(&self, id: EntityId) -> Option<Location>;

    fn teleport(&mut self, id: EntityId, loc: Location);

    fn remove_entity(&mut self, id: EntityId);

    /// Current health of a living entity, 0.0 if unknown.
    fn health(&self, id: EntityId) -> f64;

    /// Maximum health of a living entity, 0.0 if unknown.
    fn max_health(&self, id: EntityId) -> f64;

    /// Attach a durability tag that survives world persistence.
    fn add_tag(&mut self, id: EntityId, tag: &str);

    /// True if the entity carries the tag directly or via its definition's
    /// group set.
    fn has_tag_or_group(&self, id: EntityId, tag: &str) -> bool;

    fn set_invulnerable(&mut self, id: EntityId, invulnerable: bool);

    fn set_glowing(&mut self, id: EntityId, glowing: bool);

    /// Point a ritual object's visual beam, or clear it with `None`.
    fn set_beam_target(&mut self, id: EntityId, target: Option<Location>);

    fn is_glowing(&self, id: EntityId) -> bool;

    /// Whether the entity is a creature capable of combat targeting.
    fn can_target_players(&self, id: EntityId) -> bool;

    fn set_attack_target(&mut self, id: EntityId, player: PlayerId);

    /// Ticks the entity has existed, for surplus-guardian age ordering.
    fn age_ticks(&self, id: EntityId) -> u64;

    /// The entity's broad classification, `None` for unknown entities.
    fn entity_kind(&self, id: EntityId) -> Option<EntityKind>;

    /// All entities in the loaded/force-loaded region of the arena world.
    fn loaded_entities(&self) -> Vec<EntityId>;

    // ── The guardian ────────────────────────────────────────────

    /// The guardian instance the host's battle state is linked to, if any.
    fn guardian(&self) -> Option<EntityId>;

    /// Every guardian instance in the world. The host can spuriously spawn
    /// extras, so this may disagree with [`WorldHost::guardian`].
    fn guardian_instances(&self) -> Vec<EntityId>;

    // ── Chunks ──────────────────────────────────────────────────

    /// Force-load the chunks within the given chunk radius of the arena
    /// origin so entities there can be discovered on boot.
    fn force_load_arena(&mut self, chunk_radius: i32);

    // ── Players ─────────────────────────────────────────────────

    fn online_players(&self) -> Vec<PlayerId>;

    fn is_online(&self, player: PlayerId) -> bool;

    /// Display name for a player who may be offline.
    fn player_name(&self, player: PlayerId) -> String;

    fn player_location(&self, player: PlayerId) -> Option<Location>;

    /// Number of empty inventory slots the player currently has.
    fn free_inventory_slots(&self, player: PlayerId) -> usize;

    /// Place the item stacks in the player's inventory. The caller checks
    /// capacity first via [`WorldHost::free_inventory_slots`].
    fn give_items(&mut self, player: PlayerId, items: &[ItemStack]);

    fn send_message(&mut self, player: PlayerId, message: &str);

    fn show_title(&mut self, player: PlayerId, title: &str, subtitle: &str);

    /// Run a command as the host console (stage broadcast commands).
    fn run_console_command(&mut self, command: &str);

    // ── Effects and UI ──────────────────────────────────────────

    fn play_effect(&mut self, loc: Location, effect: Effect);

    /// Push the desired progress-indicator state.
    fn update_indicator(&mut self, view: &IndicatorView);
}

/// Block passability queries, split out so the boss-spawn location search
/// is a pure function of a terrain view and an RNG.
pub trait TerrainQuery {
    /// True if the block at the given coordinates can be moved through.
    fn is_passable(&self, x: i64, y: i64, z: i64) -> bool;
}
