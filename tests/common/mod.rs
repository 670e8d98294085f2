//! Shared test doubles: an in-memory arena world and loot subsystem.
//!
//! The world and the loot tables share one registry through `Rc<RefCell>`
//! so drop generation can spawn creatures the way the real subsystem does.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use gauntlet::core::constants::SUMMONING_OBJECT_COUNT;
use gauntlet::fight::FightController;
use gauntlet::host::{
    Effect, EntityId, EntityKind, GuardianPhase, IndicatorView, ItemStack, Location, LootTables,
    PlayerId, SpawnReason, SpawnedDrops, TerrainQuery, WorldHost,
};
use gauntlet::settings::SettingsStore;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Clone)]
pub struct FakeEntity {
    pub kind: EntityKind,
    pub loc: Location,
    pub health: f64,
    pub max_health: f64,
    pub tags: BTreeSet<String>,
    pub valid: bool,
    pub invulnerable: bool,
    pub glowing: bool,
    pub beam: Option<Location>,
    pub spawned_at: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FakePlayer {
    pub name: String,
    pub loc: Location,
    pub online: bool,
    pub free_slots: usize,
    pub messages: Vec<String>,
    pub titles: Vec<(String, String)>,
    pub items: Vec<ItemStack>,
}

/// Everything the fake world owns, shared with the fake loot subsystem.
#[derive(Debug, Default)]
pub struct Registry {
    next_id: u64,
    pub now: u64,
    pub entities: BTreeMap<EntityId, FakeEntity>,
    pub players: BTreeMap<PlayerId, FakePlayer>,
    pub guardian_link: Option<EntityId>,
    pub commands: Vec<String>,
    pub effects: Vec<(Location, Effect)>,
    pub attack_targets: Vec<(EntityId, PlayerId)>,
    pub indicator: Option<IndicatorView>,
}

impl Registry {
    pub fn spawn(&mut self, kind: EntityKind, loc: Location, max_health: f64) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        let _ = self.entities.insert(
            id,
            FakeEntity {
                kind,
                loc,
                health: max_health,
                max_health,
                tags: BTreeSet::new(),
                valid: true,
                invulnerable: false,
                glowing: false,
                beam: None,
                spawned_at: self.now,
            },
        );
        id
    }
}

// =============================================================================
// World host
// =============================================================================

#[derive(Clone)]
pub struct FakeWorld {
    pub reg: Rc<RefCell<Registry>>,
}

impl FakeWorld {
    pub fn spawn(&mut self, kind: EntityKind, loc: Location, max_health: f64) -> EntityId {
        self.reg.borrow_mut().spawn(kind, loc, max_health)
    }

    pub fn link_guardian(&mut self, id: EntityId) {
        self.reg.borrow_mut().guardian_link = Some(id);
    }

    pub fn add_player(&mut self, name: &str, loc: Location) -> PlayerId {
        let id = PlayerId(Uuid::new_v4());
        let _ = self.reg.borrow_mut().players.insert(
            id,
            FakePlayer {
                name: name.to_string(),
                loc,
                online: true,
                free_slots: 36,
                ..FakePlayer::default()
            },
        );
        id
    }

    pub fn set_online(&mut self, player: PlayerId, online: bool) {
        if let Some(p) = self.reg.borrow_mut().players.get_mut(&player) {
            p.online = online;
        }
    }

    pub fn set_free_slots(&mut self, player: PlayerId, slots: usize) {
        if let Some(p) = self.reg.borrow_mut().players.get_mut(&player) {
            p.free_slots = slots;
        }
    }

    pub fn set_entity_location(&mut self, id: EntityId, loc: Location) {
        if let Some(e) = self.reg.borrow_mut().entities.get_mut(&id) {
            e.loc = loc;
        }
    }

    pub fn entity(&self, id: EntityId) -> FakeEntity {
        self.reg.borrow().entities.get(&id).cloned().expect("entity exists")
    }

    pub fn player(&self, id: PlayerId) -> FakePlayer {
        self.reg.borrow().players.get(&id).cloned().expect("player exists")
    }

    pub fn indicator(&self) -> IndicatorView {
        self.reg
            .borrow()
            .indicator
            .clone()
            .unwrap_or_else(IndicatorView::hidden)
    }

    pub fn valid_count_of(&self, kind: EntityKind) -> usize {
        self.reg
            .borrow()
            .entities
            .values()
            .filter(|e| e.valid && e.kind == kind)
            .count()
    }
}

impl WorldHost for FakeWorld {
    fn is_valid(&self, id: EntityId) -> bool {
        self.reg
            .borrow()
            .entities
            .get(&id)
            .is_some_and(|e| e.valid)
    }

    fn entity_location(&self, id: EntityId) -> Option<Location> {
        let reg = self.reg.borrow();
        reg.entities.get(&id).filter(|e| e.valid).map(|e| e.loc)
    }

    fn teleport(&mut self, id: EntityId, loc: Location) {
        if let Some(e) = self.reg.borrow_mut().entities.get_mut(&id) {
            e.loc = loc;
        }
    }

    fn remove_entity(&mut self, id: EntityId) {
        let mut reg = self.reg.borrow_mut();
        if let Some(e) = reg.entities.get_mut(&id) {
            e.valid = false;
        }
        if reg.guardian_link == Some(id) {
            reg.guardian_link = None;
        }
    }

    fn health(&self, id: EntityId) -> f64 {
        self.reg
            .borrow()
            .entities
            .get(&id)
            .filter(|e| e.valid)
            .map_or(0.0, |e| e.health)
    }

    fn max_health(&self, id: EntityId) -> f64 {
        self.reg
            .borrow()
            .entities
            .get(&id)
            .map_or(0.0, |e| e.max_health)
    }

    fn add_tag(&mut self, id: EntityId, tag: &str) {
        if let Some(e) = self.reg.borrow_mut().entities.get_mut(&id) {
            let _ = e.tags.insert(tag.to_string());
        }
    }

    fn has_tag_or_group(&self, id: EntityId, tag: &str) -> bool {
        self.reg
            .borrow()
            .entities
            .get(&id)
            .is_some_and(|e| e.tags.contains(tag))
    }

    fn set_invulnerable(&mut self, id: EntityId, invulnerable: bool) {
        if let Some(e) = self.reg.borrow_mut().entities.get_mut(&id) {
            e.invulnerable = invulnerable;
        }
    }

    fn set_glowing(&mut self, id: EntityId, glowing: bool) {
        if let Some(e) = self.reg.borrow_mut().entities.get_mut(&id) {
            e.glowing = glowing;
        }
    }

    fn set_beam_target(&mut self, id: EntityId, target: Option<Location>) {
        if let Some(e) = self.reg.borrow_mut().entities.get_mut(&id) {
            e.beam = target;
        }
    }

    fn is_glowing(&self, id: EntityId) -> bool {
        self.reg
            .borrow()
            .entities
            .get(&id)
            .is_some_and(|e| e.glowing)
    }

    fn can_target_players(&self, id: EntityId) -> bool {
        self.reg.borrow().entities.get(&id).is_some_and(|e| {
            matches!(
                e.kind,
                EntityKind::WaveBoss | EntityKind::SupportMob | EntityKind::Guardian
            )
        })
    }

    fn set_attack_target(&mut self, id: EntityId, player: PlayerId) {
        self.reg.borrow_mut().attack_targets.push((id, player));
    }

    fn age_ticks(&self, id: EntityId) -> u64 {
        let reg = self.reg.borrow();
        reg.entities
            .get(&id)
            .map_or(0, |e| reg.now.saturating_sub(e.spawned_at))
    }

    fn entity_kind(&self, id: EntityId) -> Option<EntityKind> {
        self.reg
            .borrow()
            .entities
            .get(&id)
            .filter(|e| e.valid)
            .map(|e| e.kind)
    }

    fn loaded_entities(&self) -> Vec<EntityId> {
        self.reg
            .borrow()
            .entities
            .iter()
            .filter(|(_, e)| e.valid)
            .map(|(&id, _)| id)
            .collect()
    }

    fn guardian(&self) -> Option<EntityId> {
        let reg = self.reg.borrow();
        reg.guardian_link
            .filter(|id| reg.entities.get(id).is_some_and(|e| e.valid))
    }

    fn guardian_instances(&self) -> Vec<EntityId> {
        self.reg
            .borrow()
            .entities
            .iter()
            .filter(|(_, e)| e.valid && e.kind == EntityKind::Guardian)
            .map(|(&id, _)| id)
            .collect()
    }

    fn force_load_arena(&mut self, _chunk_radius: i32) {}

    fn online_players(&self) -> Vec<PlayerId> {
        self.reg
            .borrow()
            .players
            .iter()
            .filter(|(_, p)| p.online)
            .map(|(&id, _)| id)
            .collect()
    }

    fn is_online(&self, player: PlayerId) -> bool {
        self.reg
            .borrow()
            .players
            .get(&player)
            .is_some_and(|p| p.online)
    }

    fn player_name(&self, player: PlayerId) -> String {
        self.reg
            .borrow()
            .players
            .get(&player)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    fn player_location(&self, player: PlayerId) -> Option<Location> {
        let reg = self.reg.borrow();
        reg.players
            .get(&player)
            .filter(|p| p.online)
            .map(|p| p.loc)
    }

    fn free_inventory_slots(&self, player: PlayerId) -> usize {
        self.reg
            .borrow()
            .players
            .get(&player)
            .map_or(0, |p| p.free_slots)
    }

    fn give_items(&mut self, player: PlayerId, items: &[ItemStack]) {
        if let Some(p) = self.reg.borrow_mut().players.get_mut(&player) {
            p.items.extend_from_slice(items);
        }
    }

    fn send_message(&mut self, player: PlayerId, message: &str) {
        if let Some(p) = self.reg.borrow_mut().players.get_mut(&player) {
            p.messages.push(message.to_string());
        }
    }

    fn show_title(&mut self, player: PlayerId, title: &str, subtitle: &str) {
        if let Some(p) = self.reg.borrow_mut().players.get_mut(&player) {
            p.titles.push((title.to_string(), subtitle.to_string()));
        }
    }

    fn run_console_command(&mut self, command: &str) {
        self.reg.borrow_mut().commands.push(command.to_string());
    }

    fn play_effect(&mut self, loc: Location, effect: Effect) {
        self.reg.borrow_mut().effects.push((loc, effect));
    }

    fn update_indicator(&mut self, view: &IndicatorView) {
        self.reg.borrow_mut().indicator = Some(view.clone());
    }
}

// =============================================================================
// Loot tables
// =============================================================================

pub struct FakeLoot {
    pub reg: Rc<RefCell<Registry>>,
    /// table id -> creature definitions spawned by one roll.
    pub mob_tables: BTreeMap<String, Vec<(String, f64)>>,
    pub item_tables: BTreeMap<String, Vec<ItemStack>>,
    pub definitions: BTreeMap<EntityId, String>,
}

impl FakeLoot {
    pub fn set_mob_table(&mut self, table: &str, mobs: &[(&str, f64)]) {
        let _ = self.mob_tables.insert(
            table.to_string(),
            mobs.iter().map(|&(d, h)| (d.to_string(), h)).collect(),
        );
    }

    pub fn set_item_table(&mut self, table: &str, items: &[ItemStack]) {
        let _ = self.item_tables.insert(table.to_string(), items.to_vec());
    }
}

impl LootTables for FakeLoot {
    fn generate_drops(&mut self, table_id: &str, loc: Location) -> Option<SpawnedDrops> {
        let defs = self.mob_tables.get(table_id)?.clone();
        let mut mobs = Vec::new();
        for (definition, max_health) in defs {
            let id = self
                .reg
                .borrow_mut()
                .spawn(EntityKind::WaveBoss, loc, max_health);
            let _ = self.definitions.insert(id, definition);
            mobs.push(id);
        }
        Some(SpawnedDrops { mobs })
    }

    fn choose_one_item(&mut self, table_id: &str) -> Option<ItemStack> {
        self.item_tables.get(table_id)?.first().cloned()
    }

    fn definition_id(&self, id: EntityId) -> Option<String> {
        self.definitions.get(&id).cloned()
    }

    fn swap_tables(&mut self, a: &str, b: &str) {
        let ta = self.mob_tables.remove(a).unwrap_or_default();
        let tb = self.mob_tables.remove(b).unwrap_or_default();
        let _ = self.mob_tables.insert(a.to_string(), tb);
        let _ = self.mob_tables.insert(b.to_string(), ta);
        let ia = self.item_tables.remove(a).unwrap_or_default();
        let ib = self.item_tables.remove(b).unwrap_or_default();
        let _ = self.item_tables.insert(a.to_string(), ib);
        let _ = self.item_tables.insert(b.to_string(), ia);
    }
}

// =============================================================================
// Terrain
// =============================================================================

/// Flat terrain: solid at and below `surface_y`, air above.
pub struct FakeTerrain {
    pub surface_y: i64,
}

impl TerrainQuery for FakeTerrain {
    fn is_passable(&self, _x: i64, y: i64, _z: i64) -> bool {
        y > self.surface_y
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub controller: FightController,
    pub world: FakeWorld,
    pub loot: FakeLoot,
    pub terrain: FakeTerrain,
    pub rng: ChaCha8Rng,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(SettingsStore::in_memory())
    }

    pub fn with_store(store: SettingsStore) -> Self {
        use rand::SeedableRng;

        // First harness in the process wins; later calls are no-ops.
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let reg = Rc::new(RefCell::new(Registry::default()));
        let world = FakeWorld { reg: Rc::clone(&reg) };
        let mut loot = FakeLoot {
            reg,
            mob_tables: BTreeMap::new(),
            item_tables: BTreeMap::new(),
            definitions: BTreeMap::new(),
        };
        for stage in 1..=10 {
            loot.set_mob_table(
                &format!("stage-{stage}-bosses"),
                &[("wave-brute", 60.0), ("wave-archer", 40.0)],
            );
        }
        loot.set_item_table("guardian-drops", &[ItemStack::new("trophy", 1)]);

        Self {
            controller: FightController::new(store),
            world,
            loot,
            terrain: FakeTerrain { surface_y: 59 },
            rng: ChaCha8Rng::seed_from_u64(42),
        }
    }

    pub fn tick(&mut self, count: u64) {
        for _ in 0..count {
            self.world.reg.borrow_mut().now += 1;
            self.controller.tick(
                &mut self.world,
                &mut self.loot,
                &self.terrain,
                &mut self.rng,
            );
        }
    }

    /// Place the four summoning objects, raise the ten pillar ritual
    /// objects, spawn the guardian and let stage 1 begin.
    pub fn summon_and_start(&mut self, owner_name: &str) -> (PlayerId, EntityId) {
        let owner = self.world.add_player(owner_name, Location::new(10.0, 64.0, 10.0));
        // Block coordinates (3, 0), (-3, 0), (0, 3), (0, -3).
        let summoning_spots = [
            Location::new(3.5, 64.0, 0.5),
            Location::new(-2.5, 64.0, 0.5),
            Location::new(0.5, 64.0, 3.5),
            Location::new(0.5, 64.0, -2.5),
        ];
        for loc in summoning_spots {
            assert_eq!(
                self.controller.on_place_attempt(&mut self.world, owner, loc),
                gauntlet::fight::PlaceVerdict::Allow
            );
            let id = self.world.spawn(EntityKind::SummoningObject, loc, 1.0);
            self.controller.on_object_spawn(&mut self.world, id, loc);
        }
        assert_eq!(
            self.controller.summoning_object_count(),
            SUMMONING_OBJECT_COUNT
        );

        // The summon consumes the summoning set and raises the pillars.
        for id in self.world.loaded_entities() {
            if self.world.entity(id).kind == EntityKind::SummoningObject {
                self.world.remove_entity(id);
                self.controller.on_object_removed(id);
            }
        }
        self.controller
            .on_guardian_phase_change(GuardianPhase::SummoningPillars);
        for i in 0..10 {
            let angle = f64::from(i) * std::f64::consts::TAU / 10.0;
            let loc = Location::new(40.0 * angle.cos(), 65.0, 40.0 * angle.sin());
            let id = self.world.spawn(EntityKind::RitualObject, loc, 1.0);
            self.controller.on_object_spawn(&mut self.world, id, loc);
        }
        self.controller.on_guardian_phase_change(GuardianPhase::Other);
        assert_eq!(self.controller.ritual_object_count(), 10);

        let guardian = self
            .world
            .spawn(EntityKind::Guardian, Location::new(0.5, 70.0, 0.5), 200.0);
        self.world.link_guardian(guardian);
        self.controller.on_creature_spawn(
            &mut self.world,
            &self.terrain,
            &mut self.rng,
            guardian,
            EntityKind::Guardian,
            SpawnReason::Ritual,
        );
        (owner, guardian)
    }

    /// Apply damage through the two-phase damage pipeline, forwarding a
    /// death event if the hit was lethal.
    pub fn damage(&mut self, id: EntityId, amount: f64) {
        use gauntlet::fight::DamageVerdict;

        let kind = self.world.entity(id).kind;
        if self.controller.on_entity_damage_early(&self.world, id, kind) == DamageVerdict::Deny {
            return;
        }
        let lethal = {
            let mut reg = self.world.reg.borrow_mut();
            let e = reg.entities.get_mut(&id).expect("entity exists");
            e.health = (e.health - amount).max(0.0);
            e.health <= 0.0
        };
        self.controller
            .on_entity_damage_late(&mut self.world, id, amount);
        if lethal {
            self.world.remove_entity(id);
            self.controller.on_entity_death(
                &mut self.world,
                &mut self.loot,
                &self.terrain,
                &mut self.rng,
                id,
                kind,
            );
        }
    }

    /// Kill every live wave boss through the damage pipeline.
    pub fn clear_wave(&mut self) {
        for id in self.controller.boss_ids() {
            let health = self.world.entity(id).health;
            self.damage(id, health + 1.0);
        }
    }

    pub fn stage(&self) -> u8 {
        self.controller.record().stage_number()
    }
}
