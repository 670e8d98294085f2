//! The fight controller.
//!
//! One value owns the whole encounter: the durable record, the stage
//! catalog, the tracked entity sets and any in-flight transition. The host
//! integration layer forwards world events into the handlers here and
//! drives [`FightController::tick`] once per simulation tick; every handler
//! is passed the world, loot and RNG collaborators it needs rather than
//! reaching for globals.

use std::collections::{BTreeSet, HashMap};

use rand::Rng;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::constants::{
    BOSS_TAG, FIGHT_ENTITY_TAG, GUARDIAN_LOOT_TABLE, GUARDIAN_STAGE, LOGIN_REMINDER_DELAY_TICKS,
    NEARBY_RADIUS, PILLAR_CIRCLE_RADIUS, PILLAR_CIRCLE_TOLERANCE, PILLAR_TAG,
    SUMMONING_MIN_Y, SUMMONING_OBJECT_COUNT, SUMMONING_TAG, SUPERVISOR_PERIOD_TICKS,
    SUPPORT_TAG, SURPLUS_SWEEP_PERIOD_TICKS, TRACKED_RADIUS,
};
use crate::fight::animation::{StageTransition, TransitionStep};
use crate::fight::record::FightRecord;
use crate::fight::spawn::boss_spawn_location;
use crate::fight::stage::StageCatalog;
use crate::host::{
    Effect, EntityId, EntityKind, GuardianPhase, IndicatorView, Location, LootTables, PlayerId,
    SpawnReason, TerrainQuery, WorldHost,
};
use crate::settings::SettingsStore;

/// Chunk radius force-loaded around the arena origin on boot, wide enough
/// to cover the tracked-entity discovery radius.
const ARENA_CHUNK_RADIUS: i32 = (TRACKED_RADIUS as i32) / 16 + 1;

/// Whether an early damage event should go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageVerdict {
    Allow,
    Deny,
}

/// Whether a player's object placement should go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceVerdict {
    Allow,
    Deny,
}

/// What an explicit stage jump ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// Stage 0 was requested, so the fight was stopped.
    Stopped,
    /// The fight is already at the requested stage.
    AlreadyThere,
    /// The requested stage was started.
    Started,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageCommandError {
    #[error("stages can only be skipped forward (currently at stage {from}, asked for {to})")]
    BackwardSkip { from: u8, to: u8 },
    #[error("{0} is not a stage number")]
    InvalidStage(u8),
    #[error("no guardian is present; start the fight first")]
    NoGuardian,
}

/// Work queued for a later tick. Items fire in submission order once due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// Protect a freshly discovered ritual or summoning object. Runs one
    /// tick after the spawn so the host has finished wiring the entity.
    Protect(EntityId),
    /// Remind a freshly logged-in player of their unclaimed prizes.
    RemindUnclaimedPrizes(PlayerId),
}

pub struct FightController {
    store: SettingsStore,
    record: FightRecord,
    catalog: StageCatalog,
    /// The pillar ritual objects still standing, one consumed per wave.
    ritual_objects: BTreeSet<EntityId>,
    /// The player-placed summoning objects, up to four.
    summoning_objects: BTreeSet<EntityId>,
    /// Live wave bosses and their support mobs.
    bosses: BTreeSet<EntityId>,
    /// Tick each boss last took damage, for the idle-boss timeout.
    last_damage_tick: HashMap<EntityId, u64>,
    transition: Option<StageTransition>,
    /// Stage queued to start on the next tick when there was no ritual
    /// object left to animate with.
    pending_immediate_stage: Option<(u8, Location)>,
    deferred: Vec<(u64, Deferred)>,
    /// True while the host's summoning sequence is raising the pillar
    /// objects, which is the only window where object spawns on the pillar
    /// circle belong to the fight.
    collecting_pillars: bool,
    /// Remaining-health fraction last pushed to the indicator.
    pub(crate) bar_fraction: f64,
    now: u64,
}

impl FightController {
    /// Build a controller over the given settings store, loading the
    /// durable record and the stage catalog from it.
    pub fn new(store: SettingsStore) -> Self {
        let record = FightRecord::load(&store);
        let catalog = StageCatalog::load(&store);
        Self {
            store,
            record,
            catalog,
            ritual_objects: BTreeSet::new(),
            summoning_objects: BTreeSet::new(),
            bosses: BTreeSet::new(),
            last_damage_tick: HashMap::new(),
            transition: None,
            pending_immediate_stage: None,
            deferred: Vec::new(),
            collecting_pillars: false,
            bar_fraction: 1.0,
            now: 0,
        }
    }

    pub fn record(&self) -> &FightRecord {
        &self.record
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut StageCatalog {
        &mut self.catalog
    }

    pub fn ritual_object_count(&self) -> usize {
        self.ritual_objects.len()
    }

    pub fn summoning_object_count(&self) -> usize {
        self.summoning_objects.len()
    }

    pub fn boss_count(&self) -> usize {
        self.bosses.len()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    // ── 1. Boot and recovery ────────────────────────────────────

    /// Rebuild the tracked-entity sets and resume any interrupted
    /// transition after a restart.
    ///
    /// Entities are rediscovered by their durability tags, which is the
    /// source of truth for membership; the persisted stage numbers decide
    /// whether a transition animation needs to be restarted.
    pub fn recover<W, T, R>(&mut self, world: &mut W, terrain: &T, rng: &mut R)
    where
        W: WorldHost,
        T: TerrainQuery,
        R: Rng,
    {
        world.force_load_arena(ARENA_CHUNK_RADIUS);
        for id in world.loaded_entities() {
            self.track_discovered(world, id);
        }
        info!(
            stage = self.record.stage_number(),
            ritual_objects = self.ritual_objects.len(),
            summoning_objects = self.summoning_objects.len(),
            bosses = self.bosses.len(),
            "recovered fight state"
        );

        if let Some(guardian) = world.guardian() {
            world.set_invulnerable(guardian, self.record.stage_number() < GUARDIAN_STAGE);
        }

        if self.record.is_stage_changing() {
            let target = self.record.target_stage_number();
            if target == self.record.stage_number() + 1 {
                info!(to_stage = target, "resuming interrupted stage transition");
                self.animate_stage(world, terrain, rng, target);
            } else {
                warn!(
                    stage = self.record.stage_number(),
                    to_stage = target,
                    "stage numbers diverged across restart, starting the target stage directly"
                );
                if target == 0 {
                    self.record.jump_to_stage(0);
                    self.persist();
                } else if target == GUARDIAN_STAGE {
                    self.expose_guardian(world);
                } else {
                    self.pending_immediate_stage = Some((target, boss_spawn_location(terrain, rng)));
                }
            }
        }
    }

    /// Track an already-tagged entity found in the world (boot or chunk
    /// load).
    fn track_discovered<W: WorldHost>(&mut self, world: &mut W, id: EntityId) {
        if !world.is_valid(id) {
            return;
        }
        if world.has_tag_or_group(id, PILLAR_TAG) {
            let _ = self.ritual_objects.insert(id);
            world.set_invulnerable(id, true);
        } else if world.has_tag_or_group(id, SUMMONING_TAG) {
            let _ = self.summoning_objects.insert(id);
            world.set_invulnerable(id, true);
        } else if world.has_tag_or_group(id, BOSS_TAG)
            || world.has_tag_or_group(id, SUPPORT_TAG)
        {
            if self.bosses.insert(id) {
                let _ = self.last_damage_tick.insert(id, self.now);
            }
        }
    }

    /// Final persistence pass before the host shuts down.
    ///
    /// A full summoning-object set at shutdown means the guardian summon
    /// would replay on boot and duplicate the fight, so the encounter is
    /// force-stopped instead.
    pub fn on_shutdown<W: WorldHost>(&mut self, world: &mut W) {
        self.summoning_objects.retain(|&id| world.is_valid(id));
        if self.summoning_objects.len() == SUMMONING_OBJECT_COUNT {
            error!(
                "shutting down with a full summoning-object set; \
                 force-stopping the fight to avoid a duplicate summon"
            );
            self.force_stop(world);
        }
        self.persist();
    }

    // ── 2. The tick driver ──────────────────────────────────────

    /// Advance one simulation tick: fire due deferred work, advance any
    /// transition, and run the periodic supervisor passes.
    pub fn tick<W, L, T, R>(&mut self, world: &mut W, loot: &mut L, terrain: &T, rng: &mut R)
    where
        W: WorldHost,
        L: LootTables,
        T: TerrainQuery,
        R: Rng,
    {
        self.now += 1;

        let due: Vec<Deferred> = {
            let now = self.now;
            let mut due = Vec::new();
            self.deferred.retain(|&(tick, item)| {
                if tick <= now {
                    due.push(item);
                    false
                } else {
                    true
                }
            });
            due
        };
        for item in due {
            match item {
                Deferred::Protect(id) => self.protect_object(world, id),
                Deferred::RemindUnclaimedPrizes(player) => {
                    self.remind_unclaimed_prizes(world, player);
                }
            }
        }

        if let Some((stage, spawn)) = self.pending_immediate_stage.take() {
            self.begin_wave_stage(world, loot, rng, stage, spawn);
        }
        self.advance_transition(world, loot, rng);

        if self.now % SUPERVISOR_PERIOD_TICKS == 0 {
            self.containment_pass(world, terrain, rng);
            self.refresh_indicator(world);
        }
        if self.now % SURPLUS_SWEEP_PERIOD_TICKS == 0 {
            self.cull_surplus_guardians(world);
        }
    }

    /// Step the in-flight transition, re-validating before every step.
    ///
    /// If the ritual object vanished or the durable record stopped pointing
    /// at this transition's target, the whole transition is cancelled
    /// rather than letting a stale step act on a reset fight.
    fn advance_transition<W, L, R>(&mut self, world: &mut W, loot: &mut L, rng: &mut R)
    where
        W: WorldHost,
        L: LootTables,
        R: Rng,
    {
        let Some(mut transition) = self.transition.take() else {
            return;
        };

        for step in transition.take_due_steps(self.now) {
            let object = transition.ritual_object();
            let drifted = !world.is_valid(object)
                || !self.ritual_objects.contains(&object)
                || self.record.target_stage_number() != transition.target_stage();
            if drifted {
                warn!(
                    to_stage = transition.target_stage(),
                    %object,
                    "fight state drifted mid-transition, cancelling it"
                );
                return;
            }

            match step {
                TransitionStep::Flicker => {
                    world.set_beam_target(object, Some(transition.beam_target()));
                    let glowing = world.is_glowing(object);
                    world.set_glowing(object, !glowing);
                    world.play_effect(transition.beam_target(), Effect::SummoningChime);
                }
                TransitionStep::BeamLock => {
                    world.set_glowing(object, false);
                    world.set_beam_target(object, Some(transition.beam_target()));
                    world.play_effect(transition.beam_target(), Effect::SummoningChime);
                }
                TransitionStep::SpawnCue => {
                    world.play_effect(transition.spawn_location(), Effect::SpawnCue);
                }
                TransitionStep::Consume => {
                    let _ = self.ritual_objects.remove(&object);
                    world.remove_entity(object);
                    self.record.finish_stage_change();
                    self.begin_wave_stage(
                        world,
                        loot,
                        rng,
                        transition.target_stage(),
                        transition.spawn_location(),
                    );
                    return;
                }
            }
        }

        if !transition.is_finished() {
            self.transition = Some(transition);
        }
    }

    // ── 3. Stage flow ───────────────────────────────────────────

    /// Begin the transition into the next stage: stage 11 is entered
    /// immediately, wave stages go through the beam animation, and
    /// advancing past the final stage wraps around to a stop.
    pub fn next_stage<W, T, R>(&mut self, world: &mut W, terrain: &T, rng: &mut R)
    where
        W: WorldHost,
        T: TerrainQuery,
        R: Rng,
    {
        let target = self.record.stage_number() + 1;
        if target > GUARDIAN_STAGE {
            self.force_stop(world);
            return;
        }
        if target == GUARDIAN_STAGE {
            self.expose_guardian(world);
        } else {
            self.animate_stage(world, terrain, rng, target);
        }
    }

    /// Start the beam animation toward the given wave stage, consuming one
    /// ritual object when it completes. With no ritual objects left the
    /// animation is skipped and the stage starts on the next tick.
    fn animate_stage<W, T, R>(&mut self, world: &mut W, terrain: &T, rng: &mut R, target: u8)
    where
        W: WorldHost,
        T: TerrainQuery,
        R: Rng,
    {
        self.record.set_target_stage_number(target);
        self.persist();

        let spawn = boss_spawn_location(terrain, rng);
        match self.ritual_objects.iter().next().copied() {
            Some(object) => {
                world.play_effect(spawn, Effect::LightningStrike);
                self.transition = Some(StageTransition::new(target, object, spawn, self.now, rng));
            }
            None => {
                warn!(
                    to_stage = target,
                    "no ritual objects left, starting the stage without a transition"
                );
                // Starting on the next tick keeps the spawn path inside
                // the tick driver, which has the loot collaborator.
                self.record.finish_stage_change();
                self.pending_immediate_stage = Some((target, spawn));
            }
        }
    }

    /// Spawn and announce a wave stage at the given location.
    ///
    /// The stage's loot table decides the boss set; every spawned creature
    /// is tagged, tracked, counted into the shared health pool and aimed
    /// at a random nearby player.
    fn begin_wave_stage<W, L, R>(
        &mut self,
        world: &mut W,
        loot: &mut L,
        rng: &mut R,
        stage_number: u8,
        spawn: Location,
    ) where
        W: WorldHost,
        L: LootTables,
        R: Rng,
    {
        self.record.jump_to_stage(stage_number);
        self.record.total_boss_max_health = 0.0;

        let Some(stage) = self.catalog.get(stage_number) else {
            return;
        };
        let table_id = stage.loot_table_id();

        let mobs = table_id
            .as_deref()
            .and_then(|table| loot.generate_drops(table, spawn))
            .map(|drops| drops.mobs)
            .unwrap_or_default();
        if mobs.is_empty() {
            warn!(
                stage = stage_number,
                table = table_id.as_deref().unwrap_or(""),
                "stage loot table spawned no bosses"
            );
        }

        let players = self.nearby_players(world);
        for &id in &mobs {
            world.add_tag(id, BOSS_TAG);
            world.add_tag(id, FIGHT_ENTITY_TAG);
            let _ = self.bosses.insert(id);
            let _ = self.last_damage_tick.insert(id, self.now);
            self.record.total_boss_max_health += world.max_health(id);
            if world.can_target_players(id) && !players.is_empty() {
                let target = players[rng.gen_range(0..players.len())];
                world.set_attack_target(id, target);
            }
        }

        info!(
            stage = stage_number,
            bosses = mobs.len(),
            total_max_health = self.record.total_boss_max_health,
            %spawn,
            "stage started"
        );

        let stage = self.catalog.get(stage_number).cloned();
        if let Some(stage) = stage {
            stage.announce(world, &players, self.record.owner, spawn);
        }

        self.bar_fraction = 1.0;
        self.refresh_indicator(world);
        self.persist();
    }

    /// Enter the final stage: the guardian drops its shield and fights.
    fn expose_guardian<W: WorldHost>(&mut self, world: &mut W) {
        self.record.jump_to_stage(GUARDIAN_STAGE);
        let Some(guardian) = world.guardian() else {
            warn!("entering the final stage with no guardian linked");
            self.persist();
            return;
        };
        world.set_invulnerable(guardian, false);

        let players = self.nearby_players(world);
        let spawn = world.entity_location(guardian).unwrap_or_default();
        let stage = self.catalog.get(GUARDIAN_STAGE).cloned();
        if let Some(stage) = stage {
            stage.announce(world, &players, self.record.owner, spawn);
        }
        info!("guardian exposed, final stage underway");

        self.refresh_indicator(world);
        self.persist();
    }

    /// Remove the live wave and every loose fight remnant: tagged boss and
    /// support mobs whether tracked or not, plus projectiles carrying the
    /// fight tag.
    pub(crate) fn clean_up_wave_remnants<W: WorldHost>(&mut self, world: &mut W) {
        for id in world.loaded_entities() {
            if !world.is_valid(id) {
                continue;
            }
            let tagged_projectile = world.entity_kind(id) == Some(EntityKind::Projectile)
                && world.has_tag_or_group(id, FIGHT_ENTITY_TAG);
            if tagged_projectile
                || world.has_tag_or_group(id, BOSS_TAG)
                || world.has_tag_or_group(id, SUPPORT_TAG)
            {
                world.remove_entity(id);
            }
        }
        self.bosses.clear();
        self.last_damage_tick.clear();
    }

    /// Remove `count` ritual objects from the world, oldest tracked first.
    fn despawn_ritual_objects<W: WorldHost>(&mut self, world: &mut W, count: usize) {
        for _ in 0..count {
            let Some(&object) = self.ritual_objects.iter().next() else {
                return;
            };
            let _ = self.ritual_objects.remove(&object);
            world.remove_entity(object);
        }
    }

    /// Reset the encounter to idle, removing every tracked fight entity
    /// and hiding the indicator immediately. The prize ledger survives.
    pub fn force_stop<W: WorldHost>(&mut self, world: &mut W) {
        self.transition = None;
        self.pending_immediate_stage = None;
        self.deferred.clear();

        let tracked: Vec<EntityId> = self
            .ritual_objects
            .iter()
            .chain(self.summoning_objects.iter())
            .copied()
            .collect();
        for id in tracked {
            world.remove_entity(id);
        }
        for guardian in world.guardian_instances() {
            world.remove_entity(guardian);
        }
        self.clean_up_wave_remnants(world);
        self.ritual_objects.clear();
        self.summoning_objects.clear();

        self.record.jump_to_stage(0);
        self.record.total_boss_max_health = 0.0;
        self.record.owner = None;
        self.bar_fraction = 1.0;
        world.update_indicator(&IndicatorView::hidden());
        info!("fight force-stopped");
        self.persist();
    }

    /// Jump the fight forward to the given stage, consuming the ritual
    /// objects the skipped transitions would have used and starting the
    /// target stage immediately.
    ///
    /// Stage 0 stops the fight and the current stage is a no-op; skipping
    /// backwards is an error.
    pub fn skip_to_stage<W, L, T, R>(
        &mut self,
        world: &mut W,
        loot: &mut L,
        terrain: &T,
        rng: &mut R,
        target: u8,
    ) -> Result<SkipOutcome, StageCommandError>
    where
        W: WorldHost,
        L: LootTables,
        T: TerrainQuery,
        R: Rng,
    {
        if target > GUARDIAN_STAGE {
            return Err(StageCommandError::InvalidStage(target));
        }
        if target == 0 {
            self.force_stop(world);
            return Ok(SkipOutcome::Stopped);
        }
        let current = self.record.stage_number();
        if target < current {
            return Err(StageCommandError::BackwardSkip {
                from: current,
                to: target,
            });
        }
        if target == current {
            return Ok(SkipOutcome::AlreadyThere);
        }
        if world.guardian().is_none() {
            return Err(StageCommandError::NoGuardian);
        }

        self.transition = None;
        // The current wave does not carry over into the skipped-to stage.
        self.clean_up_wave_remnants(world);
        self.despawn_ritual_objects(world, usize::from(target - current));
        if target == GUARDIAN_STAGE {
            self.expose_guardian(world);
        } else {
            let spawn = boss_spawn_location(terrain, rng);
            self.begin_wave_stage(world, loot, rng, target, spawn);
        }
        Ok(SkipOutcome::Started)
    }

    // ── 4. Entity events ────────────────────────────────────────

    /// A creature appeared in the arena world.
    pub fn on_creature_spawn<W, T, R>(
        &mut self,
        world: &mut W,
        terrain: &T,
        rng: &mut R,
        id: EntityId,
        kind: EntityKind,
        reason: SpawnReason,
    ) where
        W: WorldHost,
        T: TerrainQuery,
        R: Rng,
    {
        if kind != EntityKind::Guardian {
            return;
        }
        world.add_tag(id, FIGHT_ENTITY_TAG);
        world.set_invulnerable(id, self.record.stage_number() < GUARDIAN_STAGE);

        // A guardian summoned through the ritual path with the fight idle
        // is the cue to open stage 1.
        if reason == SpawnReason::Ritual
            && !self.record.is_fight_happening()
            && !self.record.is_stage_changing()
        {
            info!("guardian summoned, opening the first stage");
            self.next_stage(world, terrain, rng);
        }
    }

    /// A non-creature object (a beam crystal) appeared.
    ///
    /// Objects raised on the pillar circle while the summoning sequence
    /// runs become the ten ritual objects; objects at the four summoning
    /// positions are tracked as summoning objects. Protection is deferred
    /// one tick so the host finishes wiring the entity first.
    pub fn on_object_spawn<W: WorldHost>(&mut self, world: &mut W, id: EntityId, loc: Location) {
        if self.collecting_pillars && is_pillar_location(loc) {
            world.add_tag(id, PILLAR_TAG);
            world.add_tag(id, FIGHT_ENTITY_TAG);
            let _ = self.ritual_objects.insert(id);
            world.play_effect(loc, Effect::LightningStrike);
            self.deferred
                .push((self.now + 1, Deferred::Protect(id)));
        } else if is_summoning_location(loc) {
            world.add_tag(id, SUMMONING_TAG);
            let _ = self.summoning_objects.insert(id);
            self.deferred
                .push((self.now + 1, Deferred::Protect(id)));
        }
    }

    fn protect_object<W: WorldHost>(&mut self, world: &mut W, id: EntityId) {
        if world.is_valid(id) {
            world.set_invulnerable(id, true);
        } else {
            let _ = self.ritual_objects.remove(&id);
            let _ = self.summoning_objects.remove(&id);
        }
    }

    /// A tracked-capable entity died.
    pub fn on_entity_death<W, L, T, R>(
        &mut self,
        world: &mut W,
        loot: &mut L,
        terrain: &T,
        rng: &mut R,
        id: EntityId,
        kind: EntityKind,
    ) where
        W: WorldHost,
        L: LootTables,
        T: TerrainQuery,
        R: Rng,
    {
        if kind == EntityKind::Guardian {
            self.on_guardian_death(world, loot, id);
            return;
        }

        if !self.bosses.remove(&id) {
            return;
        }
        let _ = self.last_damage_tick.remove(&id);

        if self.bosses.is_empty()
            && self.record.is_fight_happening()
            && !self.record.is_stage_changing()
        {
            info!(stage = self.record.stage_number(), "wave cleared");
            self.next_stage(world, terrain, rng);
        } else {
            self.refresh_indicator(world);
        }
    }

    /// The guardian died. At the final stage this resolves the prize; at
    /// any earlier stage it means the fight collapsed and is reset.
    fn on_guardian_death<W, L>(&mut self, world: &mut W, loot: &mut L, id: EntityId)
    where
        W: WorldHost,
        L: LootTables,
    {
        if self.record.stage_number() == GUARDIAN_STAGE {
            self.award_prize(world, loot);
        } else if self.record.is_fight_happening() {
            warn!(%id, "guardian died before the final stage, resetting the fight");
        }
        // The guardian is gone either way; the remaining fight entities
        // have nothing left to guard.
        self.force_stop(world);
    }

    /// Hand the guardian prize to the fight owner, or book it as
    /// unclaimed when the owner is offline or has no inventory space.
    /// Ownership is cleared whichever way it resolves.
    fn award_prize<W, L>(&mut self, world: &mut W, loot: &mut L)
    where
        W: WorldHost,
        L: LootTables,
    {
        let Some(owner) = self.record.owner.take() else {
            warn!("guardian defeated with no recorded fight owner");
            return;
        };

        let name = world.player_name(owner);
        let nearby = self.nearby_players(world);
        for &player in &nearby {
            world.send_message(
                player,
                &format!("{name} was awarded the prize for defeating the guardian."),
            );
        }

        if world.is_online(owner) && world.free_inventory_slots(owner) > 0 {
            match loot.choose_one_item(GUARDIAN_LOOT_TABLE) {
                Some(item) => {
                    world.give_items(owner, std::slice::from_ref(&item));
                    world.send_message(owner, "The guardian's prize is yours.");
                    info!(owner = %owner, item = item.item_id, "prize delivered");
                }
                None => warn!(table = GUARDIAN_LOOT_TABLE, "prize table yielded nothing"),
            }
        } else {
            self.record.add_unclaimed_prize(owner);
            if world.is_online(owner) {
                world.send_message(
                    owner,
                    "Your inventory is full. Use the prize command to claim your reward later.",
                );
            } else {
                for &player in &nearby {
                    world.send_message(player, "They can claim it when they log in.");
                }
            }
            info!(owner = %owner, "prize booked as unclaimed");
        }
    }

    /// Early damage gate, before the host applies the hit.
    pub fn on_entity_damage_early<W: WorldHost>(
        &self,
        world: &W,
        id: EntityId,
        kind: EntityKind,
    ) -> DamageVerdict {
        let _ = world;
        if self.tracked_object_verdict(id) == DamageVerdict::Deny {
            return DamageVerdict::Deny;
        }
        if kind == EntityKind::Guardian && self.record.stage_number() < GUARDIAN_STAGE {
            return DamageVerdict::Deny;
        }
        DamageVerdict::Allow
    }

    /// An entity is about to catch fire. Tracked objects never burn.
    pub fn on_entity_combust(&self, id: EntityId) -> DamageVerdict {
        self.tracked_object_verdict(id)
    }

    /// An explosion is about to damage an entity. Tracked objects are
    /// immune.
    pub fn on_entity_explode(&self, id: EntityId) -> DamageVerdict {
        self.tracked_object_verdict(id)
    }

    fn tracked_object_verdict(&self, id: EntityId) -> DamageVerdict {
        if self.ritual_objects.contains(&id) || self.summoning_objects.contains(&id) {
            DamageVerdict::Deny
        } else {
            DamageVerdict::Allow
        }
    }

    /// Late damage notification, after the host applied the hit. Refreshes
    /// the boss's idle timer and walks the indicator down by the damage
    /// fraction without waiting for the next supervisor pass.
    pub fn on_entity_damage_late<W: WorldHost>(&mut self, world: &mut W, id: EntityId, damage: f64) {
        if !self.bosses.contains(&id) {
            return;
        }
        let _ = self.last_damage_tick.insert(id, self.now);

        let total = self.record.total_boss_max_health;
        if total >= 0.001 {
            self.bar_fraction = (self.bar_fraction - damage / total).clamp(0.0, 1.0);
            self.push_indicator(world);
        }
    }

    /// A projectile was launched; projectiles from fight entities inherit
    /// the fight tag so the portal gate applies to them too.
    pub fn on_projectile_launch<W: WorldHost>(
        &mut self,
        world: &mut W,
        projectile: EntityId,
        shooter: Option<EntityId>,
    ) {
        let Some(shooter) = shooter else {
            return;
        };
        if self.bosses.contains(&shooter) || world.has_tag_or_group(shooter, FIGHT_ENTITY_TAG) {
            world.add_tag(projectile, FIGHT_ENTITY_TAG);
        }
    }

    /// A portal is about to move an entity out of the arena world. Fight
    /// entities are kept in; straying bosses are put back in the ring.
    pub fn on_portal_transit<W, T, R>(
        &mut self,
        world: &mut W,
        terrain: &T,
        rng: &mut R,
        id: EntityId,
    ) -> bool
    where
        W: WorldHost,
        T: TerrainQuery,
        R: Rng,
    {
        let tracked = self.bosses.contains(&id) || world.has_tag_or_group(id, FIGHT_ENTITY_TAG);
        if !tracked {
            return false;
        }
        if self.bosses.contains(&id) {
            let back = boss_spawn_location(terrain, rng);
            world.teleport(id, back);
            world.play_effect(back, Effect::TeleportSwirl);
            let _ = self.last_damage_tick.insert(id, self.now);
        }
        true
    }

    /// A ritual or summoning object was removed by the host (the summon
    /// consuming the summoning set, or a world edit).
    pub fn on_object_removed(&mut self, id: EntityId) {
        let _ = self.ritual_objects.remove(&id);
        let _ = self.summoning_objects.remove(&id);
    }

    /// Entities in a freshly loaded chunk, to re-track tagged ones.
    pub fn on_chunk_load<W: WorldHost>(&mut self, world: &mut W, entities: &[EntityId]) {
        for &id in entities {
            self.track_discovered(world, id);
        }
    }

    /// Entities in a chunk about to unload. Objects are dropped from the
    /// tracked sets; they are rediscovered by tag when the chunk returns.
    pub fn on_chunk_unload(&mut self, entities: &[EntityId]) {
        for id in entities {
            let _ = self.ritual_objects.remove(id);
            let _ = self.summoning_objects.remove(id);
        }
    }

    /// The host's summoning sequence changed phase.
    pub fn on_guardian_phase_change(&mut self, phase: GuardianPhase) {
        self.collecting_pillars = phase == GuardianPhase::SummoningPillars;
    }

    // ── 5. Player events ────────────────────────────────────────

    /// A player is about to place an object at the given location.
    ///
    /// Placements that would corrupt the encounter (extra objects on the
    /// pillar circle, summoning objects while a guardian already exists)
    /// are denied. The player completing the four-object summoning set
    /// becomes the fight owner.
    pub fn on_place_attempt<W: WorldHost>(
        &mut self,
        world: &mut W,
        player: PlayerId,
        loc: Location,
    ) -> PlaceVerdict {
        if is_pillar_location(loc)
            && (self.record.is_fight_happening() || self.record.is_stage_changing())
        {
            world.send_message(player, "The ritual objects cannot be replaced mid-fight.");
            return PlaceVerdict::Deny;
        }
        if is_summoning_location(loc) {
            if world.guardian().is_some() || self.record.is_fight_happening() {
                world.send_message(player, "The guardian has already been summoned.");
                return PlaceVerdict::Deny;
            }
            if self.summoning_objects.len() == SUMMONING_OBJECT_COUNT - 1 {
                self.record.owner = Some(player);
                self.persist();
                info!(owner = %player, "fight owner set by the final summoning object");
            }
        }
        PlaceVerdict::Allow
    }

    /// A player logged in; remind them of unclaimed prizes after the
    /// login noise settles.
    pub fn on_player_login(&mut self, player: PlayerId) {
        if self.record.unclaimed_prizes(player) > 0 {
            self.deferred.push((
                self.now + LOGIN_REMINDER_DELAY_TICKS,
                Deferred::RemindUnclaimedPrizes(player),
            ));
        }
    }

    fn remind_unclaimed_prizes<W: WorldHost>(&mut self, world: &mut W, player: PlayerId) {
        let count = self.record.unclaimed_prizes(player);
        if count > 0 && world.is_online(player) {
            world.send_message(
                player,
                &format!("You have {count} unclaimed guardian prize(s). Use the prize command to collect them."),
            );
        }
    }

    /// Hand over one unclaimed prize, if the player has any and has room.
    /// Returns the message to show the player.
    pub fn claim_prize<W, L>(&mut self, world: &mut W, loot: &mut L, player: PlayerId) -> String
    where
        W: WorldHost,
        L: LootTables,
    {
        if self.record.unclaimed_prizes(player) == 0 {
            return "You have no unclaimed prizes.".to_string();
        }
        if world.free_inventory_slots(player) == 0 {
            return "Your inventory is full; make room first.".to_string();
        }
        let _ = self.record.claim_unclaimed_prize(player);
        let message = match loot.choose_one_item(GUARDIAN_LOOT_TABLE) {
            Some(item) => {
                world.give_items(player, std::slice::from_ref(&item));
                "Prize claimed.".to_string()
            }
            None => {
                warn!(table = GUARDIAN_LOOT_TABLE, "prize table yielded nothing");
                "The prize table is empty; tell an administrator.".to_string()
            }
        };
        self.persist();
        message
    }

    // ── 6. Shared helpers ───────────────────────────────────────

    /// Online players within the announcement radius of the arena origin.
    pub(crate) fn nearby_players<W: WorldHost>(&self, world: &W) -> Vec<PlayerId> {
        world
            .online_players()
            .into_iter()
            .filter(|&p| {
                world
                    .player_location(p)
                    .is_some_and(|loc| loc.magnitude_2d() <= NEARBY_RADIUS)
            })
            .collect()
    }

    /// Snapshot of the tracked boss ids.
    pub fn boss_ids(&self) -> Vec<EntityId> {
        self.bosses.iter().copied().collect()
    }

    pub(crate) fn drop_boss(&mut self, id: EntityId) {
        let _ = self.bosses.remove(&id);
        let _ = self.last_damage_tick.remove(&id);
    }

    pub(crate) fn last_damage(&self, id: EntityId) -> u64 {
        self.last_damage_tick.get(&id).copied().unwrap_or(self.now)
    }

    pub(crate) fn touch_damage_clock(&mut self, id: EntityId) {
        let _ = self.last_damage_tick.insert(id, self.now);
    }

    /// Re-read the settings file and rebuild the record and catalog from
    /// it, discarding unsaved in-memory edits.
    pub fn reload_settings(&mut self) {
        self.store.reload();
        self.record = FightRecord::load(&self.store);
        self.catalog = StageCatalog::load(&self.store);
        info!("fight settings reloaded");
    }

    /// Write the durable record and flush the settings file.
    pub fn persist(&mut self) {
        self.record.store(&mut self.store);
        self.catalog.store(&mut self.store);
        if let Err(err) = self.store.save() {
            error!(error = %err, "could not save fight settings");
        }
    }
}

/// Whether a location sits on the ring of ritual pillars.
fn is_pillar_location(loc: Location) -> bool {
    (loc.magnitude_2d() - PILLAR_CIRCLE_RADIUS).abs()
        <= PILLAR_CIRCLE_RADIUS * PILLAR_CIRCLE_TOLERANCE
}

/// Whether a location is one of the four summoning positions on the
/// central structure.
fn is_summoning_location(loc: Location) -> bool {
    if loc.block_y() < SUMMONING_MIN_Y {
        return false;
    }
    let (x, z) = (loc.block_x().abs(), loc.block_z().abs());
    (x, z) == (3, 0) || (x, z) == (0, 3)
}
