//! Periodic supervision of the live wave.
//!
//! Runs from the tick driver: drops invalid bosses, returns strays to the
//! arena, and keeps the progress indicator in sync with the bosses'
//! remaining health.

use rand::Rng;
use tracing::{info, warn};

use crate::core::constants::{
    BOSS_CONTAINMENT_RADIUS, BOSS_DAMAGE_TIMEOUT_TICKS, GUARDIAN_STAGE, MIN_BOSS_Y, WAVE_STAGES,
};
use crate::fight::controller::FightController;
use crate::fight::spawn::boss_spawn_location;
use crate::host::{Effect, IndicatorView, TerrainQuery, WorldHost};

impl FightController {
    /// Check every tracked boss and return the strays to the ring.
    ///
    /// A boss is returned when it fell below the arena floor, wandered
    /// past the containment radius, or went undamaged for the timeout
    /// (stuck somewhere players cannot reach it).
    pub(crate) fn containment_pass<W, T, R>(&mut self, world: &mut W, terrain: &T, rng: &mut R)
    where
        W: WorldHost,
        T: TerrainQuery,
        R: Rng,
    {
        for id in self.boss_ids() {
            if !world.is_valid(id) {
                self.drop_boss(id);
                continue;
            }
            let Some(loc) = world.entity_location(id) else {
                continue;
            };

            let idle_for = self.now().saturating_sub(self.last_damage(id));
            let stray = loc.y < MIN_BOSS_Y
                || loc.magnitude_2d() > BOSS_CONTAINMENT_RADIUS
                || idle_for >= BOSS_DAMAGE_TIMEOUT_TICKS;
            if !stray {
                continue;
            }

            let back = boss_spawn_location(terrain, rng);
            world.teleport(id, back);
            world.play_effect(back, Effect::TeleportSwirl);
            self.touch_damage_clock(id);
            info!(boss = %id, from = %loc, to = %back, "returned a stray boss to the arena");
        }
    }

    /// Recompute and push the progress indicator from live boss health.
    ///
    /// The indicator only shows during a wave stage with at least one boss
    /// alive; everyone out of range is removed from its audience.
    pub(crate) fn refresh_indicator<W: WorldHost>(&mut self, world: &mut W) {
        let stage_number = self.record().stage_number();
        let wave_stage = (1..=WAVE_STAGES).contains(&stage_number);
        if !wave_stage || self.boss_count() == 0 {
            world.update_indicator(&IndicatorView::hidden());
            return;
        }

        let total = self.record().total_boss_max_health;
        if total < 0.001 {
            warn!(stage = stage_number, "wave has no recorded boss health pool");
            world.update_indicator(&IndicatorView::hidden());
            return;
        }
        let remaining: f64 = self
            .boss_ids()
            .iter()
            .map(|&id| world.health(id))
            .sum();
        self.bar_fraction = (remaining / total).clamp(0.0, 1.0);
        self.push_indicator(world);
    }

    /// Push the current indicator state without recomputing the fraction.
    pub(crate) fn push_indicator<W: WorldHost>(&mut self, world: &mut W) {
        let stage_number = self.record().stage_number();
        let Some(stage) = self.catalog().get(stage_number) else {
            world.update_indicator(&IndicatorView::hidden());
            return;
        };
        let view = IndicatorView {
            visible: true,
            color: stage.bar_color,
            title: stage.format(&stage.title),
            fraction: self.bar_fraction,
            players: self.nearby_players(world),
        };
        world.update_indicator(&view);
    }

    /// Remove extra guardian instances the host spuriously spawned.
    ///
    /// The instance the host's battle state is linked to is kept; with no
    /// linked instance, the youngest survives.
    pub(crate) fn cull_surplus_guardians<W: WorldHost>(&mut self, world: &mut W) {
        let instances = world.guardian_instances();
        if instances.len() <= 1 {
            return;
        }

        let keep = world
            .guardian()
            .filter(|linked| instances.contains(linked))
            .or_else(|| {
                instances
                    .iter()
                    .copied()
                    .min_by_key(|&id| world.age_ticks(id))
            });
        let Some(keep) = keep else {
            return;
        };

        let mut culled = 0usize;
        for id in instances {
            if id != keep {
                world.remove_entity(id);
                culled += 1;
            }
        }
        // The retained instance may be a fresh spawn with no shield yet.
        world.set_invulnerable(keep, self.record().stage_number() < GUARDIAN_STAGE);
        warn!(culled, kept = %keep, "removed surplus guardian instances");
    }
}
