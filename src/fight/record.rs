//! The durable fight record.
//!
//! The only encounter state that must survive a restart: everything else is
//! either re-derivable by scanning the world for durability tags (ritual
//! objects, bosses) or session-scoped (the progress indicator).

use std::collections::BTreeMap;

use tracing::warn;
use uuid::Uuid;

use crate::core::constants::GUARDIAN_STAGE;
use crate::host::PlayerId;
use crate::settings::SettingsStore;

const STAGE_NUMBER_KEY: &str = "state.stage-number";
const TARGET_STAGE_NUMBER_KEY: &str = "state.new-stage-number";
const TOTAL_BOSS_MAX_HEALTH_KEY: &str = "state.total-boss-max-health";
const FIGHT_OWNER_KEY: &str = "state.fight-owner";
const UNCLAIMED_PRIZES_PREFIX: &str = "state.unclaimed-prizes.";

/// Durable snapshot of the current fight.
///
/// Stage numbers run from 0 (idle) through 10 (waves) to 11 (guardian
/// exposed). While a wave transition is in flight, `target_stage_number`
/// leads `stage_number` by one; the two are re-synced when the transition
/// completes, which is how a restart knows to resume the animation.
#[derive(Debug, Clone, Default)]
pub struct FightRecord {
    stage_number: u8,
    target_stage_number: u8,
    /// Sum of max health over all bosses spawned for the active stage.
    ///
    /// A stage can spawn a random number of bosses, some of which may have
    /// already died, so this cannot be re-derived after a restart.
    pub total_boss_max_health: f64,
    /// The player who placed the final summoning object and therefore owns
    /// the guardian's prize.
    pub owner: Option<PlayerId>,
    unclaimed_prizes: BTreeMap<Uuid, u32>,
}

impl FightRecord {
    pub fn stage_number(&self) -> u8 {
        self.stage_number
    }

    pub fn target_stage_number(&self) -> u8 {
        self.target_stage_number
    }

    /// True while the encounter is in progress (any stage past idle).
    pub fn is_fight_happening(&self) -> bool {
        self.stage_number > 0
    }

    /// True while a stage transition is part-way through.
    pub fn is_stage_changing(&self) -> bool {
        self.stage_number != self.target_stage_number
    }

    pub fn set_stage_number(&mut self, stage: u8) {
        assert!(stage <= GUARDIAN_STAGE, "invalid stage number: {stage}");
        self.stage_number = stage;
    }

    /// Record the stage a transition is heading toward.
    pub fn set_target_stage_number(&mut self, stage: u8) {
        assert!(stage <= GUARDIAN_STAGE, "invalid stage number: {stage}");
        self.target_stage_number = stage;
    }

    /// Complete a transition by adopting the target stage number.
    pub fn finish_stage_change(&mut self) {
        self.stage_number = self.target_stage_number;
    }

    /// Jump both stage numbers to the given value, ending any transition.
    pub fn jump_to_stage(&mut self, stage: u8) {
        self.set_stage_number(stage);
        self.set_target_stage_number(stage);
    }

    // ── Unclaimed prizes ────────────────────────────────────────

    pub fn unclaimed_prizes(&self, player: PlayerId) -> u32 {
        self.unclaimed_prizes.get(&player.0).copied().unwrap_or(0)
    }

    /// Record one more unclaimed prize for the player.
    pub fn add_unclaimed_prize(&mut self, player: PlayerId) {
        *self.unclaimed_prizes.entry(player.0).or_insert(0) += 1;
    }

    /// Consume one unclaimed prize, if the player has any. The ledger never
    /// keeps zero-count entries.
    pub fn claim_unclaimed_prize(&mut self, player: PlayerId) -> bool {
        match self.unclaimed_prizes.get_mut(&player.0) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                let _ = self.unclaimed_prizes.remove(&player.0);
                true
            }
            None => false,
        }
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Load the record from the settings store.
    ///
    /// Malformed entries degrade rather than fail: an unparseable owner is
    /// dropped, an unparseable prize-ledger id is skipped with a warning,
    /// and the rest of the record still loads.
    pub fn load(store: &SettingsStore) -> Self {
        let raw_stage = store.get_i64(STAGE_NUMBER_KEY, 0);
        let raw_target = store.get_i64(TARGET_STAGE_NUMBER_KEY, 0);
        let mut record = FightRecord {
            stage_number: clamp_stage(raw_stage, STAGE_NUMBER_KEY),
            target_stage_number: clamp_stage(raw_target, TARGET_STAGE_NUMBER_KEY),
            total_boss_max_health: store.get_f64(TOTAL_BOSS_MAX_HEALTH_KEY, 0.0).max(0.0),
            owner: None,
            unclaimed_prizes: BTreeMap::new(),
        };

        if let Some(text) = store.get_str(FIGHT_OWNER_KEY) {
            match text.parse::<Uuid>() {
                Ok(uuid) => record.owner = Some(PlayerId(uuid)),
                Err(_) => warn!(owner = text, "ignoring unparseable fight owner"),
            }
        }

        for key in store.keys_with_prefix(UNCLAIMED_PRIZES_PREFIX) {
            let raw_id = &key[UNCLAIMED_PRIZES_PREFIX.len()..];
            let Ok(uuid) = raw_id.parse::<Uuid>() else {
                warn!(id = raw_id, "unclaimed prize registered to invalid id");
                continue;
            };
            let count = store.get_i64(&key, 0);
            if count > 0 {
                let _ = record.unclaimed_prizes.insert(uuid, count as u32);
            }
        }

        record
    }

    /// Write the record into the settings store.
    pub fn store(&self, store: &mut SettingsStore) {
        store.set_i64(STAGE_NUMBER_KEY, i64::from(self.stage_number));
        store.set_i64(TARGET_STAGE_NUMBER_KEY, i64::from(self.target_stage_number));
        store.set_f64(TOTAL_BOSS_MAX_HEALTH_KEY, self.total_boss_max_health);
        match self.owner {
            Some(owner) => store.set_str(FIGHT_OWNER_KEY, owner.0.to_string()),
            None => store.remove(FIGHT_OWNER_KEY),
        }
        store.remove_prefix(UNCLAIMED_PRIZES_PREFIX);
        for (uuid, count) in &self.unclaimed_prizes {
            store.set_i64(
                &format!("{UNCLAIMED_PRIZES_PREFIX}{uuid}"),
                i64::from(*count),
            );
        }
    }
}

fn clamp_stage(raw: i64, key: &str) -> u8 {
    if (0..=i64::from(GUARDIAN_STAGE)).contains(&raw) {
        raw as u8
    } else {
        warn!(key, value = raw, "persisted stage number out of bounds, resetting to 0");
        0
    }
}
