//! The wave-transition animation, as an explicit schedule.
//!
//! Historically this kind of sequence is written as a chain of one-shot
//! delayed closures, which keeps firing even after a force-stop resets the
//! fight. Here the whole animation is a value owned by the controller: a
//! precomputed step schedule advanced once per tick, re-validated before
//! every step, and dropped wholesale when the fight is stopped, so a stale
//! step can never act on a reset fight.

use std::collections::VecDeque;

use rand::Rng;

use crate::core::constants::STAGE_START_DELAY_TICKS;
use crate::host::{EntityId, Location};

/// How far below the spawn target the beam is pointed.
const BEAM_TARGET_DROP: f64 = 2.5;

/// Delay before the first flicker pulse, leaving the host a moment to
/// finish linking a freshly spawned guardian.
const FLICKER_LEAD_IN_TICKS: u64 = 5;

/// One scheduled step of the transition animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStep {
    /// Re-point the beam at the spawn target and toggle the glow flag.
    Flicker,
    /// Lock the beam on the final target and turn the glow off.
    BeamLock,
    /// Play the spawn-imminent cue at the target.
    SpawnCue,
    /// Consume the ritual object and begin the new stage.
    Consume,
}

/// An in-flight transition from one stage to the next.
#[derive(Debug, Clone)]
pub struct StageTransition {
    target_stage: u8,
    ritual_object: EntityId,
    spawn_location: Location,
    /// (absolute tick, step), strictly non-decreasing in tick.
    steps: VecDeque<(u64, TransitionStep)>,
}

impl StageTransition {
    /// Build the step schedule for a transition starting at `start_tick`.
    ///
    /// Flicker pulses land at pseudo-random 1-5 tick spacings until their
    /// accumulated offset reaches 60% of the total delay; the beam locks 5
    /// ticks later, the spawn cue fires at 80%, and the stage begins at
    /// the full delay.
    pub fn new<R: Rng>(
        target_stage: u8,
        ritual_object: EntityId,
        spawn_location: Location,
        start_tick: u64,
        rng: &mut R,
    ) -> Self {
        let mut steps = VecDeque::new();
        let flicker_budget = STAGE_START_DELAY_TICKS * 60 / 100;

        let mut offset = FLICKER_LEAD_IN_TICKS;
        while offset < flicker_budget {
            offset += rng.gen_range(1..=5);
            steps.push_back((start_tick + offset, TransitionStep::Flicker));
        }
        steps.push_back((start_tick + offset + 5, TransitionStep::BeamLock));
        steps.push_back((
            start_tick + STAGE_START_DELAY_TICKS * 80 / 100,
            TransitionStep::SpawnCue,
        ));
        steps.push_back((start_tick + STAGE_START_DELAY_TICKS, TransitionStep::Consume));

        Self {
            target_stage,
            ritual_object,
            spawn_location,
            steps,
        }
    }

    pub fn target_stage(&self) -> u8 {
        self.target_stage
    }

    /// The ritual object this transition will consume.
    pub fn ritual_object(&self) -> EntityId {
        self.ritual_object
    }

    /// The shared beam/spawn target for the whole sequence.
    pub fn spawn_location(&self) -> Location {
        self.spawn_location
    }

    /// Where the visual beam points: just below the spawn target.
    pub fn beam_target(&self) -> Location {
        self.spawn_location.offset(0.0, -BEAM_TARGET_DROP, 0.0)
    }

    /// Pop every step due at or before `now`, in schedule order.
    pub fn take_due_steps(&mut self, now: u64) -> Vec<TransitionStep> {
        let mut due = Vec::new();
        while let Some(&(tick, step)) = self.steps.front() {
            if tick > now {
                break;
            }
            let _ = self.steps.pop_front();
            due.push(step);
        }
        due
    }

    /// True once the final step has been taken.
    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn transition(seed: u64) -> StageTransition {
        StageTransition::new(
            3,
            EntityId(7),
            Location::new(12.0, 61.0, -4.0),
            1000,
            &mut ChaCha8Rng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_schedule_shape() {
        let mut t = transition(42);
        let all = t.take_due_steps(u64::MAX);
        assert!(t.is_finished());

        // Flickers first, then lock, cue, consume.
        let tail: Vec<_> = all[all.len() - 3..].to_vec();
        assert_eq!(
            tail,
            vec![
                TransitionStep::BeamLock,
                TransitionStep::SpawnCue,
                TransitionStep::Consume
            ]
        );
        assert!(all[..all.len() - 3]
            .iter()
            .all(|s| *s == TransitionStep::Flicker));
        // 1-5 tick spacing over a 90-tick budget bounds the pulse count.
        let flickers = all.len() - 3;
        assert!((17..=90).contains(&flickers), "flickers = {flickers}");
    }

    #[test]
    fn test_steps_fire_in_tick_order() {
        let mut t = transition(7);
        let mut ordered = Vec::new();
        for now in 1000..=1000 + STAGE_START_DELAY_TICKS {
            ordered.extend(t.take_due_steps(now));
        }
        assert!(t.is_finished());
        assert_eq!(*ordered.last().unwrap(), TransitionStep::Consume);
    }

    #[test]
    fn test_consume_lands_at_full_delay() {
        let mut t = transition(5);
        let before = t.take_due_steps(1000 + STAGE_START_DELAY_TICKS - 1);
        assert!(!before.contains(&TransitionStep::Consume));
        let last = t.take_due_steps(1000 + STAGE_START_DELAY_TICKS);
        assert_eq!(last, vec![TransitionStep::Consume]);
    }

    #[test]
    fn test_nothing_due_before_lead_in() {
        let mut t = transition(11);
        assert!(t.take_due_steps(1000 + FLICKER_LEAD_IN_TICKS).is_empty());
    }
}
