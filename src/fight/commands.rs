//! The administrative and player command surface.
//!
//! The host's command framework parses the raw text; this module takes the
//! structured [`Command`] and applies it to the controller, returning the
//! feedback lines to show whoever ran it.

use rand::Rng;
use thiserror::Error;
use tracing::info;

use crate::core::constants::{GUARDIAN_STAGE, WAVE_STAGES};
use crate::fight::controller::{FightController, SkipOutcome, StageCommandError};
use crate::fight::stage::wave_loot_table_id;
use crate::host::{BarColor, LootTables, PlayerId, TerrainQuery, WorldHost};

/// A parsed fight command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Force-stop the encounter and despawn everything it spawned.
    Stop,
    /// Begin the next stage immediately.
    Next,
    /// Jump forward to the given wave stage.
    Skip { stage: u8 },
    /// Exchange two wave stages' configurations and loot tables.
    Swap { a: u8, b: u8 },
    /// Move a wave stage to a new position, shifting the ones between.
    Move { from: u8, to: u8 },
    /// Show one stage's configuration.
    ShowStage { stage: u8 },
    SetBarColor { stage: u8, color: BarColor },
    SetTitle { stage: u8, text: String },
    SetSubtitle { stage: u8, text: String },
    SetMessage { stage: u8, text: String },
    SetPlayerCommand { stage: u8, text: String },
    SetStageCommand { stage: u8, text: String },
    /// Re-read the settings file, discarding unsaved edits.
    Reload,
    /// List everything the fight is tracking.
    Info,
    /// Per-player fight status.
    Status { player: PlayerId },
    /// Hand over one unclaimed guardian prize.
    ClaimPrize { player: PlayerId },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Stage(#[from] StageCommandError),
    #[error("stage number {0} is out of range (wave stages run 1 to {WAVE_STAGES})")]
    StageOutOfRange(u8),
}

fn wave_stage(stage: u8) -> Result<u8, CommandError> {
    if (1..=WAVE_STAGES).contains(&stage) {
        Ok(stage)
    } else {
        Err(CommandError::StageOutOfRange(stage))
    }
}

/// Apply one command, returning the lines to echo back to the sender.
pub fn execute<W, L, T, R>(
    controller: &mut FightController,
    world: &mut W,
    loot: &mut L,
    terrain: &T,
    rng: &mut R,
    command: Command,
) -> Result<Vec<String>, CommandError>
where
    W: WorldHost,
    L: LootTables,
    T: TerrainQuery,
    R: Rng,
{
    match command {
        Command::Stop => {
            controller.force_stop(world);
            Ok(vec!["The fight has been stopped.".to_string()])
        }

        Command::Next => {
            if world.guardian().is_none() {
                return Err(StageCommandError::NoGuardian.into());
            }
            if controller.record().stage_number() == GUARDIAN_STAGE {
                controller.next_stage(world, terrain, rng);
                return Ok(vec!["The fight has been stopped.".to_string()]);
            }
            // The live wave does not carry over into the next stage.
            controller.clean_up_wave_remnants(world);
            controller.next_stage(world, terrain, rng);
            Ok(vec![format!(
                "Moving on to stage {}.",
                controller.record().target_stage_number()
            )])
        }

        Command::Skip { stage } => {
            match controller.skip_to_stage(world, loot, terrain, rng, stage)? {
                SkipOutcome::Stopped => Ok(vec!["The fight has been stopped.".to_string()]),
                SkipOutcome::AlreadyThere => {
                    Ok(vec![format!("You're already in stage {stage}.")])
                }
                SkipOutcome::Started => Ok(vec![format!("Skipped ahead to stage {stage}.")]),
            }
        }

        Command::Swap { a, b } => {
            let (a, b) = (wave_stage(a)?, wave_stage(b)?);
            controller.catalog_mut().swap(a, b);
            swap_stage_tables(loot, a, b);
            controller.persist();
            info!(a, b, "stages swapped");
            Ok(vec![format!("Stages {a} and {b} have been swapped.")])
        }

        Command::Move { from, to } => {
            let (from, to) = (wave_stage(from)?, wave_stage(to)?);
            let swaps = controller.catalog_mut().move_stage(from, to);
            for (a, b) in swaps {
                swap_stage_tables(loot, a, b);
            }
            controller.persist();
            info!(from, to, "stage moved");
            Ok(vec![format!("Stage {from} is now stage {to}.")])
        }

        Command::ShowStage { stage } => {
            let stage = wave_stage(stage)?;
            let Some(s) = controller.catalog().get(stage) else {
                return Err(CommandError::StageOutOfRange(stage));
            };
            Ok(vec![
                format!("Stage {stage}:"),
                format!("  barcolor: {}", s.bar_color.as_str()),
                format!("  title: {}", s.title),
                format!("  subtitle: {}", s.subtitle),
                format!("  message: {}", s.message),
                format!("  player-command: {}", s.player_command),
                format!("  stage-command: {}", s.stage_command),
            ])
        }

        Command::SetBarColor { stage, color } => {
            edit_stage(controller, stage, "barcolor", color.as_str(), |s| {
                s.bar_color = color;
            })
        }
        Command::SetTitle { stage, text } => {
            edit_stage(controller, stage, "title", &text.clone(), |s| s.title = text)
        }
        Command::SetSubtitle { stage, text } => {
            edit_stage(controller, stage, "subtitle", &text.clone(), |s| {
                s.subtitle = text;
            })
        }
        Command::SetMessage { stage, text } => {
            edit_stage(controller, stage, "message", &text.clone(), |s| {
                s.message = text;
            })
        }
        Command::SetPlayerCommand { stage, text } => {
            edit_stage(controller, stage, "player-command", &text.clone(), |s| {
                s.player_command = text;
            })
        }
        Command::SetStageCommand { stage, text } => {
            edit_stage(controller, stage, "stage-command", &text.clone(), |s| {
                s.stage_command = text;
            })
        }

        Command::Reload => {
            controller.reload_settings();
            Ok(vec!["Fight settings reloaded.".to_string()])
        }

        Command::Info => Ok(info_lines(controller, world, loot)),

        Command::Status { player } => {
            let record = controller.record();
            let mut lines = vec![match record.stage_number() {
                0 => "No fight is in progress.".to_string(),
                n => format!(
                    "Stage {n}, {} boss(es) remaining.",
                    controller.boss_count()
                ),
            }];
            let unclaimed = record.unclaimed_prizes(player);
            if unclaimed > 0 {
                lines.push(format!("You have {unclaimed} unclaimed prize(s)."));
            }
            Ok(lines)
        }

        Command::ClaimPrize { player } => Ok(vec![controller.claim_prize(world, loot, player)]),
    }
}

fn edit_stage(
    controller: &mut FightController,
    stage: u8,
    field: &str,
    shown: &str,
    apply: impl FnOnce(&mut crate::fight::stage::Stage),
) -> Result<Vec<String>, CommandError> {
    let stage = wave_stage(stage)?;
    let line = format!("Stage {stage} {field} set to: {shown}");
    let Some(s) = controller.catalog_mut().get_mut(stage) else {
        return Err(CommandError::StageOutOfRange(stage));
    };
    apply(s);
    controller.persist();
    Ok(vec![line])
}

fn swap_stage_tables<L: LootTables>(loot: &mut L, a: u8, b: u8) {
    let (Some(ta), Some(tb)) = (wave_loot_table_id(a), wave_loot_table_id(b)) else {
        return;
    };
    loot.swap_tables(&ta, &tb);
}

fn info_lines<W: WorldHost, L: LootTables>(
    controller: &FightController,
    world: &W,
    loot: &L,
) -> Vec<String> {
    let record = controller.record();
    let mut lines = vec![
        format!(
            "Stage {} (heading to {}).",
            record.stage_number(),
            record.target_stage_number()
        ),
        format!(
            "Tracking {} ritual object(s), {} summoning object(s), {} boss(es).",
            controller.ritual_object_count(),
            controller.summoning_object_count(),
            controller.boss_count()
        ),
    ];
    if let Some(owner) = record.owner {
        lines.push(format!("Fight owner: {}", world.player_name(owner)));
    }
    let mut bosses: Vec<_> = controller
        .boss_ids()
        .into_iter()
        .map(|id| (loot.definition_id(id).unwrap_or_else(|| "?".to_string()), id))
        .collect();
    bosses.sort();
    for (definition, id) in bosses {
        let location = world
            .entity_location(id)
            .map(|loc| loc.to_string())
            .unwrap_or_else(|| "unloaded".to_string());
        lines.push(format!(
            "  boss {id} {definition} at {location} ({:.1}/{:.1} hp)",
            world.health(id),
            world.max_health(id)
        ));
    }
    lines
}
