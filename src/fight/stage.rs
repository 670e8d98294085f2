//! Stage descriptors and the stage catalog.
//!
//! Ten wave stages plus the implicit stage 11 (guardian only). Each stage
//! carries a loot-table binding, a bar colour, announcement templates and
//! optional broadcast commands. Templates substitute `{}` with the stage
//! number; command templates additionally substitute `%var%` references.

use std::collections::BTreeMap;

use crate::core::constants::{GUARDIAN_STAGE, WAVE_STAGES};
use crate::host::{BarColor, Location, PlayerId, WorldHost};
use crate::settings::SettingsStore;

/// Configuration for one fight stage.
#[derive(Debug, Clone)]
pub struct Stage {
    number: u8,
    pub bar_color: BarColor,
    pub title: String,
    pub subtitle: String,
    pub message: String,
    /// Command template run once per nearby player when the stage begins.
    pub player_command: String,
    /// Command template run once when the stage begins.
    pub stage_command: String,
}

impl Stage {
    pub fn new(number: u8) -> Self {
        assert!(
            (1..=GUARDIAN_STAGE).contains(&number),
            "invalid stage number: {number}"
        );
        Self {
            number,
            bar_color: BarColor::White,
            title: "Stage {}".to_string(),
            subtitle: "Stage {} subtitle".to_string(),
            message: String::new(),
            player_command: String::new(),
            stage_command: String::new(),
        }
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    /// The id of the loot table that defines this wave's boss set.
    /// Only wave stages have one; the guardian stage spawns nothing.
    pub fn loot_table_id(&self) -> Option<String> {
        wave_loot_table_id(self.number)
    }

    /// Replace `{}` in a template with the stage number.
    pub fn format(&self, text: &str) -> String {
        text.replace("{}", &self.number.to_string())
    }

    fn load(&mut self, store: &SettingsStore) {
        let prefix = key_prefix(self.number);
        self.bar_color = store
            .get_str(&format!("{prefix}barcolor"))
            .and_then(BarColor::parse)
            .unwrap_or(BarColor::White);
        self.title = store
            .get_str(&format!("{prefix}title"))
            .unwrap_or("Stage {}")
            .to_string();
        self.subtitle = store
            .get_str(&format!("{prefix}subtitle"))
            .unwrap_or("Stage {} subtitle")
            .to_string();
        self.message = store
            .get_str(&format!("{prefix}message"))
            .unwrap_or_default()
            .to_string();
        self.player_command = store
            .get_str(&format!("{prefix}player-command"))
            .unwrap_or_default()
            .to_string();
        self.stage_command = store
            .get_str(&format!("{prefix}stage-command"))
            .unwrap_or_default()
            .to_string();
    }

    fn store(&self, store: &mut SettingsStore) {
        let prefix = key_prefix(self.number);
        store.set_str(&format!("{prefix}barcolor"), self.bar_color.as_str());
        store.set_str(&format!("{prefix}title"), self.title.clone());
        store.set_str(&format!("{prefix}subtitle"), self.subtitle.clone());
        store.set_str(&format!("{prefix}message"), self.message.clone());
        store.set_str(&format!("{prefix}player-command"), self.player_command.clone());
        store.set_str(&format!("{prefix}stage-command"), self.stage_command.clone());
    }

    /// Show this stage's title and message to the given players and run its
    /// broadcast commands.
    pub fn announce<W: WorldHost>(
        &self,
        world: &mut W,
        players: &[PlayerId],
        owner: Option<PlayerId>,
        boss_spawn: Location,
    ) {
        let title = self.format(&self.title);
        let subtitle = self.format(&self.subtitle);
        let message = self.format(&self.message);
        for &player in players {
            // Subtitles are not visible without a title.
            if !title.is_empty() {
                world.show_title(player, &title, &subtitle);
            }
            if !message.is_empty() {
                world.send_message(player, &message);
            }
        }

        if !self.stage_command.is_empty() {
            let vars = self.all_player_variables(world, players, owner, boss_spawn);
            let command = substitute(&self.stage_command, &vars);
            world.run_console_command(&command);
        }
        if !self.player_command.is_empty() {
            for &player in players {
                let vars = self.per_player_variables(world, player, owner, boss_spawn);
                let command = substitute(&self.player_command, &vars);
                world.run_console_command(&command);
            }
        }
    }

    fn common_variables<W: WorldHost>(
        &self,
        world: &W,
        owner: Option<PlayerId>,
        boss_spawn: Location,
    ) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        let _ = vars.insert(
            "o".to_string(),
            owner.map(|o| world.player_name(o)).unwrap_or_default(),
        );
        insert_location_variables(&mut vars, "b", boss_spawn);
        let _ = vars.insert("sn".to_string(), self.number.to_string());
        let _ = vars.insert("st".to_string(), self.format(&self.title));
        let _ = vars.insert("ss".to_string(), self.format(&self.subtitle));
        let _ = vars.insert("sm".to_string(), self.format(&self.message));
        vars
    }

    fn per_player_variables<W: WorldHost>(
        &self,
        world: &W,
        player: PlayerId,
        owner: Option<PlayerId>,
        boss_spawn: Location,
    ) -> BTreeMap<String, String> {
        let mut vars = self.common_variables(world, owner, boss_spawn);
        let _ = vars.insert("p".to_string(), world.player_name(player));
        let loc = world.player_location(player).unwrap_or_default();
        insert_location_variables(&mut vars, "p", loc);
        vars
    }

    fn all_player_variables<W: WorldHost>(
        &self,
        world: &W,
        players: &[PlayerId],
        owner: Option<PlayerId>,
        boss_spawn: Location,
    ) -> BTreeMap<String, String> {
        let mut vars = self.common_variables(world, owner, boss_spawn);
        let names: Vec<String> = players.iter().map(|&p| world.player_name(p)).collect();
        let _ = vars.insert("ps".to_string(), names.join(","));
        vars
    }
}

fn key_prefix(stage_number: u8) -> String {
    format!("stages.{stage_number}.")
}

/// Loot table id for a wave stage, `None` for stage 11.
pub fn wave_loot_table_id(stage_number: u8) -> Option<String> {
    (1..=WAVE_STAGES)
        .contains(&stage_number)
        .then(|| format!("stage-{stage_number}-bosses"))
}

fn insert_location_variables(vars: &mut BTreeMap<String, String>, prefix: &str, loc: Location) {
    let _ = vars.insert(
        format!("{prefix}c"),
        format!("{} {} {}", loc.block_x(), loc.block_y(), loc.block_z()),
    );
    let _ = vars.insert(
        format!("{prefix}c."),
        format!("{:.3} {:.3} {:.3}", loc.x, loc.y, loc.z),
    );
    let _ = vars.insert(format!("{prefix}x"), loc.block_x().to_string());
    let _ = vars.insert(format!("{prefix}y"), loc.block_y().to_string());
    let _ = vars.insert(format!("{prefix}z"), loc.block_z().to_string());
    let _ = vars.insert(format!("{prefix}x."), format!("{:.3}", loc.x));
    let _ = vars.insert(format!("{prefix}y."), format!("{:.3}", loc.y));
    let _ = vars.insert(format!("{prefix}z."), format!("{:.3}", loc.z));
}

/// Substitute `%name%` references in a command template.
///
/// `%%` becomes a literal `%`; undefined variable references are left as-is
/// and an unterminated trailing reference stays literal text.
pub fn substitute(format: &str, variables: &BTreeMap<String, String>) -> String {
    let mut result = String::new();
    let mut segment = String::new();
    let mut in_var = false;

    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            segment.push(c);
            continue;
        }
        if in_var {
            in_var = false;
            match variables.get(segment.as_str()) {
                Some(value) => result.push_str(value),
                None => {
                    result.push('%');
                    result.push_str(&segment);
                    result.push('%');
                }
            }
            segment.clear();
        } else if chars.peek() == Some(&'%') {
            let _ = chars.next();
            segment.push('%');
        } else {
            in_var = true;
            result.push_str(&segment);
            segment.clear();
        }
    }

    if in_var {
        result.push('%');
    }
    result.push_str(&segment);
    result
}

/// The full set of stage descriptors, indexed by stage number 1 to 11.
#[derive(Debug, Clone)]
pub struct StageCatalog {
    stages: Vec<Stage>,
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self {
            stages: (1..=GUARDIAN_STAGE).map(Stage::new).collect(),
        }
    }
}

impl StageCatalog {
    pub fn get(&self, stage_number: u8) -> Option<&Stage> {
        if (1..=GUARDIAN_STAGE).contains(&stage_number) {
            self.stages.get(usize::from(stage_number) - 1)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, stage_number: u8) -> Option<&mut Stage> {
        if (1..=GUARDIAN_STAGE).contains(&stage_number) {
            self.stages.get_mut(usize::from(stage_number) - 1)
        } else {
            None
        }
    }

    /// Exchange the configurations of two wave stages, leaving each slot's
    /// number in place. Loot-table contents are swapped by the caller.
    pub fn swap(&mut self, a: u8, b: u8) {
        if a == b {
            return;
        }
        assert!((1..=WAVE_STAGES).contains(&a) && (1..=WAVE_STAGES).contains(&b));
        let (a, b) = (usize::from(a) - 1, usize::from(b) - 1);
        let (lo, hi) = (a.min(b), a.max(b));
        let (head, tail) = self.stages.split_at_mut(hi);
        let (sa, sb) = (&mut head[lo], &mut tail[0]);
        std::mem::swap(&mut sa.bar_color, &mut sb.bar_color);
        std::mem::swap(&mut sa.title, &mut sb.title);
        std::mem::swap(&mut sa.subtitle, &mut sb.subtitle);
        std::mem::swap(&mut sa.message, &mut sb.message);
        std::mem::swap(&mut sa.player_command, &mut sb.player_command);
        std::mem::swap(&mut sa.stage_command, &mut sb.stage_command);
    }

    /// The stage pairs that must additionally have their loot tables
    /// exchanged to effect a move of stage `from` to position `to`, with
    /// in-between stages shifted into the gap. The same sequence of swaps
    /// is applied to the catalog itself.
    pub fn move_stage(&mut self, from: u8, to: u8) -> Vec<(u8, u8)> {
        assert!((1..=WAVE_STAGES).contains(&from) && (1..=WAVE_STAGES).contains(&to));
        let mut swaps = Vec::new();
        if from == to {
            return swaps;
        }
        swaps.push((from, to));
        if from < to {
            for stage in from..to - 1 {
                swaps.push((stage, stage + 1));
            }
        } else {
            for stage in (to + 2..=from).rev() {
                swaps.push((stage, stage - 1));
            }
        }
        for &(a, b) in &swaps {
            self.swap(a, b);
        }
        swaps
    }

    /// Load wave-stage configuration from the settings store. Stage 11 has
    /// no persisted configuration and keeps its defaults.
    pub fn load(store: &SettingsStore) -> Self {
        let mut catalog = StageCatalog::default();
        for stage in catalog.stages.iter_mut().take(usize::from(WAVE_STAGES)) {
            stage.load(store);
        }
        catalog
    }

    /// Write wave-stage configuration into the settings store.
    pub fn store(&self, store: &mut SettingsStore) {
        for stage in self.stages.iter().take(usize::from(WAVE_STAGES)) {
            stage.store(store);
        }
    }
}
