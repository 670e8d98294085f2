//! Value types shared across the host boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a world entity.
///
/// Raw entity handles can be invalidated by the host between ticks, so all
/// tracking is keyed by id and every use goes back through the host's
/// registry (`WorldHost::is_valid` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier for a player, stable across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A position in the arena world.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    pub fn block_x(&self) -> i64 {
        self.x.floor() as i64
    }

    pub fn block_y(&self) -> i64 {
        self.y.floor() as i64
    }

    pub fn block_z(&self) -> i64 {
        self.z.floor() as i64
    }

    /// Distance from the world origin in the horizontal plane, ignoring
    /// height.
    pub fn magnitude_2d(&self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Closed classification of every entity the fight cares about.
///
/// The host's free-form tag strings are translated into this enum at the
/// boundary; nothing past the boundary matches on tag strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A pillar ritual object, consumed one per wave transition.
    RitualObject,
    /// One of the four objects placed to summon the guardian.
    SummoningObject,
    /// A wave boss (stages 1 to 10).
    WaveBoss,
    /// A support mob summoned alongside a boss.
    SupportMob,
    /// The final, initially-shielded creature.
    Guardian,
    /// A projectile fired by a fight entity.
    Projectile,
    /// Anything else in the world.
    Other,
}

/// Why a creature came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnReason {
    /// Summoned through the ritual-object path (the host's own mechanic).
    Ritual,
    /// Spawned by this crate or another plugin-level system.
    Custom,
}

/// The host-reported phase of the guardian summoning sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardianPhase {
    /// Pillar ritual objects are being placed by the summoning sequence.
    SummoningPillars,
    /// Any other phase.
    Other,
}

/// Cosmetic cues played at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Lightning strike when a pillar ritual object materialises.
    LightningStrike,
    /// Chime accompanying each beam flicker pulse.
    SummoningChime,
    /// The spawn-imminent cue shortly before a wave begins.
    SpawnCue,
    /// Swirl shown when a boss is returned to the arena.
    TeleportSwirl,
}

/// Colour of the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarColor {
    Pink,
    Blue,
    Red,
    Green,
    Yellow,
    Purple,
    #[default]
    White,
}

impl BarColor {
    pub const ALL: [BarColor; 7] = [
        BarColor::Pink,
        BarColor::Blue,
        BarColor::Red,
        BarColor::Green,
        BarColor::Yellow,
        BarColor::Purple,
        BarColor::White,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BarColor::Pink => "PINK",
            BarColor::Blue => "BLUE",
            BarColor::Red => "RED",
            BarColor::Green => "GREEN",
            BarColor::Yellow => "YELLOW",
            BarColor::Purple => "PURPLE",
            BarColor::White => "WHITE",
        }
    }

    /// Parse a colour name case-insensitively. Unknown names are `None`.
    pub fn parse(name: &str) -> Option<BarColor> {
        BarColor::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }
}

/// A stack of items to be placed in a player's inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub item_id: String,
    pub amount: u32,
}

impl ItemStack {
    pub fn new(item_id: impl Into<String>, amount: u32) -> Self {
        Self {
            item_id: item_id.into(),
            amount,
        }
    }
}

/// Desired state of the boss-health progress indicator, pushed to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorView {
    pub visible: bool,
    pub color: BarColor,
    pub title: String,
    /// Remaining boss health as a fraction, already clamped to [0, 1].
    pub fraction: f64,
    /// The players who should currently see the indicator.
    pub players: Vec<PlayerId>,
}

impl IndicatorView {
    /// The hidden indicator, pushed whenever no wave is in progress.
    pub fn hidden() -> Self {
        Self {
            visible: false,
            color: BarColor::White,
            title: String::new(),
            fraction: 0.0,
            players: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude_2d_ignores_height() {
        let loc = Location::new(3.0, 999.0, 4.0);
        assert!((loc.magnitude_2d() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_block_coordinates_floor() {
        let loc = Location::new(-0.5, 60.9, 2.1);
        assert_eq!(loc.block_x(), -1);
        assert_eq!(loc.block_y(), 60);
        assert_eq!(loc.block_z(), 2);
    }

    #[test]
    fn test_bar_color_parse_roundtrip() {
        for color in BarColor::ALL {
            assert_eq!(BarColor::parse(color.as_str()), Some(color));
        }
        assert_eq!(BarColor::parse("pink"), Some(BarColor::Pink));
        assert_eq!(BarColor::parse("mauve"), None);
    }
}
