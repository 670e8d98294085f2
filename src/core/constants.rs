// Fight pacing constants
pub const TICKS_PER_SECOND: u64 = 20;

/// Ticks between the start of a wave-transition animation and the wave
/// actually beginning (~7.5 s).
pub const STAGE_START_DELAY_TICKS: u64 = 150;

/// Period of the containment supervisor pass (~1 s).
pub const SUPERVISOR_PERIOD_TICKS: u64 = 20;

/// Period of the surplus-guardian cleanup sweep (~30 s).
pub const SURPLUS_SWEEP_PERIOD_TICKS: u64 = 600;

/// Delay before reminding a freshly logged-in player of unclaimed prizes,
/// so the message lands after the usual login noise.
pub const LOGIN_REMINDER_DELAY_TICKS: u64 = 25;

/// Maximum ticks a boss may go undamaged before being returned to the
/// arena (~90 s).
pub const BOSS_DAMAGE_TIMEOUT_TICKS: u64 = 90 * TICKS_PER_SECOND;

// Stage structure
pub const WAVE_STAGES: u8 = 10;
pub const GUARDIAN_STAGE: u8 = 11;
pub const SUMMONING_OBJECT_COUNT: usize = 4;

// Arena geometry
/// Planar radius from the arena origin within which players see
/// announcements and the progress indicator.
pub const NEARBY_RADIUS: f64 = 100.0;

/// Minimum and maximum radius of the boss-spawn location search ring.
pub const BOSS_SPAWN_RADIUS_MIN: f64 = 10.0;
pub const BOSS_SPAWN_RADIUS_MAX: f64 = 30.0;

/// Attempts at finding a random spawn pocket before falling back.
pub const BOSS_SPAWN_MAX_RETRIES: u32 = 5;

/// Height at which the spawn search starts scanning for a standing surface.
pub const SPAWN_SEARCH_START_Y: i64 = 60;

/// Bosses below this height are returned to the arena.
pub const MIN_BOSS_Y: f64 = 40.0;

/// Maximum planar distance a boss may stray from the arena origin.
pub const BOSS_CONTAINMENT_RADIUS: f64 = 80.0;

/// Entity discovery radius on boot. Wider than the containment radius to
/// cover the distance a boss can travel between supervisor passes.
pub const TRACKED_RADIUS: f64 = BOSS_CONTAINMENT_RADIUS + 80.0;

/// Radius of the circle of ritual pillars, and the relative tolerance used
/// to decide whether a location sits on that circle.
pub const PILLAR_CIRCLE_RADIUS: f64 = 40.0;
pub const PILLAR_CIRCLE_TOLERANCE: f64 = 0.15;

/// Summoning positions sit on bedrock at (±3, 0) and (0, ±3); anything
/// below this height is custom terrain, not the arena structure.
pub const SUMMONING_MIN_Y: i64 = 6;

// Durability tags (must round-trip through world persistence)
pub const PILLAR_TAG: &str = "gauntlet-pillar";
pub const SUMMONING_TAG: &str = "gauntlet-summoning";
pub const FIGHT_ENTITY_TAG: &str = "gauntlet-entity";
pub const BOSS_TAG: &str = "gauntlet-boss";
pub const SUPPORT_TAG: &str = "gauntlet-support";

// Loot tables
/// Table a single guardian prize is drawn from.
pub const GUARDIAN_LOOT_TABLE: &str = "guardian-drops";

// Persistence
pub const SETTINGS_FILE: &str = "fight.json";
pub const SETTINGS_VERSION: u32 = 1;
