//! Boss-spawn location search.
//!
//! A pure function of a terrain view and an RNG, so it can be exercised
//! against synthetic terrain without a live world.

use rand::Rng;
use tracing::info;

use crate::core::constants::{
    BOSS_SPAWN_MAX_RETRIES, BOSS_SPAWN_RADIUS_MAX, BOSS_SPAWN_RADIUS_MIN, SPAWN_SEARCH_START_Y,
};
use crate::host::{Location, TerrainQuery};

/// Where bosses land when no random spawn pocket can be found: atop the
/// central ritual structure.
pub fn fallback_spawn_location() -> Location {
    Location::new(0.5, (SPAWN_SEARCH_START_Y + 1) as f64, 0.5)
}

/// Choose a random location within the arena ring with a 3x3x3 volume of
/// air above a standing surface.
///
/// Each attempt picks a uniform angle and a radius uniform in the spawn
/// ring, scans down then up from the search start height for the first
/// standing surface, then scans up to 10 blocks for a clear pocket. After
/// the bounded retries, the fixed fallback location is returned.
pub fn boss_spawn_location<T: TerrainQuery, R: Rng>(terrain: &T, rng: &mut R) -> Location {
    for _ in 0..BOSS_SPAWN_MAX_RETRIES {
        let range = rng.gen_range(BOSS_SPAWN_RADIUS_MIN..=BOSS_SPAWN_RADIUS_MAX);
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let x = range * angle.cos();
        let z = range * angle.sin();

        // Find a local standing surface: the first non-passable block
        // scanning downward from just above the search height.
        let mut loc = Location::new(x, (SPAWN_SEARCH_START_Y + 5) as f64, z);
        let mut found_surface = false;
        for dy in (-5..=5).rev() {
            let candidate = Location::new(x, (SPAWN_SEARCH_START_Y + dy) as f64, z);
            loc = candidate;
            if !is_passable(terrain, candidate) {
                found_surface = true;
                break;
            }
        }
        if !found_surface {
            info!(x, z, "no standing surface here, retrying");
            continue;
        }

        // Now go up to find space.
        for _ in 1..10 {
            loc = loc.offset(0.0, 1.0, 0.0);
            if is_passable_3x3x3(terrain, loc) {
                return loc;
            }
        }

        info!(x, z, "no space to spawn bosses here, retrying");
    }

    info!("no valid boss spawn location found, using the fallback");
    fallback_spawn_location()
}

fn is_passable<T: TerrainQuery>(terrain: &T, loc: Location) -> bool {
    terrain.is_passable(loc.block_x(), loc.block_y(), loc.block_z())
}

/// True if the 3x3x3 volume with `loc` at the centre of its bottom layer
/// is fully passable.
pub fn is_passable_3x3x3<T: TerrainQuery>(terrain: &T, loc: Location) -> bool {
    for dx in -1..=1 {
        for dy in 0..=2 {
            for dz in -1..=1 {
                if !terrain.is_passable(loc.block_x() + dx, loc.block_y() + dy, loc.block_z() + dz)
                {
                    return false;
                }
            }
        }
    }
    true
}
