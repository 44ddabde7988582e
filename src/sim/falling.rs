//! Falling-tile pipeline: spawn cadence, descent, settlement
//!
//! Tiles fall straight down, clamped to a terminal velocity, and snap
//! into the grid when they meet support (a placed tile or the floor).
//! Spawning biases toward the lowest towers and never hits the same
//! column twice in a row unless everything else is full.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::grid::{Grid, PlaceOutcome, Tile, TileKind};
use super::rng::SimRng;
use crate::consts::*;
use crate::tuning::Biome;

/// An in-air block. `pos` is the AABB's top-left corner.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FallingTile {
    pub id: u32,
    pub pos: Vec2,
    pub vy: f32,
    pub kind: TileKind,
}

impl FallingTile {
    pub fn aabb(&self) -> (Vec2, Vec2) {
        (self.pos, self.pos + Vec2::splat(TILE_SIZE))
    }
}

/// A tile settled into the grid this tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settled {
    pub gx: i32,
    pub gy: i32,
    pub kind: TileKind,
}

/// Per-run spawn cadence controller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Spawner {
    ticks_until_spawn: u32,
    last_col: Option<i32>,
}

impl Default for Spawner {
    fn default() -> Self {
        Self {
            ticks_until_spawn: SPAWN_INTERVAL_START,
            last_col: None,
        }
    }
}

impl Spawner {
    /// Current interval: ramps down with elapsed ticks, floored, then
    /// scaled by the modifier hook.
    pub fn interval(elapsed_ticks: u64, scale: f32) -> u32 {
        let ramped = SPAWN_INTERVAL_START
            .saturating_sub((elapsed_ticks / SPAWN_INTERVAL_RAMP as u64) as u32)
            .max(SPAWN_INTERVAL_MIN);
        ((ramped as f32 * scale) as u32).max(1)
    }

    /// Count down and, when due, roll a new falling tile above the view.
    /// `next_id` is only invoked when a tile actually spawns, so the id
    /// sequence stays dense.
    pub fn update(
        &mut self,
        elapsed_ticks: u64,
        grid: &Grid,
        rng: &mut SimRng,
        biome: &Biome,
        interval_scale: f32,
        view_top: f32,
        next_id: impl FnOnce() -> u32,
    ) -> Option<FallingTile> {
        if self.ticks_until_spawn > 0 {
            self.ticks_until_spawn -= 1;
            return None;
        }
        self.ticks_until_spawn = Self::interval(elapsed_ticks, interval_scale);

        let col = self.pick_column(grid, rng, view_top)?;
        self.last_col = Some(col);
        let kind = Self::pick_kind(rng, biome);

        Some(FallingTile {
            id: next_id(),
            pos: Vec2::new(col as f32 * TILE_SIZE, view_top - 2.0 * TILE_SIZE),
            vy: 0.0,
            kind,
        })
    }

    /// Weighted toward the lowest towers (largest stack_height value);
    /// ties fall out as equal weights. The fairness clamp skips the
    /// previous column unless every other column is full.
    fn pick_column(&self, grid: &Grid, rng: &mut SimRng, view_top: f32) -> Option<i32> {
        let ceiling_row = (view_top / TILE_SIZE).floor() as i32;
        let full = |gx: i32| grid.stack_height(gx) <= ceiling_row;

        let mut candidates: Vec<i32> = (1..=GRID_WIDTH - 2).filter(|&gx| !full(gx)).collect();
        if candidates.is_empty() {
            return None;
        }
        if let Some(last) = self.last_col {
            if candidates.len() > 1 {
                candidates.retain(|&gx| gx != last);
            }
        }

        let min_height = candidates
            .iter()
            .map(|&gx| grid.stack_height(gx))
            .min()
            .unwrap_or(FLOOR_ROW);
        let table: Vec<(i32, u32)> = candidates
            .iter()
            .map(|&gx| (gx, (grid.stack_height(gx) - min_height + 1) as u32))
            .collect();
        SimRng::weighted_pick(rng.spawn_col(), &table).copied()
    }

    fn pick_kind(rng: &mut SimRng, biome: &Biome) -> TileKind {
        use rand::Rng;
        let special = !biome.special_weights.is_empty()
            && rng.spawn_kind().random_range(0..100) < biome.special_rate;
        let table = if special {
            &biome.special_weights
        } else {
            &biome.tile_weights
        };
        SimRng::weighted_pick(rng.spawn_kind(), table)
            .copied()
            .unwrap_or(TileKind::Solid)
    }
}

/// Advance all falling tiles and settle any that reach support.
/// Returns placements in pool order; settled tiles leave the pool.
pub fn update_falling(
    tiles: &mut Vec<FallingTile>,
    grid: &mut Grid,
    ts: f32,
    gravity_scale: f32,
) -> Vec<Settled> {
    let mut settled = Vec::new();

    for tile in tiles.iter_mut() {
        tile.vy = (tile.vy + TILE_GRAVITY * gravity_scale * ts).min(TILE_TERMINAL_VELOCITY);
        tile.pos.y += tile.vy * ts;

        let col = (tile.pos.x / TILE_SIZE).floor() as i32;
        let cur_gy = (tile.pos.y / TILE_SIZE).floor() as i32;

        // First blocking cell below the tile defines its rest row
        let mut blocking_gy = cur_gy + 1;
        while blocking_gy < FLOOR_ROW && !grid.is_blocking(col, blocking_gy) {
            blocking_gy += 1;
        }
        let rest_gy = blocking_gy - 1;

        if tile.pos.y >= rest_gy as f32 * TILE_SIZE {
            if grid.place(col, rest_gy, Tile::new(tile.kind)) == PlaceOutcome::Placed {
                settled.push(Settled {
                    gx: col,
                    gy: rest_gy,
                    kind: tile.kind,
                });
            }
            tile.vy = f32::NAN; // mark for removal below
        }
    }

    tiles.retain(|t| !t.vy.is_nan());
    settled
}
