//! Blockfall - deterministic core for a vertical-stacking arcade roguelike
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grid, falling tiles, player, combat)
//! - `tuning`: Data-driven game balance (biomes, upgrades, modifiers)
//! - `profile`: Persisted player profile (driver side, never read mid-tick)
//!
//! The simulation advances in fixed ticks, owns all run state, and exposes
//! read-only deep-copy snapshots. For a given seed and input sequence the
//! snapshot sequence is byte-identical across runs.

pub mod profile;
pub mod sim;
pub mod tuning;

pub use profile::Profile;
pub use sim::{InputFrame, Run, RunConfig, Snapshot};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation rate (ticks per second)
    pub const TICK_RATE: u32 = 60;
    /// Side length of one grid cell in world units
    pub const TILE_SIZE: f32 = 16.0;
    /// Total grid width in cells, including both side-wall columns
    pub const GRID_WIDTH: i32 = 20;
    /// Number of interior (playable) columns
    pub const INTERIOR_COLS: usize = (GRID_WIDTH - 2) as usize;
    /// Rows visible to the presentation layer
    pub const VISIBLE_ROWS: i32 = 12;
    /// Grid row of the permanent floor; tiles rest at smaller gy values
    pub const FLOOR_ROW: i32 = 12;

    /// Player hitbox
    pub const PLAYER_WIDTH: f32 = 12.0;
    pub const PLAYER_HEIGHT: f32 = 14.0;

    /// Player movement (world units per tick, per tick squared)
    pub const GRAVITY: f32 = 0.24;
    pub const TERMINAL_VELOCITY: f32 = 6.0;
    pub const RUN_SPEED: f32 = 1.6;
    /// Smoothing factor for horizontal velocity lerp
    pub const RUN_LERP: f32 = 0.25;
    pub const JUMP_VELOCITY: f32 = -4.6;
    /// Reduced velocity for mid-air jumps
    pub const MIDAIR_JUMP_VELOCITY: f32 = -3.8;
    pub const WALL_JUMP_VELOCITY: f32 = -5.0;
    pub const WALL_JUMP_KICK: f32 = 3.0;
    pub const ACROBAT_JUMP_VELOCITY: f32 = -4.2;
    /// Downward speed clamp while wall sliding
    pub const WALL_SLIDE_VELOCITY: f32 = 0.8;
    pub const JUMPS_MAX: u32 = 2;
    pub const COYOTE_TICKS: u32 = 6;
    pub const JUMP_BUFFER_TICKS: u32 = 6;
    pub const WALL_CONTACT_TICKS: u32 = 6;

    /// Dash & focus meter
    pub const DASH_SPEED: f32 = 6.0;
    pub const DASH_TICKS: u32 = 10;
    pub const DASH_COST: f32 = 30.0;
    pub const FOCUS_MAX: f32 = 100.0;
    /// Focus drained per tick while holding a dash charge
    pub const FOCUS_CHARGE_DRAIN: f32 = 0.5;
    pub const FOCUS_REGEN: f32 = 0.2;

    /// Slow-motion time meter
    pub const TIME_METER_MAX: f32 = 180.0;
    pub const TIME_METER_DRAIN: f32 = 1.0;
    pub const TIME_METER_REGEN: f32 = 0.5;
    pub const SLOW_TIME_SCALE: f32 = 0.3;
    /// Ticks slow-motion stays locked out after the meter empties
    pub const SLOW_COOLDOWN_TICKS: u32 = 60;

    /// Combo
    pub const COMBO_DURATION_TICKS: u32 = 180;
    pub const COMBO_DELTA: f32 = 0.25;
    pub const COMBO_MAX: f32 = 5.0;

    /// Scoring
    pub const COIN_BASE_VALUE: u32 = 10;
    pub const TILE_BREAK_SCORE: u32 = 15;
    pub const CHEST_SCORE: u32 = 25;
    pub const MOTHERLODE_SCORE: u32 = 40;
    pub const ROW_CLEAR_SCORE: u32 = 50;

    /// Falling tiles
    pub const TILE_GRAVITY: f32 = 0.12;
    pub const TILE_TERMINAL_VELOCITY: f32 = 3.0;
    /// Spawn interval ramp: start, floor, and elapsed ticks per -1 tick
    pub const SPAWN_INTERVAL_START: u32 = 120;
    pub const SPAWN_INTERVAL_MIN: u32 = 45;
    pub const SPAWN_INTERVAL_RAMP: u32 = 120;

    /// Tile timers (ticks)
    pub const FRAGILE_DECAY_TICKS: u32 = 45;
    pub const UNSTABLE_FUSE_TICKS: u32 = 120;
    pub const BOUNCE_VELOCITY: f32 = -6.0;
    /// Coins emitted by a greed tile before the greedy multiplier
    pub const GREED_COIN_COUNT: u32 = 3;
    pub const MOTHERLODE_COIN_COUNT: u32 = 8;
    /// Pull applied to coins near a magnetic tile (per tick)
    pub const MAGNETIC_TILE_PULL: f32 = 0.15;
    pub const MAGNETIC_TILE_RADIUS: f32 = 48.0;

    /// Coins & items
    pub const COIN_MAGNET_RADIUS: f32 = 40.0;
    /// Extra magnet radius per coin_magnet upgrade level
    pub const COIN_MAGNET_RADIUS_PER_LEVEL: f32 = 12.0;
    pub const COIN_MAGNET_PULL: f32 = 0.3;
    pub const COIN_DRAG: f32 = 0.98;
    pub const ITEM_DRAG: f32 = 0.98;

    /// Projectiles & turrets
    pub const PROJECTILE_SPEED: f32 = 3.0;
    pub const SHOT_COOLDOWN_TICKS: u32 = 20;
    pub const TURRET_COOLDOWN_TICKS: u32 = 90;
    /// Vertical band within which a turret may fire (world units)
    pub const TURRET_RANGE_Y: f32 = 12.0;

    /// Item effects
    pub const BOMB_RADIUS: i32 = 2;
    /// Blast radius of an unstable tile's fuse explosion
    pub const UNSTABLE_BLAST_RADIUS: i32 = 1;
    pub const FREEZE_TICKS: u32 = 240;
    pub const SUPER_JUMP_VELOCITY: f32 = -7.5;
    pub const HOURGLASS_METER_BONUS: f32 = 90.0;

    /// Scroll
    pub const SCROLL_LERP: f32 = 0.1;

    /// Ticks of animation-only tail between death and the terminal snapshot
    pub const DEATH_TAIL_TICKS: u32 = 90;

    /// Pool soft caps; excess spawns are dropped
    pub const MAX_COINS: usize = 512;
    pub const MAX_ITEMS: usize = 32;
    pub const MAX_PROJECTILES: usize = 64;
    pub const MAX_TURRETS: usize = 16;
    pub const MAX_PARTICLES: usize = 2048;
}

/// Convert a world-space position to the grid cell containing it
#[inline]
pub fn world_to_grid(pos: Vec2) -> (i32, i32) {
    (
        (pos.x / consts::TILE_SIZE).floor() as i32,
        (pos.y / consts::TILE_SIZE).floor() as i32,
    )
}

/// World-space position of a grid cell's top-left corner
#[inline]
pub fn grid_to_world(gx: i32, gy: i32) -> Vec2 {
    Vec2::new(gx as f32 * consts::TILE_SIZE, gy as f32 * consts::TILE_SIZE)
}

/// World-space center of a grid cell
#[inline]
pub fn grid_center(gx: i32, gy: i32) -> Vec2 {
    grid_to_world(gx, gy) + Vec2::splat(consts::TILE_SIZE / 2.0)
}
