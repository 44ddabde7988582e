//! World grid and per-tile semantics
//!
//! The grid owns placed tiles by coordinate. Interior columns run from
//! 1 to GRID_WIDTH-2; the two outermost columns are permanent side walls
//! and never appear in the tile map. gy grows downward, so a taller stack
//! means a *smaller* minimum gy. The floor row blocks everything at and
//! below FLOOR_ROW.
//!
//! Iteration over tiles always happens in BTreeMap key order, keeping
//! every pass deterministic.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Per-cell behavior of a placed tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Solid,
    Fragile,
    Bounce,
    Spike,
    Greed,
    Magnetic,
    Sticky,
    Motherlode,
    Unstable,
    Chest,
    OpenedChest,
}

impl TileKind {
    /// Kinds a dash, bomb, or projectile may remove
    pub fn is_destructible(self) -> bool {
        !matches!(self, TileKind::Chest | TileKind::OpenedChest)
    }

    /// Chests never block line-of-sight
    pub fn blocks_sight(self) -> bool {
        !matches!(self, TileKind::Chest | TileKind::OpenedChest)
    }
}

/// Optional per-kind state carried by a tile
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileData {
    /// Unstable: ticks until detonation, armed on placement
    pub fuse_ticks: Option<u32>,
    /// Fragile: ticks until removal, armed on first top-contact
    pub decay_ticks: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub data: TileData,
}

impl Tile {
    pub fn new(kind: TileKind) -> Self {
        let data = TileData {
            fuse_ticks: (kind == TileKind::Unstable).then_some(UNSTABLE_FUSE_TICKS),
            decay_ticks: None,
        };
        Self { kind, data }
    }
}

/// Result of a placement attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed,
    Occupied,
}

/// Result of a grid line-of-sight cast
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RayHit {
    Clear,
    BlockedAt { gx: i32, gy: i32 },
}

/// Timed-tile transitions produced by one grid tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileTick {
    /// Fragile tile finished cracking and was removed
    Shattered { gx: i32, gy: i32 },
    /// Unstable fuse expired; the tile was removed, caller runs the blast
    Detonated { gx: i32, gy: i32 },
}

/// The mutable world grid
#[derive(Clone, Debug, Default)]
pub struct Grid {
    tiles: BTreeMap<(i32, i32), Tile>,
    /// Minimum occupied gy per interior column, FLOOR_ROW when empty
    stack_heights: [i32; INTERIOR_COLS],
}

impl Grid {
    pub fn new() -> Self {
        Self {
            tiles: BTreeMap::new(),
            stack_heights: [FLOOR_ROW; INTERIOR_COLS],
        }
    }

    pub fn get(&self, gx: i32, gy: i32) -> Option<&Tile> {
        self.tiles.get(&(gx, gy))
    }

    pub fn get_mut(&mut self, gx: i32, gy: i32) -> Option<&mut Tile> {
        self.tiles.get_mut(&(gx, gy))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles in deterministic (column, row) order
    pub fn iter(&self) -> impl Iterator<Item = (&(i32, i32), &Tile)> {
        self.tiles.iter()
    }

    pub fn is_interior_col(gx: i32) -> bool {
        gx >= 1 && gx <= GRID_WIDTH - 2
    }

    /// Does this cell block movement? Side walls and the floor always do.
    pub fn is_blocking(&self, gx: i32, gy: i32) -> bool {
        if gx <= 0 || gx >= GRID_WIDTH - 1 {
            return true;
        }
        if gy >= FLOOR_ROW {
            return true;
        }
        self.tiles.contains_key(&(gx, gy))
    }

    /// Stack height of an interior column: min occupied gy, FLOOR_ROW if empty
    pub fn stack_height(&self, gx: i32) -> i32 {
        if Self::is_interior_col(gx) {
            self.stack_heights[(gx - 1) as usize]
        } else {
            FLOOR_ROW
        }
    }

    pub fn stack_heights(&self) -> &[i32; INTERIOR_COLS] {
        &self.stack_heights
    }

    /// Place a tile. Fails if the cell is occupied or outside the interior.
    pub fn place(&mut self, gx: i32, gy: i32, tile: Tile) -> PlaceOutcome {
        if !Self::is_interior_col(gx) || gy >= FLOOR_ROW {
            return PlaceOutcome::Occupied;
        }
        if self.tiles.contains_key(&(gx, gy)) {
            return PlaceOutcome::Occupied;
        }
        self.tiles.insert((gx, gy), tile);
        let col = (gx - 1) as usize;
        self.stack_heights[col] = self.stack_heights[col].min(gy);
        PlaceOutcome::Placed
    }

    /// Remove a tile, rescanning the affected column's stack height.
    pub fn remove(&mut self, gx: i32, gy: i32) -> Option<TileKind> {
        let tile = self.tiles.remove(&(gx, gy))?;
        self.recompute_column(gx);
        Some(tile.kind)
    }

    fn recompute_column(&mut self, gx: i32) {
        if !Self::is_interior_col(gx) {
            return;
        }
        let min_gy = self
            .tiles
            .range((gx, i32::MIN)..=(gx, i32::MAX))
            .map(|(&(_, gy), _)| gy)
            .min()
            .unwrap_or(FLOOR_ROW);
        self.stack_heights[(gx - 1) as usize] = min_gy;
    }

    /// Full stack-height rebuild. Debug builds assert on desync; release
    /// builds self-heal from the tile map.
    pub fn recompute_all_heights(&mut self) {
        let mut fresh = [FLOOR_ROW; INTERIOR_COLS];
        for (&(gx, gy), _) in &self.tiles {
            if Self::is_interior_col(gx) {
                let col = (gx - 1) as usize;
                fresh[col] = fresh[col].min(gy);
            }
        }
        debug_assert_eq!(fresh, self.stack_heights, "stack-height desync");
        self.stack_heights = fresh;
    }

    /// Existing tiles in the 3x3 block around a cell, deterministic order
    pub fn neighbors(&self, gx: i32, gy: i32) -> Vec<((i32, i32), Tile)> {
        let mut out = Vec::with_capacity(9);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let key = (gx + dx, gy + dy);
                if let Some(tile) = self.tiles.get(&key) {
                    out.push((key, *tile));
                }
            }
        }
        out
    }

    /// Integer Bresenham traversal from cell `from` to cell `to`.
    /// Chests are transparent; walls, floor, and other tiles block.
    pub fn raycast(&self, from: (i32, i32), to: (i32, i32)) -> RayHit {
        let (mut x, mut y) = from;
        let (x1, y1) = to;
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            if (x, y) != from && (x, y) != to {
                let blocked = match self.tiles.get(&(x, y)) {
                    Some(tile) => tile.kind.blocks_sight(),
                    None => x <= 0 || x >= GRID_WIDTH - 1 || y >= FLOOR_ROW,
                };
                if blocked {
                    return RayHit::BlockedAt { gx: x, gy: y };
                }
            }
            if (x, y) == to {
                return RayHit::Clear;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Advance per-tile timers. Expired fragiles shatter; expired fuses
    /// detonate. The caller resolves blast side effects.
    pub fn tick_timers(&mut self) -> Vec<TileTick> {
        let mut out = Vec::new();
        let mut expired = Vec::new();

        for (&(gx, gy), tile) in self.tiles.iter_mut() {
            if let Some(decay) = tile.data.decay_ticks.as_mut() {
                if *decay > 0 {
                    *decay -= 1;
                } else {
                    expired.push(((gx, gy), TileTick::Shattered { gx, gy }));
                    continue;
                }
            }
            if let Some(fuse) = tile.data.fuse_ticks.as_mut() {
                if *fuse > 0 {
                    *fuse -= 1;
                } else {
                    expired.push(((gx, gy), TileTick::Detonated { gx, gy }));
                }
            }
        }

        for ((gx, gy), tick) in expired {
            self.remove(gx, gy);
            out.push(tick);
        }
        out
    }

    /// Remove every tile within a square radius of a blast center.
    /// Returns what was removed, in deterministic order.
    pub fn explode(&mut self, gx: i32, gy: i32, radius: i32) -> Vec<((i32, i32), TileKind)> {
        let mut removed = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let (tx, ty) = (gx + dx, gy + dy);
                if let Some(kind) = self.remove(tx, ty) {
                    removed.push(((tx, ty), kind));
                }
            }
        }
        removed
    }

    /// Number of consecutive completely-filled rows counting up from the
    /// floor. Feeds the scroll policy.
    pub fn completed_rows_from_floor(&self) -> i32 {
        let mut rows = 0;
        let mut gy = FLOOR_ROW - 1;
        loop {
            let complete = (1..=GRID_WIDTH - 2).all(|gx| self.tiles.contains_key(&(gx, gy)));
            if !complete {
                return rows;
            }
            rows += 1;
            gy -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid() -> Tile {
        Tile::new(TileKind::Solid)
    }

    #[test]
    fn test_place_updates_stack_height() {
        let mut grid = Grid::new();
        assert_eq!(grid.stack_height(3), FLOOR_ROW);
        assert_eq!(grid.place(3, 11, solid()), PlaceOutcome::Placed);
        assert_eq!(grid.stack_height(3), 11);
        assert_eq!(grid.place(3, 8, solid()), PlaceOutcome::Placed);
        assert_eq!(grid.stack_height(3), 8);
        // Filling a gap below the top does not change the minimum
        assert_eq!(grid.place(3, 10, solid()), PlaceOutcome::Placed);
        assert_eq!(grid.stack_height(3), 8);
    }

    #[test]
    fn test_place_occupied_cell_fails() {
        let mut grid = Grid::new();
        assert_eq!(grid.place(5, 11, solid()), PlaceOutcome::Placed);
        assert_eq!(grid.place(5, 11, solid()), PlaceOutcome::Occupied);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_place_rejects_walls_and_floor() {
        let mut grid = Grid::new();
        assert_eq!(grid.place(0, 11, solid()), PlaceOutcome::Occupied);
        assert_eq!(grid.place(GRID_WIDTH - 1, 11, solid()), PlaceOutcome::Occupied);
        assert_eq!(grid.place(5, FLOOR_ROW, solid()), PlaceOutcome::Occupied);
    }

    #[test]
    fn test_remove_rescans_column() {
        let mut grid = Grid::new();
        grid.place(4, 11, solid());
        grid.place(4, 10, solid());
        grid.place(4, 9, solid());
        assert_eq!(grid.stack_height(4), 9);
        assert_eq!(grid.remove(4, 9), Some(TileKind::Solid));
        assert_eq!(grid.stack_height(4), 10);
        grid.remove(4, 10);
        grid.remove(4, 11);
        assert_eq!(grid.stack_height(4), FLOOR_ROW);
    }

    #[test]
    fn test_walls_and_floor_block() {
        let grid = Grid::new();
        assert!(grid.is_blocking(0, 5));
        assert!(grid.is_blocking(GRID_WIDTH - 1, 5));
        assert!(grid.is_blocking(5, FLOOR_ROW));
        assert!(!grid.is_blocking(5, 5));
    }

    #[test]
    fn test_neighbors_returns_3x3_block() {
        let mut grid = Grid::new();
        grid.place(5, 10, solid());
        grid.place(6, 10, solid());
        grid.place(5, 9, solid());
        grid.place(8, 10, solid()); // outside the block
        let n = grid.neighbors(5, 10);
        assert_eq!(n.len(), 3);
    }

    #[test]
    fn test_raycast_clear_and_blocked() {
        let mut grid = Grid::new();
        assert_eq!(grid.raycast((2, 10), (8, 10)), RayHit::Clear);
        grid.place(5, 10, solid());
        assert_eq!(
            grid.raycast((2, 10), (8, 10)),
            RayHit::BlockedAt { gx: 5, gy: 10 }
        );
    }

    #[test]
    fn test_raycast_chest_is_transparent() {
        let mut grid = Grid::new();
        grid.place(5, 10, Tile::new(TileKind::Chest));
        assert_eq!(grid.raycast((2, 10), (8, 10)), RayHit::Clear);
        grid.get_mut(5, 10).unwrap().kind = TileKind::OpenedChest;
        assert_eq!(grid.raycast((2, 10), (8, 10)), RayHit::Clear);
    }

    #[test]
    fn test_fragile_decay_removes_tile() {
        let mut grid = Grid::new();
        grid.place(3, 11, Tile::new(TileKind::Fragile));
        grid.get_mut(3, 11).unwrap().data.decay_ticks = Some(2);
        assert!(grid.tick_timers().is_empty());
        assert!(grid.tick_timers().is_empty());
        let ticks = grid.tick_timers();
        assert_eq!(ticks, vec![TileTick::Shattered { gx: 3, gy: 11 }]);
        assert!(grid.get(3, 11).is_none());
    }

    #[test]
    fn test_unstable_fuse_detonates() {
        let mut grid = Grid::new();
        grid.place(3, 11, Tile::new(TileKind::Unstable));
        let mut detonated = false;
        for _ in 0..=UNSTABLE_FUSE_TICKS {
            if !grid.tick_timers().is_empty() {
                detonated = true;
                break;
            }
        }
        assert!(detonated);
        assert!(grid.get(3, 11).is_none());
    }

    #[test]
    fn test_explode_clears_radius() {
        let mut grid = Grid::new();
        for gx in 3..=7 {
            grid.place(gx, 11, solid());
        }
        let removed = grid.explode(5, 11, 1);
        assert_eq!(removed.len(), 3);
        assert!(grid.get(3, 11).is_some());
        assert!(grid.get(4, 11).is_none());
        assert!(grid.get(7, 11).is_some());
    }

    #[test]
    fn test_completed_rows_from_floor() {
        let mut grid = Grid::new();
        assert_eq!(grid.completed_rows_from_floor(), 0);
        for gx in 1..=GRID_WIDTH - 2 {
            grid.place(gx, 11, solid());
        }
        assert_eq!(grid.completed_rows_from_floor(), 1);
        // A gap in the next row stops the count
        for gx in 1..=GRID_WIDTH - 3 {
            grid.place(gx, 10, solid());
        }
        assert_eq!(grid.completed_rows_from_floor(), 1);
        grid.place(GRID_WIDTH - 2, 10, solid());
        assert_eq!(grid.completed_rows_from_floor(), 2);
    }

    #[test]
    fn test_recompute_all_heights_matches_incremental() {
        let mut grid = Grid::new();
        grid.place(2, 11, solid());
        grid.place(2, 7, solid());
        grid.place(9, 10, solid());
        let before = *grid.stack_heights();
        grid.recompute_all_heights();
        assert_eq!(before, *grid.stack_heights());
    }
}
