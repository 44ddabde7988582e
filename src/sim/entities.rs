//! Entity pools: coins, items, projectiles, turrets, particles
//!
//! All pools are dense Vecs iterated in insertion order; removals happen
//! through `retain` after each pass so determinism never depends on
//! mid-iteration mutation. Spawns past a pool's soft cap are dropped
//! silently and counted.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::event::GameEvent;
use super::grid::{Grid, RayHit, TileKind};
use crate::consts::*;
use crate::{grid_center, world_to_grid};

/// A mobile coin pickup
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Coin {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub value: u32,
}

/// Effect codes carried by items
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Cube,
    Warp,
    Jump,
    Bomb,
    Freeze,
    Shield,
    Hourglass,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub kind: ItemKind,
    pub pos: Vec2,
    pub vel: Vec2,
}

/// Who fired a projectile; turret shots kill the player, player shots
/// break tiles and turrets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Player,
    Turret,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub faction: Faction,
    /// Remaining pierce count; each tile hit costs one
    pub hp: u32,
}

/// A stationary hostile attached to a parent tile
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Turret {
    pub id: u32,
    /// Parent tile cell; the turret dies with it
    pub parent: (i32, i32),
    /// -1 facing left, +1 facing right
    pub facing: i8,
    pub fire_cooldown: u32,
    pub hp: u32,
}

impl Turret {
    /// World position, sitting on top of the parent tile
    pub fn pos(&self) -> Vec2 {
        grid_center(self.parent.0, self.parent.1) - Vec2::new(0.0, TILE_SIZE)
    }
}

/// Short-lived visual-only state; carries no simulation dependency
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Radius lost per tick
    pub decay: f32,
    pub color: u32,
    pub physics: bool,
}

/// Axis-aligned box as (min, max)
pub type Aabb = (Vec2, Vec2);

#[inline]
pub fn aabb_overlap(a: Aabb, b: Aabb) -> bool {
    a.0.x < b.1.x && a.1.x > b.0.x && a.0.y < b.1.y && a.1.y > b.0.y
}

/// Everything the projectile pass needs to report back
#[derive(Clone, Debug, Default)]
pub struct ProjectileOutcome {
    pub player_hit: bool,
    pub tiles_broken: Vec<((i32, i32), TileKind)>,
}

/// All entity pools owned by a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pools {
    pub coins: Vec<Coin>,
    pub items: Vec<Item>,
    pub projectiles: Vec<Projectile>,
    pub turrets: Vec<Turret>,
    pub particles: Vec<Particle>,
    next_id: u32,
    /// Spawns dropped at soft caps since run start
    pub dropped_spawns: u32,
}

impl Default for Pools {
    fn default() -> Self {
        Self {
            coins: Vec::new(),
            items: Vec::new(),
            projectiles: Vec::new(),
            turrets: Vec::new(),
            particles: Vec::new(),
            next_id: 1,
            dropped_spawns: 0,
        }
    }
}

impl Pools {
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_coin(&mut self, pos: Vec2, vel: Vec2) {
        if self.coins.len() >= MAX_COINS {
            self.dropped_spawns += 1;
            return;
        }
        let id = self.next_entity_id();
        self.coins.push(Coin {
            id,
            pos,
            vel,
            value: COIN_BASE_VALUE,
        });
    }

    pub fn spawn_item(&mut self, kind: ItemKind, pos: Vec2) {
        if self.items.len() >= MAX_ITEMS {
            self.dropped_spawns += 1;
            return;
        }
        let id = self.next_entity_id();
        self.items.push(Item {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
        });
    }

    pub fn spawn_projectile(&mut self, pos: Vec2, vel: Vec2, faction: Faction, hp: u32) {
        if self.projectiles.len() >= MAX_PROJECTILES {
            self.dropped_spawns += 1;
            return;
        }
        let id = self.next_entity_id();
        self.projectiles.push(Projectile {
            id,
            pos,
            vel,
            faction,
            hp,
        });
    }

    pub fn spawn_turret(&mut self, parent: (i32, i32)) {
        if self.turrets.len() >= MAX_TURRETS {
            self.dropped_spawns += 1;
            return;
        }
        let id = self.next_entity_id();
        self.turrets.push(Turret {
            id,
            parent,
            facing: 1,
            fire_cooldown: TURRET_COOLDOWN_TICKS,
            hp: 2,
        });
    }

    pub fn spawn_particle(&mut self, particle: Particle) {
        if self.particles.len() >= MAX_PARTICLES {
            self.dropped_spawns += 1;
            return;
        }
        self.particles.push(particle);
    }

    /// Turret pass: track the player, tick cooldowns, fire on clear LOS
    /// within the vertical range band on the facing side.
    pub fn update_turrets(
        &mut self,
        grid: &Grid,
        player_center: Vec2,
        events: &mut Vec<GameEvent>,
    ) {
        let mut shots: Vec<(Vec2, Vec2, u32)> = Vec::new();

        for turret in self.turrets.iter_mut() {
            let pos = turret.pos();
            turret.facing = if player_center.x >= pos.x { 1 } else { -1 };
            if turret.fire_cooldown > 0 {
                turret.fire_cooldown -= 1;
                continue;
            }

            let dy = player_center.y - pos.y;
            if dy.abs() >= TURRET_RANGE_Y {
                continue;
            }
            let on_facing_side = (player_center.x - pos.x) * turret.facing as f32 > 0.0;
            if !on_facing_side {
                continue;
            }

            let from = world_to_grid(pos);
            let to = world_to_grid(player_center);
            if grid.raycast(from, to) != RayHit::Clear {
                continue;
            }

            let vel = Vec2::new(PROJECTILE_SPEED * turret.facing as f32, 0.0);
            shots.push((pos, vel, turret.id));
            turret.fire_cooldown = TURRET_COOLDOWN_TICKS;
        }

        for (pos, vel, id) in shots {
            self.spawn_projectile(pos, vel, Faction::Turret, 1);
            events.push(GameEvent::TurretFired { id });
        }
    }

    /// Projectile pass: ballistic motion, tile piercing, turret damage,
    /// player hits. Tile removal is applied here; score bonuses are
    /// reconciled later from the outcome.
    pub fn update_projectiles(
        &mut self,
        grid: &mut Grid,
        player_aabb: Aabb,
        ts: f32,
    ) -> ProjectileOutcome {
        let mut outcome = ProjectileOutcome::default();
        let mut dead_turrets: Vec<u32> = Vec::new();

        for proj in self.projectiles.iter_mut() {
            proj.pos += proj.vel * ts;
            let (gx, gy) = world_to_grid(proj.pos);

            match proj.faction {
                Faction::Turret => {
                    let half = Vec2::splat(2.0);
                    if aabb_overlap((proj.pos - half, proj.pos + half), player_aabb) {
                        outcome.player_hit = true;
                        proj.hp = 0;
                        continue;
                    }
                    if grid.is_blocking(gx, gy) {
                        proj.hp = 0;
                    }
                }
                Faction::Player => {
                    // Player shots chip turrets before tiles
                    let ppos = proj.pos;
                    if let Some(turret) = self.turrets.iter_mut().find(|t| {
                        let tp = t.pos();
                        (tp - ppos).abs().max_element() < TILE_SIZE / 2.0
                    }) {
                        turret.hp = turret.hp.saturating_sub(1);
                        if turret.hp == 0 {
                            dead_turrets.push(turret.id);
                        }
                        proj.hp = 0;
                        continue;
                    }

                    if let Some(tile) = grid.get(gx, gy) {
                        if tile.kind.is_destructible() {
                            let kind = grid.remove(gx, gy).unwrap_or(TileKind::Solid);
                            outcome.tiles_broken.push(((gx, gy), kind));
                            proj.hp = proj.hp.saturating_sub(1);
                        } else {
                            proj.hp = 0;
                        }
                    } else if grid.is_blocking(gx, gy) {
                        // Side wall or floor absorbs the shot
                        proj.hp = 0;
                    }
                }
            }
        }

        if !dead_turrets.is_empty() {
            self.turrets.retain(|t| !dead_turrets.contains(&t.id));
        }
        self.projectiles.retain(|p| p.hp > 0);
        outcome
    }

    /// Item pass: gravity + drag, surface rest, pickup when the player's
    /// slot is free. Returns the kind picked up this tick, if any.
    pub fn update_items(&mut self, grid: &Grid, player_aabb: Aabb, slot_free: bool, ts: f32) -> Option<ItemKind> {
        let mut picked: Option<(u32, ItemKind)> = None;

        for item in self.items.iter_mut() {
            item.vel.y = (item.vel.y + GRAVITY * ts).min(TERMINAL_VELOCITY);
            item.vel *= ITEM_DRAG;
            item.pos += item.vel * ts;
            rest_on_surface(grid, &mut item.pos, &mut item.vel);

            if picked.is_none() && slot_free {
                let half = Vec2::splat(5.0);
                if aabb_overlap((item.pos - half, item.pos + half), player_aabb) {
                    picked = Some((item.id, item.kind));
                }
            }
        }

        if let Some((id, kind)) = picked {
            self.items.retain(|i| i.id != id);
            Some(kind)
        } else {
            None
        }
    }

    /// Coin pass: gravity + drag, magnet pulls (player within radius,
    /// magnetic tiles within their influence), pickup on overlap.
    /// Returns the values of coins collected this tick, in pickup order.
    pub fn update_coins(
        &mut self,
        grid: &Grid,
        player_aabb: Aabb,
        magnet_radius: f32,
        ts: f32,
    ) -> Vec<u32> {
        let player_center = (player_aabb.0 + player_aabb.1) * 0.5;

        // Magnetic tiles, in deterministic grid order
        let magnets: Vec<Vec2> = grid
            .iter()
            .filter(|(_, t)| t.kind == TileKind::Magnetic)
            .map(|(&(gx, gy), _)| grid_center(gx, gy))
            .collect();

        let mut picked = Vec::new();
        for coin in self.coins.iter_mut() {
            coin.vel.y = (coin.vel.y + GRAVITY * ts).min(TERMINAL_VELOCITY);

            let to_player = player_center - coin.pos;
            if to_player.length() < magnet_radius {
                coin.vel += to_player.normalize_or_zero() * COIN_MAGNET_PULL * ts;
            } else {
                for magnet in &magnets {
                    let to_magnet = *magnet - coin.pos;
                    if to_magnet.length() < MAGNETIC_TILE_RADIUS {
                        coin.vel += to_magnet.normalize_or_zero() * MAGNETIC_TILE_PULL * ts;
                    }
                }
            }

            coin.vel *= COIN_DRAG;
            coin.pos += coin.vel * ts;
            rest_on_surface(grid, &mut coin.pos, &mut coin.vel);

            let half = Vec2::splat(4.0);
            if aabb_overlap((coin.pos - half, coin.pos + half), player_aabb) {
                picked.push(coin.value);
                coin.value = 0; // mark collected
            }
        }
        self.coins.retain(|c| c.value > 0);
        picked
    }

    /// Particle pass: integrate, decay, drop dead ones.
    pub fn update_particles(&mut self, ts: f32) {
        for p in self.particles.iter_mut() {
            if p.physics {
                p.vel.y += GRAVITY * 0.5 * ts;
            }
            p.pos += p.vel * ts;
            p.radius -= p.decay;
        }
        self.particles.retain(|p| p.radius > 0.0);
    }

    /// Remove turrets whose parent tile no longer exists.
    pub fn reap_orphan_turrets(&mut self, grid: &Grid) {
        self.turrets
            .retain(|t| grid.get(t.parent.0, t.parent.1).is_some());
    }

    /// End-of-tick garbage sweep of out-of-world entities.
    pub fn sweep(&mut self, top_y: f32) {
        let bottom_y = FLOOR_ROW as f32 * TILE_SIZE + TILE_SIZE * 2.0;
        let in_world = |pos: Vec2| pos.y < bottom_y && pos.y > top_y - TILE_SIZE * 8.0;
        self.coins.retain(|c| in_world(c.pos));
        self.items.retain(|i| in_world(i.pos));
        self.projectiles
            .retain(|p| in_world(p.pos) && p.pos.x > -TILE_SIZE && p.pos.x < GRID_WIDTH as f32 * TILE_SIZE + TILE_SIZE);
        self.particles.retain(|p| in_world(p.pos));
    }
}

/// Clamp a falling pickup onto the top of the blocking cell beneath it.
fn rest_on_surface(grid: &Grid, pos: &mut Vec2, vel: &mut Vec2) {
    if vel.y <= 0.0 {
        return;
    }
    let (gx, gy) = world_to_grid(*pos);
    if grid.is_blocking(gx, gy) {
        pos.y = gy as f32 * TILE_SIZE - 0.01;
        vel.y = 0.0;
    }
}
