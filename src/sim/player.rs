//! Player avatar: movement, jump/dash/wall states, collision resolution
//!
//! Movement resolves axis-separated: X first with the new X velocity,
//! then Y. Candidate rectangles come from the grid cells the hitbox
//! overlaps, which always includes the side walls and any tile settled
//! earlier in the same tick.
//!
//! Jump rules are strictly ordered: wall jump, acrobat, full jump
//! (coyote or first jump), mid-air jump, then buffering.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entities::ItemKind;
use super::event::GameEvent;
use super::grid::{Grid, TileKind};
use super::modifiers::{Modifiers, Perk};
use super::run::InputFrame;
use crate::consts::*;

/// Coarse state tag for the presentation layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    Idle,
    Run,
    Jump,
}

/// Which face of a tile the player touched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactSide {
    Top,
    Bottom,
    Left,
    Right,
}

/// A tile the player touched during resolution this tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    pub cell: (i32, i32),
    pub kind: TileKind,
    pub side: ContactSide,
}

/// What the player phase reports back to the driver
#[derive(Clone, Debug, Default)]
pub struct PlayerOut {
    /// Destructible cells crossed while dashing with overcharge
    pub smashed: Vec<(i32, i32)>,
    pub contacts: Vec<Contact>,
    pub shoot: bool,
    pub use_item: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    /// Hitbox center, world space
    pub pos: Vec2,
    pub vel: Vec2,
    /// -1 left, +1 right
    pub facing: i8,
    pub jumps_remaining: u32,
    pub air_time: u32,
    pub coyote_timer: u32,
    pub jump_buffer_timer: u32,
    pub wall_contact_timer: u32,
    /// Side of the last wall contact: -1 wall on the left, +1 on the right
    pub wall_side: i8,
    pub dash_timer: u32,
    pub focus_meter: f32,
    pub is_charging_dash: bool,
    pub is_wall_sliding: bool,
    pub shielded: bool,
    pub dead: bool,
    pub on_ground: bool,
    pub item_slot: Option<ItemKind>,
    pub action: ActionTag,
    charge_ticks: u32,
    shot_cooldown: u32,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(Vec2::new(
            GRID_WIDTH as f32 * TILE_SIZE / 2.0,
            FLOOR_ROW as f32 * TILE_SIZE - PLAYER_HEIGHT / 2.0,
        ))
    }
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            facing: 1,
            jumps_remaining: JUMPS_MAX,
            air_time: 0,
            coyote_timer: 0,
            jump_buffer_timer: 0,
            wall_contact_timer: 0,
            wall_side: 0,
            dash_timer: 0,
            focus_meter: FOCUS_MAX,
            is_charging_dash: false,
            is_wall_sliding: false,
            shielded: false,
            dead: false,
            on_ground: true,
            item_slot: None,
            action: ActionTag::Idle,
            charge_ticks: 0,
            shot_cooldown: 0,
        }
    }

    pub fn aabb(&self) -> (Vec2, Vec2) {
        let half = Vec2::new(PLAYER_WIDTH / 2.0, PLAYER_HEIGHT / 2.0);
        (self.pos - half, self.pos + half)
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_timer > 0
    }

    /// One tick of the player phase. The grid already contains tiles
    /// settled earlier this tick.
    pub fn update(
        &mut self,
        input: &InputFrame,
        grid: &Grid,
        mods: &Modifiers,
        ts: f32,
        events: &mut Vec<GameEvent>,
    ) -> PlayerOut {
        let mut out = PlayerOut::default();
        if self.dead {
            return out;
        }

        // Timers
        self.coyote_timer = self.coyote_timer.saturating_sub(1);
        self.jump_buffer_timer = self.jump_buffer_timer.saturating_sub(1);
        self.wall_contact_timer = self.wall_contact_timer.saturating_sub(1);
        self.shot_cooldown = self.shot_cooldown.saturating_sub(1);
        self.dash_timer = self.dash_timer.saturating_sub(1);
        self.is_wall_sliding = false;

        // Facing and horizontal control (a dash owns the X axis)
        let move_dir = (input.right as i8) - (input.left as i8);
        if move_dir != 0 {
            self.facing = move_dir;
        }
        if self.is_dashing() {
            self.vel.x = self.facing as f32 * DASH_SPEED;
            self.vel.y = 0.0;
        } else {
            let target = move_dir as f32 * RUN_SPEED;
            self.vel.x += (target - self.vel.x) * RUN_LERP;
        }

        self.update_dash_charge(input, mods);

        // Gravity, terminal clamp, wall slide
        if !self.is_dashing() {
            self.vel.y =
                (self.vel.y + GRAVITY * mods.gravity_scale() * ts).min(TERMINAL_VELOCITY);
            let pressing_into_wall =
                self.wall_contact_timer > 0 && move_dir != 0 && move_dir == self.wall_side;
            if !self.on_ground && pressing_into_wall && self.vel.y > WALL_SLIDE_VELOCITY {
                self.vel.y = WALL_SLIDE_VELOCITY;
                self.is_wall_sliding = true;
                events.push(GameEvent::WallDust);
            }
        }

        if input.jump {
            self.try_jump(move_dir, mods);
        }
        // Variable jump height: releasing early cuts the rise short
        if input.jump_released && self.vel.y < 0.0 {
            self.vel.y *= 0.5;
        }

        let was_grounded = self.on_ground;
        self.resolve_x(grid, mods, ts, &mut out);
        self.resolve_y(grid, ts, &mut out);

        // Leaving the ground without jumping opens the coyote window
        if was_grounded && !self.on_ground && self.vel.y >= 0.0 {
            self.coyote_timer = COYOTE_TICKS;
        }

        if self.on_ground {
            self.air_time = 0;
        } else {
            self.air_time += 1;
        }

        if !self.is_charging_dash {
            self.focus_meter = (self.focus_meter + FOCUS_REGEN).min(FOCUS_MAX);
        }

        if input.shoot && self.shot_cooldown == 0 {
            out.shoot = true;
            self.shot_cooldown = SHOT_COOLDOWN_TICKS;
        }
        out.use_item = input.use_item && self.item_slot.is_some();

        self.action = if !self.on_ground {
            ActionTag::Jump
        } else if self.vel.x.abs() > 0.1 {
            ActionTag::Run
        } else {
            ActionTag::Idle
        };

        out
    }

    fn update_dash_charge(&mut self, input: &InputFrame, mods: &Modifiers) {
        let cost = mods.dash_cost();

        if input.dash && !self.is_charging_dash && self.focus_meter >= cost {
            self.is_charging_dash = true;
            self.charge_ticks = 0;
        }

        if self.is_charging_dash {
            self.charge_ticks += 1;
            self.focus_meter = (self.focus_meter - FOCUS_CHARGE_DRAIN).max(0.0);

            let charge_over = input.dash_released || self.focus_meter == 0.0;
            if charge_over {
                self.is_charging_dash = false;
                if self.charge_ticks >= 1 {
                    self.dash_timer = DASH_TICKS;
                    self.vel.y = 0.0;
                    self.vel.x = self.facing as f32 * DASH_SPEED;
                    self.focus_meter = (self.focus_meter - cost).max(0.0);
                }
            }
        }
    }

    /// Ordered jump rules; see module docs.
    fn try_jump(&mut self, move_dir: i8, mods: &Modifiers) {
        let on_wall = self.wall_contact_timer > 0 && self.wall_side != 0;

        if on_wall && move_dir == self.wall_side {
            self.vel.y = WALL_JUMP_VELOCITY;
            self.vel.x = -self.wall_side as f32 * WALL_JUMP_KICK;
            self.wall_contact_timer = 0;
            self.is_wall_sliding = false;
            return;
        }
        if on_wall && mods.has_perk(Perk::Acrobat) {
            self.vel.y = ACROBAT_JUMP_VELOCITY;
            self.wall_contact_timer = 0;
            return;
        }
        if self.coyote_timer > 0 || self.jumps_remaining == JUMPS_MAX {
            self.vel.y = JUMP_VELOCITY;
            self.jumps_remaining = self.jumps_remaining.saturating_sub(1);
            self.coyote_timer = 0;
            self.on_ground = false;
            return;
        }
        if self.jumps_remaining > 0 {
            self.vel.y = MIDAIR_JUMP_VELOCITY;
            self.jumps_remaining -= 1;
            return;
        }
        if !self.on_ground {
            self.jump_buffer_timer = JUMP_BUFFER_TICKS;
        }
    }

    /// Cells the hitbox currently overlaps, as inclusive grid ranges
    fn cell_span(&self) -> (i32, i32, i32, i32) {
        let (min, max) = self.aabb();
        let eps = 0.001;
        (
            (min.x / TILE_SIZE).floor() as i32,
            ((max.x - eps) / TILE_SIZE).floor() as i32,
            (min.y / TILE_SIZE).floor() as i32,
            ((max.y - eps) / TILE_SIZE).floor() as i32,
        )
    }

    fn blocks(&self, grid: &Grid, mods: &Modifiers, gx: i32, gy: i32, out: &mut PlayerOut) -> bool {
        if !grid.is_blocking(gx, gy) {
            return false;
        }
        // Overcharge dash smashes straight through destructible tiles
        if self.is_dashing() && mods.dash_destroys_tiles() {
            if let Some(tile) = grid.get(gx, gy) {
                if tile.kind.is_destructible() {
                    if !out.smashed.contains(&(gx, gy)) {
                        out.smashed.push((gx, gy));
                    }
                    return false;
                }
            }
        }
        true
    }

    fn resolve_x(&mut self, grid: &Grid, mods: &Modifiers, ts: f32, out: &mut PlayerOut) {
        self.pos.x += self.vel.x * ts;
        let (gx0, gx1, gy0, gy1) = self.cell_span();
        let half_w = PLAYER_WIDTH / 2.0;

        for gy in gy0..=gy1 {
            for gx in gx0..=gx1 {
                if !self.blocks(grid, mods, gx, gy, out) {
                    continue;
                }
                let side = if self.vel.x > 0.0 {
                    self.pos.x = gx as f32 * TILE_SIZE - half_w - 0.001;
                    1
                } else {
                    self.pos.x = (gx + 1) as f32 * TILE_SIZE + half_w + 0.001;
                    -1
                };
                self.vel.x = 0.0;
                self.wall_contact_timer = WALL_CONTACT_TICKS;
                self.wall_side = side;
                if let Some(tile) = grid.get(gx, gy) {
                    out.contacts.push(Contact {
                        cell: (gx, gy),
                        kind: tile.kind,
                        side: if side > 0 {
                            ContactSide::Left
                        } else {
                            ContactSide::Right
                        },
                    });
                }
            }
        }

        // Sticky tiles drag horizontal speed toward zero while adjacent
        let (gx0, gx1, gy0, gy1) = self.cell_span();
        let mut near_sticky = false;
        for gy in gy0..=gy1 {
            for gx in [gx0 - 1, gx1 + 1] {
                if grid.get(gx, gy).is_some_and(|t| t.kind == TileKind::Sticky) {
                    near_sticky = true;
                }
            }
        }
        if near_sticky {
            self.vel.x *= 0.5;
        }
    }

    fn resolve_y(&mut self, grid: &Grid, ts: f32, out: &mut PlayerOut) {
        self.pos.y += self.vel.y * ts;
        let (gx0, gx1, gy0, gy1) = self.cell_span();
        let half_h = PLAYER_HEIGHT / 2.0;
        let falling = self.vel.y > 0.0;
        let mut landed = false;

        // Without a dedicated probe the ground flag would flicker; assume
        // airborne and let a bottom contact restore it.
        if self.vel.y != 0.0 {
            self.on_ground = false;
        }

        for gy in gy0..=gy1 {
            for gx in gx0..=gx1 {
                // Vertical pass ignores overcharge: a dash is horizontal
                if !grid.is_blocking(gx, gy) {
                    continue;
                }
                if falling {
                    self.pos.y = gy as f32 * TILE_SIZE - half_h - 0.001;
                    landed = true;
                } else if self.vel.y < 0.0 {
                    self.pos.y = (gy + 1) as f32 * TILE_SIZE + half_h + 0.001;
                }
                self.vel.y = 0.0;
                if let Some(tile) = grid.get(gx, gy) {
                    out.contacts.push(Contact {
                        cell: (gx, gy),
                        kind: tile.kind,
                        side: if falling {
                            ContactSide::Top
                        } else {
                            ContactSide::Bottom
                        },
                    });
                }
            }
        }

        if landed {
            self.on_ground = true;
            self.jumps_remaining = JUMPS_MAX;
            self.air_time = 0;
            if self.jump_buffer_timer > 0 {
                self.jump_buffer_timer = 0;
                self.vel.y = JUMP_VELOCITY;
                self.jumps_remaining -= 1;
                self.on_ground = false;
            }
        }
    }
}
