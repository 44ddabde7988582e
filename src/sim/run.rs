//! Run driver: owns all simulation state and advances one tick per call
//!
//! Phase order within a tick is fixed: time resolution, falling tiles,
//! entities (turrets, projectiles, items, coins, particles), player,
//! combat reconciliation, grid timers, scroll, biome check, garbage
//! sweep, snapshot. Freeze gates only the tile phases; every other
//! phase runs under the world scale.

use glam::Vec2;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::combat::Scoring;
use super::entities::{aabb_overlap, Faction, ItemKind, Pools};
use super::event::GameEvent;
use super::falling::{update_falling, FallingTile, Spawner};
use super::grid::{Grid, Tile, TileData, TileKind, TileTick};
use super::modifiers::{Directive, DirectiveObjective, Modifiers};
use super::player::{ContactSide, Player};
use super::rng::SimRng;
use super::timescale::{BiomeTracker, Scroll, TimeController};
use crate::consts::*;
use crate::tuning::Tuning;
use crate::{grid_center, world_to_grid};

/// Zen stretches the spawn cadence on top of any modifier scaling
const ZEN_SPAWN_SCALE: f32 = 1.5;

/// One tick's worth of player intent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub jump_released: bool,
    pub dash: bool,
    pub dash_released: bool,
    pub shoot: bool,
    pub use_item: bool,
    pub time_slow: bool,
    /// Transient; only honored once the run is over
    pub restart: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Classic,
    Zen,
    Hardcore,
    Challenge,
    Daily,
}

impl std::str::FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(Mode::Classic),
            "zen" => Ok(Mode::Zen),
            "hardcore" => Ok(Mode::Hardcore),
            "challenge" => Ok(Mode::Challenge),
            "daily" => Ok(Mode::Daily),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown run mode `{0}`")]
    InvalidMode(String),
    #[error("biome index {0} is out of range")]
    UnknownBiome(u32),
    #[error("directive failed validation: {0}")]
    InvalidDirective(String),
    #[error("bad tuning table: {0}")]
    BadTable(String),
}

/// Everything needed to start (or restart) a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    pub mode: Mode,
    pub seed: u64,
    pub biome_index: u32,
    pub character: String,
    pub modifiers: Modifiers,
    pub directive: Option<Directive>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Classic,
            seed: 0,
            biome_index: 0,
            character: "scout".to_string(),
            modifiers: Modifiers::default(),
            directive: None,
        }
    }
}

/// Deep-copy, serializable view of the world after one tick
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub mode: Mode,
    pub score: u64,
    pub combo_multiplier: f32,
    pub combo_remaining_ticks: u32,
    pub height: f32,
    pub tiles: Vec<(i32, i32, TileKind, TileData)>,
    pub falling: Vec<FallingTile>,
    pub coins: Vec<super::entities::Coin>,
    pub items: Vec<super::entities::Item>,
    pub projectiles: Vec<super::entities::Projectile>,
    pub turrets: Vec<super::entities::Turret>,
    pub particles: Vec<super::entities::Particle>,
    pub player: Player,
    pub time_meter: f32,
    pub focus_meter: f32,
    pub biome_index: u32,
    pub dead: bool,
    pub terminal: bool,
    pub events: Vec<GameEvent>,
}

/// One active run. The driver is the sole mutator; external observers
/// only ever see snapshots.
#[derive(Clone, Debug)]
pub struct Run {
    config: RunConfig,
    tuning: Tuning,
    mods: Modifiers,
    rng: SimRng,
    grid: Grid,
    falling: Vec<FallingTile>,
    spawner: Spawner,
    pools: Pools,
    player: Player,
    scoring: Scoring,
    time: TimeController,
    scroll: Scroll,
    biome: BiomeTracker,
    directive: super::modifiers::DirectiveTracker,
    tick: u64,
    rows_scored: i32,
    dead_ticks: u32,
    terminal: bool,
    events: Vec<GameEvent>,
    pending_warnings: Vec<String>,
    warned_drops: bool,
}

impl Run {
    pub fn new(config: RunConfig, tuning: Tuning) -> Result<Self, ConfigError> {
        if config.biome_index as usize >= tuning.biomes.len() {
            return Err(ConfigError::UnknownBiome(config.biome_index));
        }
        if let Some(directive) = &config.directive {
            if !directive.is_valid() {
                return Err(ConfigError::InvalidDirective(format!(
                    "objective {:?} value {}",
                    directive.objective_type, directive.value
                )));
            }
        }

        let mut mods = config.modifiers.clone();
        mods.directive = config.directive.clone();

        let mut player = Player::default();
        player.item_slot = mods.start_with_item();

        let pending_warnings = tuning.warnings.clone();
        for message in &pending_warnings {
            warn!("tuning: {message}");
        }
        info!(
            "new {:?} run, seed {}, biome {}",
            config.mode, config.seed, config.biome_index
        );

        Ok(Self {
            rng: SimRng::new(config.seed),
            grid: Grid::new(),
            falling: Vec::new(),
            spawner: Spawner::default(),
            pools: Pools::default(),
            player,
            scoring: Scoring::default(),
            time: TimeController::default(),
            scroll: Scroll::default(),
            biome: BiomeTracker::new(config.biome_index),
            directive: Default::default(),
            mods,
            tick: 0,
            rows_scored: 0,
            dead_ticks: 0,
            terminal: false,
            events: Vec::new(),
            pending_warnings,
            warned_drops: false,
            config,
            tuning,
        })
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// End the run immediately. Idempotent on terminal runs.
    pub fn abort(&mut self) -> Snapshot {
        if !self.terminal {
            self.player.dead = true;
            self.terminal = true;
            self.events.clear();
            info!("run aborted at tick {}, score {}", self.tick, self.scoring.score);
        }
        self.snapshot()
    }

    /// Advance exactly one tick.
    pub fn step(&mut self, input: InputFrame) -> Snapshot {
        if self.terminal {
            if input.restart {
                self.restart();
            }
            // One-shot events belong to the tick that produced them
            self.events.clear();
            return self.snapshot();
        }
        self.events.clear();
        for message in self.pending_warnings.drain(..) {
            self.events.push(GameEvent::ConfigWarning { message });
        }

        if self.player.dead {
            // Input is frozen; only the animation tail and restart remain
            self.pools.update_particles(1.0);
            self.dead_ticks += 1;
            if self.dead_ticks >= DEATH_TAIL_TICKS {
                self.terminal = true;
            }
            self.tick += 1;
            return self.snapshot();
        }

        let ts = self.time.resolve(
            input.time_slow,
            self.player.is_charging_dash,
            self.mods.time_drain_scale(),
        );

        if ts.tiles > 0.0 {
            self.falling_phase(ts.tiles);
        }
        self.check_falling_tile_hits();
        self.entity_phase(ts.world);
        self.player_phase(&input, ts.world);

        // Combat reconciliation: combo decay
        if self.scoring.combo.tick(self.mods.combo_decay_rate()) {
            self.events.push(GameEvent::ComboEnded);
        }

        if ts.tiles > 0.0 {
            self.grid_timer_phase();
        }

        self.scroll_phase();
        self.biome_phase();

        self.pools.reap_orphan_turrets(&self.grid);
        self.pools.sweep(self.scroll.view_top());

        if self.pools.dropped_spawns > 0 && !self.warned_drops {
            warn!("entity pool caps hit, {} spawns dropped", self.pools.dropped_spawns);
            self.warned_drops = true;
        }

        self.note_directive(DirectiveObjective::SurviveTicks, 1);

        self.tick += 1;
        self.snapshot()
    }

    fn restart(&mut self) {
        info!("restarting run, seed {}", self.config.seed);
        match Self::new(self.config.clone(), self.tuning.clone()) {
            Ok(fresh) => *self = fresh,
            // The config validated once already; this cannot fail
            Err(err) => warn!("restart rejected: {err}"),
        }
    }

    fn spawn_scale(&self) -> f32 {
        let mut scale = self.mods.spawn_interval_scale();
        if self.config.mode == Mode::Zen {
            scale *= ZEN_SPAWN_SCALE;
        }
        scale
    }

    fn falling_phase(&mut self, ts: f32) {
        let spawn_scale = self.spawn_scale();
        if let Some(tile) = self.spawner.update(
            self.tick,
            &self.grid,
            &mut self.rng,
            &self.tuning.biomes[self.biome.index as usize],
            spawn_scale,
            self.scroll.view_top(),
            || self.pools.next_entity_id(),
        ) {
            self.falling.push(tile);
        }

        let settled = update_falling(
            &mut self.falling,
            &mut self.grid,
            ts,
            self.mods.tile_gravity_scale(),
        );
        for s in &settled {
            self.events.push(GameEvent::TilePlaced {
                gx: s.gx,
                gy: s.gy,
                kind: s.kind,
            });
        }
        for s in settled {
            self.maybe_spawn_turret(s.gx, s.gy);
        }
    }

    /// A settled tile may carry a turret, at the biome's rate.
    fn maybe_spawn_turret(&mut self, gx: i32, gy: i32) {
        use rand::Rng;
        if self.config.mode == Mode::Zen {
            return;
        }
        let rate = self.tuning.biomes[self.biome.index as usize].turret_rate;
        if rate == 0 || self.rng.item_roll().random_range(0..100) >= rate {
            return;
        }
        // Needs headroom above the parent tile
        if self.grid.get(gx, gy - 1).is_none() {
            self.pools.spawn_turret((gx, gy));
        }
    }

    fn check_falling_tile_hits(&mut self) {
        let player_aabb = self.player.aabb();
        let hit = self
            .falling
            .iter()
            .find(|t| aabb_overlap(t.aabb(), player_aabb))
            .map(|t| t.id);
        let Some(id) = hit else { return };

        if self.kill_player() {
            // Shield (or zen) absorbed the hit; the tile is annihilated
            self.falling.retain(|t| t.id != id);
        }
    }

    fn entity_phase(&mut self, ts: f32) {
        self.pools
            .update_turrets(&self.grid, self.player.pos, &mut self.events);

        let outcome = self
            .pools
            .update_projectiles(&mut self.grid, self.player.aabb(), ts);
        for ((gx, gy), kind) in outcome.tiles_broken {
            self.on_tile_destroyed(gx, gy, kind);
        }
        if outcome.player_hit {
            self.kill_player();
        }

        let slot_free = self.player.item_slot.is_none();
        if let Some(kind) = self
            .pools
            .update_items(&self.grid, self.player.aabb(), slot_free, ts)
        {
            self.player.item_slot = Some(kind);
            self.events.push(GameEvent::ItemPicked { kind });
        }

        let picked = self.pools.update_coins(
            &self.grid,
            self.player.aabb(),
            self.mods.coin_magnet_radius(),
            ts,
        );
        for value in picked {
            let gained = self.scoring.coin_pickup(value, self.mods.combo_ceiling());
            self.events.push(GameEvent::CoinPicked { value });
            self.note_directive(DirectiveObjective::CollectCoins, 1);
            self.note_directive(DirectiveObjective::ReachScore, gained);
        }

        self.pools.update_particles(ts);
    }

    fn player_phase(&mut self, input: &InputFrame, ts: f32) {
        let out = self
            .player
            .update(input, &self.grid, &self.mods, ts, &mut self.events);

        for (gx, gy) in out.smashed {
            if let Some(kind) = self.grid.remove(gx, gy) {
                self.on_tile_destroyed(gx, gy, kind);
            }
        }

        for contact in out.contacts {
            self.apply_contact(contact.cell, contact.kind, contact.side);
        }

        if out.shoot {
            let dir = self.player.facing as f32;
            let muzzle = self.player.pos + Vec2::new(dir * PLAYER_WIDTH, 0.0);
            self.pools.spawn_projectile(
                muzzle,
                Vec2::new(dir * PROJECTILE_SPEED, 0.0),
                Faction::Player,
                self.mods.projectile_pierce_hp(),
            );
        }
        if out.use_item {
            self.use_item();
        }
    }

    fn apply_contact(&mut self, cell: (i32, i32), kind: TileKind, side: ContactSide) {
        let (gx, gy) = cell;
        match (kind, side) {
            (TileKind::Fragile, ContactSide::Top) => {
                if let Some(tile) = self.grid.get_mut(gx, gy) {
                    if tile.data.decay_ticks.is_none() {
                        tile.data.decay_ticks = Some(FRAGILE_DECAY_TICKS);
                        self.events.push(GameEvent::TileCracked { gx, gy });
                    }
                }
            }
            (TileKind::Bounce, ContactSide::Top) => {
                self.player.vel.y = BOUNCE_VELOCITY;
                self.player.on_ground = false;
                self.events.push(GameEvent::Bounced { gx, gy });
            }
            (TileKind::Spike, ContactSide::Top) => {
                self.kill_player();
            }
            (TileKind::Greed, ContactSide::Top) => {
                if let Some(tile) = self.grid.get_mut(gx, gy) {
                    tile.kind = TileKind::Solid;
                    let count = GREED_COIN_COUNT * self.mods.chest_coin_multiplier();
                    let top = grid_center(gx, gy) - Vec2::new(0.0, TILE_SIZE);
                    self.coin_burst(top, count);
                }
            }
            (TileKind::Chest, _) => self.open_chest(gx, gy),
            _ => {}
        }
    }

    fn open_chest(&mut self, gx: i32, gy: i32) {
        let Some(tile) = self.grid.get_mut(gx, gy) else {
            return;
        };
        tile.kind = TileKind::OpenedChest;

        let item = SimRng::weighted_pick(self.rng.item_roll(), &self.tuning.item_weights)
            .copied()
            .unwrap_or(ItemKind::Shield);
        let above = grid_center(gx, gy) - Vec2::new(0.0, TILE_SIZE);
        self.pools.spawn_item(item, above);

        let gained = self.scoring.bonus(CHEST_SCORE, self.mods.combo_ceiling());
        self.events.push(GameEvent::ChestOpened { gx, gy, item });
        self.note_directive(DirectiveObjective::ReachScore, gained);
    }

    fn use_item(&mut self) {
        let Some(kind) = self.player.item_slot.take() else {
            return;
        };
        self.events.push(GameEvent::ItemUsed { kind });

        match kind {
            ItemKind::Bomb => {
                let (gx, gy) = world_to_grid(self.player.pos);
                self.detonate(gx, gy, BOMB_RADIUS, false);
            }
            ItemKind::Freeze => self.time.start_freeze(),
            ItemKind::Shield => self.player.shielded = true,
            ItemKind::Hourglass => self.time.add_meter(HOURGLASS_METER_BONUS),
            ItemKind::Jump => {
                self.player.vel.y = SUPER_JUMP_VELOCITY;
                self.player.on_ground = false;
            }
            ItemKind::Warp => self.warp_player(),
            ItemKind::Cube => self.place_cube(),
        }
    }

    /// Teleport above the lowest interior tower.
    fn warp_player(&mut self) {
        let target = (1..=GRID_WIDTH - 2)
            .max_by_key(|&gx| self.grid.stack_height(gx))
            .unwrap_or(GRID_WIDTH / 2);
        let top_gy = self.grid.stack_height(target);
        self.player.pos = grid_center(target, top_gy - 1)
            - Vec2::new(0.0, TILE_SIZE / 2.0 - PLAYER_HEIGHT / 2.0 - 0.01);
        self.player.vel = Vec2::ZERO;
    }

    /// Materialize a temporary platform in the cell just below the
    /// player's feet, if there is room for one.
    fn place_cube(&mut self) {
        let (gx, gy) =
            world_to_grid(self.player.pos + Vec2::new(0.0, PLAYER_HEIGHT / 2.0 + 1.0));
        if !Grid::is_interior_col(gx) || gy >= FLOOR_ROW || self.grid.get(gx, gy).is_some() {
            return;
        }
        let mut tile = Tile::new(TileKind::Fragile);
        tile.data.decay_ticks = Some(FRAGILE_DECAY_TICKS * 4);
        self.grid.place(gx, gy, tile);
        self.events.push(GameEvent::TilePlaced {
            gx,
            gy,
            kind: TileKind::Fragile,
        });
    }

    fn grid_timer_phase(&mut self) {
        for expired in self.grid.tick_timers() {
            match expired {
                TileTick::Shattered { gx, gy } => {
                    self.events.push(GameEvent::TileRemoved {
                        gx,
                        gy,
                        kind: TileKind::Fragile,
                    });
                    self.spark_burst(grid_center(gx, gy), 6);
                }
                TileTick::Detonated { gx, gy } => {
                    self.detonate(gx, gy, UNSTABLE_BLAST_RADIUS, true)
                }
            }
        }
    }

    /// A radial blast: clears the neighborhood and scores destructibles.
    /// Only hostile blasts (`harms_player`) can catch the player; the
    /// bomb item is a tool, not a hazard.
    fn detonate(&mut self, gx: i32, gy: i32, radius: i32, harms_player: bool) {
        self.events.push(GameEvent::Exploded { gx, gy });
        for ((tx, ty), kind) in self.grid.explode(gx, gy, radius) {
            self.on_tile_destroyed(tx, ty, kind);
        }
        self.spark_burst(grid_center(gx, gy), 24);

        if harms_player {
            let (px, py) = world_to_grid(self.player.pos);
            if (px - gx).abs() <= radius && (py - gy).abs() <= radius {
                self.kill_player();
            }
        }
    }

    /// Score and side effects shared by every destruction path.
    fn on_tile_destroyed(&mut self, gx: i32, gy: i32, kind: TileKind) {
        self.events.push(GameEvent::TileRemoved { gx, gy, kind });
        let points = if kind == TileKind::Motherlode {
            let count = MOTHERLODE_COIN_COUNT * self.mods.chest_coin_multiplier();
            self.coin_burst(grid_center(gx, gy), count);
            MOTHERLODE_SCORE
        } else {
            TILE_BREAK_SCORE
        };
        let gained = self.scoring.bonus(points, self.mods.combo_ceiling());
        self.note_directive(DirectiveObjective::BreakTiles, 1);
        self.note_directive(DirectiveObjective::ReachScore, gained);
        self.spark_burst(grid_center(gx, gy), 8);
    }

    fn coin_burst(&mut self, center: Vec2, count: u32) {
        use rand::Rng;
        for _ in 0..count {
            let vx = self.rng.coin_drift().random_range(-0.8..0.8);
            let vy = self.rng.coin_drift().random_range(-2.5..-0.8);
            self.pools.spawn_coin(center, Vec2::new(vx, vy));
        }
    }

    fn spark_burst(&mut self, center: Vec2, count: u32) {
        use super::entities::Particle;
        use rand::Rng;
        for _ in 0..count {
            let vx = self.rng.particle().random_range(-1.5..1.5);
            let vy = self.rng.particle().random_range(-2.0..0.5);
            self.pools.spawn_particle(Particle {
                pos: center,
                vel: Vec2::new(vx, vy),
                radius: 2.0,
                decay: 0.08,
                color: 0xffd866,
                physics: true,
            });
        }
    }

    /// Death routine. Returns true when the hit was absorbed (shield or
    /// zen mode); the run continues in that case.
    fn kill_player(&mut self) -> bool {
        if self.player.dead {
            return false;
        }
        if self.config.mode == Mode::Zen {
            return true;
        }
        if self.player.shielded && self.config.mode != Mode::Hardcore {
            self.player.shielded = false;
            self.events.push(GameEvent::ShieldBroken);
            return true;
        }
        self.player.dead = true;
        self.events.push(GameEvent::PlayerDied);
        info!(
            "run over at tick {}, score {}",
            self.tick, self.scoring.score
        );
        false
    }

    fn scroll_phase(&mut self) {
        let completed = self.grid.completed_rows_from_floor();
        while self.rows_scored < completed {
            self.rows_scored += 1;
            let gy = FLOOR_ROW - self.rows_scored;
            let gained = self.scoring.bonus(ROW_CLEAR_SCORE, self.mods.combo_ceiling());
            self.events.push(GameEvent::RowCompleted { gy });
            self.note_directive(DirectiveObjective::ReachScore, gained);
        }
        if self.scroll.update(completed) {
            debug!("scroll target -> {}", self.scroll.target_height);
            self.events.push(GameEvent::ScrollAdvanced {
                target_height: self.scroll.target_height,
            });
        }
    }

    fn biome_phase(&mut self) {
        let reqs: Vec<u64> = self.tuning.biomes.iter().map(|b| b.score_req).collect();
        if let Some(index) = self.biome.check(self.scoring.score, &reqs) {
            debug!("biome -> {index}");
            self.events.push(GameEvent::BiomeChanged { index });
        }
    }

    fn note_directive(&mut self, objective: DirectiveObjective, delta: u64) {
        let Some(directive) = &self.mods.directive else {
            return;
        };
        if directive.objective_type != objective || delta == 0 {
            return;
        }
        if self.directive.on_score_event(directive, delta) {
            info!("directive complete: {}", directive.flavor_text);
            self.events.push(GameEvent::DirectiveCompleted);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            mode: self.config.mode,
            score: self.scoring.score,
            combo_multiplier: self.scoring.combo.multiplier,
            combo_remaining_ticks: self.scoring.combo.remaining_ticks,
            height: self.scroll.height,
            tiles: self
                .grid
                .iter()
                .map(|(&(gx, gy), t)| (gx, gy, t.kind, t.data))
                .collect(),
            falling: self.falling.clone(),
            coins: self.pools.coins.clone(),
            items: self.pools.items.clone(),
            projectiles: self.pools.projectiles.clone(),
            turrets: self.pools.turrets.clone(),
            particles: self.pools.particles.clone(),
            player: self.player.clone(),
            time_meter: self.time.time_meter,
            focus_meter: self.player.focus_meter,
            biome_index: self.biome.index,
            dead: self.player.dead,
            terminal: self.terminal,
            events: self.events.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic_run(seed: u64) -> Run {
        Run::new(
            RunConfig {
                seed,
                ..Default::default()
            },
            Tuning::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_biome_rejected() {
        let config = RunConfig {
            biome_index: 99,
            ..Default::default()
        };
        assert!(matches!(
            Run::new(config, Tuning::default()),
            Err(ConfigError::UnknownBiome(99))
        ));
    }

    #[test]
    fn test_invalid_directive_rejected() {
        let config = RunConfig {
            directive: Some(Directive {
                objective_type: DirectiveObjective::CollectCoins,
                value: 0,
                reward_type: super::super::modifiers::DirectiveReward::BankedCoins,
                reward_value: 10,
                flavor_text: "".into(),
            }),
            ..Default::default()
        };
        assert!(matches!(
            Run::new(config, Tuning::default()),
            Err(ConfigError::InvalidDirective(_))
        ));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("hardcore".parse::<Mode>().unwrap(), Mode::Hardcore);
        assert!(matches!(
            "marathon".parse::<Mode>(),
            Err(ConfigError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_tick_counter_advances() {
        let mut run = classic_run(7);
        for expect in 1..=10u64 {
            let snap = run.step(InputFrame::default());
            assert_eq!(snap.tick, expect);
        }
    }

    #[test]
    fn test_meters_stay_bounded() {
        let mut run = classic_run(3);
        let slow = InputFrame {
            time_slow: true,
            ..Default::default()
        };
        for i in 0..600 {
            let snap = run.step(if i % 2 == 0 { slow } else { InputFrame::default() });
            assert!(snap.time_meter >= 0.0 && snap.time_meter <= TIME_METER_MAX);
            assert!(snap.focus_meter >= 0.0 && snap.focus_meter <= FOCUS_MAX);
        }
    }

    #[test]
    fn test_abort_is_idempotent() {
        let mut run = classic_run(1);
        run.step(InputFrame::default());
        let first = run.abort();
        assert!(first.terminal);
        let second = run.abort();
        assert_eq!(first.tick, second.tick);
        assert_eq!(first.score, second.score);
    }

    #[test]
    fn test_shield_absorbs_one_hit() {
        let mut run = classic_run(5);
        run.player.shielded = true;
        assert!(run.kill_player());
        assert!(!run.player.shielded);
        assert!(!run.player.dead);
        assert!(!run.kill_player());
        assert!(run.player.dead);
    }

    #[test]
    fn test_hardcore_ignores_shield() {
        let mut run = Run::new(
            RunConfig {
                mode: Mode::Hardcore,
                ..Default::default()
            },
            Tuning::default(),
        )
        .unwrap();
        run.player.shielded = true;
        assert!(!run.kill_player());
        assert!(run.player.dead);
    }

    #[test]
    fn test_zen_never_dies() {
        let mut run = Run::new(
            RunConfig {
                mode: Mode::Zen,
                ..Default::default()
            },
            Tuning::default(),
        )
        .unwrap();
        assert!(run.kill_player());
        assert!(!run.player.dead);
    }

    #[test]
    fn test_freeze_item_pauses_tiles() {
        let mut run = classic_run(11);
        // Let one tile spawn and get a known falling population
        for _ in 0..=SPAWN_INTERVAL_START {
            run.step(InputFrame::default());
        }
        assert!(!run.falling.is_empty());
        run.player.item_slot = Some(ItemKind::Freeze);
        run.step(InputFrame {
            use_item: true,
            ..Default::default()
        });
        // The freeze gates the tile phase starting with the next tick
        let before = run.falling[0].pos.y;
        run.step(InputFrame::default());
        assert_eq!(run.falling[0].pos.y, before);
    }

    #[test]
    fn test_bomb_item_spares_its_user() {
        let mut run = classic_run(13);
        run.grid.place(11, 11, Tile::new(TileKind::Solid));
        run.player.item_slot = Some(ItemKind::Bomb);
        let snap = run.step(InputFrame {
            use_item: true,
            ..Default::default()
        });
        assert!(!snap.dead);
        assert!(!run.player.shielded);
        assert!(run.grid.get(11, 11).is_none());
        assert!(snap
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::Exploded { .. })));
    }

    #[test]
    fn test_unstable_blast_stops_at_radius_one() {
        let mut run = classic_run(17);
        run.grid.place(3, 11, Tile::new(TileKind::Solid));
        run.grid.place(4, 11, Tile::new(TileKind::Solid));
        run.grid.place(7, 11, Tile::new(TileKind::Solid));
        let mut fuse = Tile::new(TileKind::Unstable);
        fuse.data.fuse_ticks = Some(2);
        run.grid.place(5, 11, fuse);

        for _ in 0..4 {
            run.step(InputFrame::default());
        }
        assert!(run.grid.get(5, 11).is_none());
        assert!(run.grid.get(4, 11).is_none());
        assert!(run.grid.get(3, 11).is_some());
        assert!(run.grid.get(7, 11).is_some());
        assert!(!run.player.dead);
    }

    #[test]
    fn test_terminal_snapshots_carry_no_stale_events() {
        let mut run = classic_run(19);
        run.player.item_slot = Some(ItemKind::Shield);
        let live = run.step(InputFrame {
            use_item: true,
            ..Default::default()
        });
        assert!(!live.events.is_empty());

        let aborted = run.abort();
        assert!(aborted.events.is_empty());
        let later = run.step(InputFrame::default());
        assert!(later.events.is_empty());
    }

    #[test]
    fn test_coin_pickup_scores_and_bumps_combo() {
        let mut run = Run::new(
            RunConfig {
                mode: Mode::Zen,
                ..Default::default()
            },
            Tuning::default(),
        )
        .unwrap();
        let beside = run.player.pos + Vec2::new(20.0, 0.0);
        run.pools.spawn_coin(beside, Vec2::ZERO);

        let walk = InputFrame {
            right: true,
            ..Default::default()
        };
        for _ in 0..60 {
            run.step(walk);
        }
        assert_eq!(run.scoring.score, COIN_BASE_VALUE as u64);
        assert!(run.scoring.combo.multiplier > 1.0);
    }

    #[test]
    fn test_combo_expires_back_to_one() {
        let mut run = Run::new(
            RunConfig {
                mode: Mode::Zen,
                ..Default::default()
            },
            Tuning::default(),
        )
        .unwrap();
        run.pools
            .spawn_coin(run.player.pos + Vec2::new(4.0, 0.0), Vec2::ZERO);
        run.pools
            .spawn_coin(run.player.pos + Vec2::new(-4.0, 0.0), Vec2::ZERO);
        for _ in 0..10 {
            run.step(InputFrame::default());
        }
        assert!(run.scoring.combo.multiplier > 1.0);

        let mut combo_ends = 0;
        for _ in 0..=COMBO_DURATION_TICKS {
            let snap = run.step(InputFrame::default());
            combo_ends += snap
                .events
                .iter()
                .filter(|e| **e == GameEvent::ComboEnded)
                .count();
        }
        assert_eq!(run.scoring.combo.multiplier, 1.0);
        assert_eq!(combo_ends, 1);
    }

    #[test]
    fn test_overcharge_dash_clears_adjacent_tile() {
        let mut run = Run::new(
            RunConfig {
                modifiers: Modifiers {
                    perks: vec![super::super::modifiers::Perk::Overcharge],
                    ..Default::default()
                },
                ..Default::default()
            },
            Tuning::default(),
        )
        .unwrap();
        run.grid.place(12, 11, Tile::new(TileKind::Solid));
        let start_x = run.player.pos.x;

        let hold = InputFrame {
            dash: true,
            ..Default::default()
        };
        for _ in 0..10 {
            run.step(hold);
        }
        let release = InputFrame {
            dash_released: true,
            ..Default::default()
        };
        run.step(release);
        for _ in 0..DASH_TICKS {
            run.step(InputFrame::default());
        }

        assert!(run.grid.get(12, 11).is_none());
        assert!(run.player.pos.x > start_x + 30.0);
        assert!(run.scoring.score >= TILE_BREAK_SCORE as u64);
        assert!(run.player.focus_meter < FOCUS_MAX - run.mods.dash_cost() + 1.0);
    }

    #[test]
    fn test_turret_with_blocked_los_never_fires() {
        let mut run = classic_run(13);
        // Turret on the floor row, player level with it on a pedestal,
        // and a solid tile square in the ray's path.
        run.grid.place(5, 11, Tile::new(TileKind::Solid));
        run.grid.place(7, 10, Tile::new(TileKind::Solid));
        run.grid.place(10, 11, Tile::new(TileKind::Solid));
        run.pools.spawn_turret((5, 11));
        run.player.pos = Vec2::new(
            10.0 * TILE_SIZE + TILE_SIZE / 2.0,
            11.0 * TILE_SIZE - PLAYER_HEIGHT / 2.0 - 0.01,
        );

        for _ in 0..200 {
            let snap = run.step(InputFrame::default());
            assert!(snap.projectiles.is_empty());
            assert!(!snap
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::TurretFired { .. })));
        }
    }

    #[test]
    fn test_restart_resets_state() {
        let mut run = classic_run(9);
        for _ in 0..200 {
            run.step(InputFrame::default());
        }
        run.abort();
        let snap = run.step(InputFrame {
            restart: true,
            ..Default::default()
        });
        assert_eq!(snap.tick, 0);
        assert!(!snap.terminal);
        assert!(snap.tiles.is_empty());
    }
}
