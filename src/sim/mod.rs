//! Deterministic fixed-timestep simulation core
//!
//! Everything in here is pure state plus synchronous update functions:
//! no I/O, no clocks, no global state. Given the same seed and the same
//! input sequence, two runs produce byte-identical snapshot sequences.

pub mod combat;
pub mod entities;
pub mod event;
pub mod falling;
pub mod grid;
pub mod modifiers;
pub mod player;
pub mod rng;
pub mod run;
pub mod timescale;

pub use event::GameEvent;
pub use grid::{Grid, Tile, TileKind};
pub use modifiers::{Artifact, Curse, Directive, Modifiers, Perk, Upgrades};
pub use player::Player;
pub use run::{ConfigError, InputFrame, Mode, Run, RunConfig, Snapshot};
