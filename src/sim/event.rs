//! Events emitted during a simulation tick.
//!
//! The presentation layer consumes these for animation/sound; tests
//! observe them for one-shot semantics. Events are collected into a
//! deferred queue and drained between phases in a fixed order, so no
//! subsystem ever re-enters another mid-update.

use serde::{Deserialize, Serialize};

use super::entities::ItemKind;
use super::grid::TileKind;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    TilePlaced { gx: i32, gy: i32, kind: TileKind },
    TileRemoved { gx: i32, gy: i32, kind: TileKind },
    TileCracked { gx: i32, gy: i32 },
    Bounced { gx: i32, gy: i32 },
    Exploded { gx: i32, gy: i32 },
    ChestOpened { gx: i32, gy: i32, item: ItemKind },
    RowCompleted { gy: i32 },
    CoinPicked { value: u32 },
    ItemPicked { kind: ItemKind },
    ItemUsed { kind: ItemKind },
    TurretFired { id: u32 },
    ComboEnded,
    ShieldBroken,
    PlayerDied,
    WallDust,
    BiomeChanged { index: u32 },
    ScrollAdvanced { target_height: f32 },
    DirectiveCompleted,
    /// One-shot config validation warning surfaced to the driver
    ConfigWarning { message: String },
}
