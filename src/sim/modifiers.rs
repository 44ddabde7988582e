//! Run modifiers: perks, curses, artifacts, directive, upgrade levels
//!
//! One flat bag per run. Every rule change flows through a small scalar
//! or predicate hook consumed at exactly one call site in the simulation;
//! hooks never mutate anything themselves.

use serde::{Deserialize, Serialize};

use super::entities::ItemKind;
use crate::consts::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perk {
    /// Gravity scaled to 0.8
    FeatherFall,
    /// Projectiles pierce one extra tile
    Technician,
    /// Dashing destroys destructible tiles in the path
    Overcharge,
    /// Greed tiles and chests emit double coins
    Greedy,
    /// Wall contact alone allows a jump
    Acrobat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curse {
    /// Combo timer decays twice as fast
    GlassCannon,
    /// Falling tiles drop noticeably faster
    Leadfall,
    /// Time meter drains half again as fast
    Restless,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    /// Slow-motion drains the time meter at half rate
    ChronoLens,
    /// Raises the combo multiplier ceiling
    ComboCrown,
    /// Stretches the spawn cadence
    LodestoneCharm,
}

/// Purchasable upgrade levels carried into a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub coin_magnet: u32,
    pub focus_mastery: u32,
    pub starting_item: u32,
    pub curse_reroll: u32,
}

/// Objective kinds a directive may carry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveObjective {
    CollectCoins,
    ReachScore,
    BreakTiles,
    SurviveTicks,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveReward {
    BankedCoins,
    ArtifactUnlock,
}

/// A validated, fully-structured directive. Free-form agent output never
/// reaches the core; the driver parses and validates first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub objective_type: DirectiveObjective,
    pub value: u64,
    pub reward_type: DirectiveReward,
    pub reward_value: u64,
    pub flavor_text: String,
}

impl Directive {
    /// Structural validation; anything failing here is `config_invalid`.
    pub fn is_valid(&self) -> bool {
        self.value > 0 && !self.flavor_text.is_empty()
    }
}

/// The per-run modifier bag
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub perks: Vec<Perk>,
    pub curses: Vec<Curse>,
    pub artifact: Option<Artifact>,
    pub directive: Option<Directive>,
    pub upgrades: Upgrades,
}

impl Modifiers {
    pub fn has_perk(&self, perk: Perk) -> bool {
        self.perks.contains(&perk)
    }

    pub fn has_curse(&self, curse: Curse) -> bool {
        self.curses.contains(&curse)
    }

    /// Gravity multiplier (feather_fall)
    pub fn gravity_scale(&self) -> f32 {
        if self.has_perk(Perk::FeatherFall) {
            0.8
        } else {
            1.0
        }
    }

    /// Combo timer ticks removed per simulation tick (glass_cannon)
    pub fn combo_decay_rate(&self) -> u32 {
        if self.has_curse(Curse::GlassCannon) {
            2
        } else {
            1
        }
    }

    /// Pierce hit points for player projectiles (technician)
    pub fn projectile_pierce_hp(&self) -> u32 {
        if self.has_perk(Perk::Technician) {
            2
        } else {
            1
        }
    }

    /// Radius within which coins drift toward the player (coin_magnet)
    pub fn coin_magnet_radius(&self) -> f32 {
        COIN_MAGNET_RADIUS + COIN_MAGNET_RADIUS_PER_LEVEL * self.upgrades.coin_magnet as f32
    }

    /// Whether a dash removes destructible tiles it crosses (overcharge)
    pub fn dash_destroys_tiles(&self) -> bool {
        self.has_perk(Perk::Overcharge)
    }

    /// Coin-count multiplier for greed tiles and chest bursts (greedy)
    pub fn chest_coin_multiplier(&self) -> u32 {
        if self.has_perk(Perk::Greedy) {
            2
        } else {
            1
        }
    }

    /// Focus cost of one dash (focus_mastery, floored at 10)
    pub fn dash_cost(&self) -> f32 {
        (DASH_COST - 5.0 * self.upgrades.focus_mastery as f32).max(10.0)
    }

    /// Item granted at run start (starting_item)
    pub fn start_with_item(&self) -> Option<ItemKind> {
        (self.upgrades.starting_item > 0).then_some(ItemKind::Shield)
    }

    /// Whether the pre-run UI may reroll a curse (curse_reroll)
    pub fn reroll_curse_available(&self) -> bool {
        self.upgrades.curse_reroll > 0
    }

    /// Multiplier applied to the falling-tile spawn interval
    pub fn spawn_interval_scale(&self) -> f32 {
        let mut scale = 1.0;
        if self.artifact == Some(Artifact::LodestoneCharm) {
            scale *= 1.25;
        }
        scale
    }

    /// Gravity multiplier for falling tiles (leadfall curse)
    pub fn tile_gravity_scale(&self) -> f32 {
        if self.has_curse(Curse::Leadfall) {
            1.5
        } else {
            1.0
        }
    }

    /// Time-meter drain multiplier while slow is held
    pub fn time_drain_scale(&self) -> f32 {
        let mut scale = 1.0;
        if self.artifact == Some(Artifact::ChronoLens) {
            scale *= 0.5;
        }
        if self.has_curse(Curse::Restless) {
            scale *= 1.5;
        }
        scale
    }

    /// Combo multiplier ceiling
    pub fn combo_ceiling(&self) -> f32 {
        if self.artifact == Some(Artifact::ComboCrown) {
            COMBO_MAX + 1.0
        } else {
            COMBO_MAX
        }
    }
}

/// Tracks directive progress against score-side events
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DirectiveTracker {
    pub progress: u64,
    pub complete: bool,
}

impl DirectiveTracker {
    /// Fold one scoring-side delta into the objective. Returns true on
    /// the tick the objective first completes.
    pub fn on_score_event(&mut self, directive: &Directive, delta: u64) -> bool {
        if self.complete {
            return false;
        }
        self.progress = self.progress.saturating_add(delta);
        if self.progress >= directive.value {
            self.complete = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_are_pure_and_repeatable() {
        let mods = Modifiers {
            perks: vec![Perk::FeatherFall, Perk::Technician],
            curses: vec![Curse::GlassCannon],
            ..Default::default()
        };
        // Applying the same bag twice yields the same derived scalars.
        assert_eq!(mods.gravity_scale(), mods.gravity_scale());
        assert_eq!(mods.combo_decay_rate(), 2);
        assert_eq!(mods.projectile_pierce_hp(), 2);
    }

    #[test]
    fn test_default_scalars() {
        let mods = Modifiers::default();
        assert_eq!(mods.gravity_scale(), 1.0);
        assert_eq!(mods.combo_decay_rate(), 1);
        assert_eq!(mods.projectile_pierce_hp(), 1);
        assert_eq!(mods.dash_cost(), DASH_COST);
        assert!(!mods.dash_destroys_tiles());
        assert!(mods.start_with_item().is_none());
    }

    #[test]
    fn test_dash_cost_floors_at_ten() {
        let mods = Modifiers {
            upgrades: Upgrades {
                focus_mastery: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(mods.dash_cost(), 10.0);
    }

    #[test]
    fn test_directive_tracker_completes_once() {
        let directive = Directive {
            objective_type: DirectiveObjective::CollectCoins,
            value: 5,
            reward_type: DirectiveReward::BankedCoins,
            reward_value: 100,
            flavor_text: "Gather the glitter".into(),
        };
        let mut tracker = DirectiveTracker::default();
        assert!(!tracker.on_score_event(&directive, 3));
        assert!(tracker.on_score_event(&directive, 3));
        // Already complete: further deltas report false
        assert!(!tracker.on_score_event(&directive, 10));
    }

    #[test]
    fn test_directive_validation() {
        let bad = Directive {
            objective_type: DirectiveObjective::ReachScore,
            value: 0,
            reward_type: DirectiveReward::BankedCoins,
            reward_value: 1,
            flavor_text: "x".into(),
        };
        assert!(!bad.is_valid());
    }
}
