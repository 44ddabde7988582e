//! Combo and score accounting
//!
//! Every scoring event bumps the combo multiplier and refreshes its
//! timer; the timer decays per tick (faster under glass_cannon) and the
//! multiplier snaps back to 1.0 on expiry.

use serde::{Deserialize, Serialize};

use crate::consts::*;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Combo {
    /// Current multiplier, 1.0 up to the configured ceiling
    pub multiplier: f32,
    pub remaining_ticks: u32,
}

impl Default for Combo {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            remaining_ticks: 0,
        }
    }
}

impl Combo {
    /// Refresh after a scoring event.
    pub fn bump(&mut self, ceiling: f32) {
        self.multiplier = (self.multiplier + COMBO_DELTA).min(ceiling);
        self.remaining_ticks = COMBO_DURATION_TICKS;
    }

    /// Decay one tick. Returns true exactly once, on the tick the combo
    /// expires.
    pub fn tick(&mut self, decay_rate: u32) -> bool {
        if self.remaining_ticks == 0 {
            return false;
        }
        self.remaining_ticks = self.remaining_ticks.saturating_sub(decay_rate);
        if self.remaining_ticks == 0 {
            self.multiplier = 1.0;
            return true;
        }
        false
    }
}

/// Score plus the combo that scales it
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Scoring {
    pub score: u64,
    pub combo: Combo,
}

impl Scoring {
    /// Coin pickup: floor(base * multiplier), then refresh the combo.
    /// Returns the score delta.
    pub fn coin_pickup(&mut self, base_value: u32, ceiling: f32) -> u64 {
        let delta = (base_value as f32 * self.combo.multiplier).floor() as u64;
        self.score += delta;
        self.combo.bump(ceiling);
        delta
    }

    /// Fixed destruction bonus (tiles broken, chests opened, detonations).
    /// Refreshes the combo without scaling the bonus.
    pub fn bonus(&mut self, points: u32, ceiling: f32) -> u64 {
        self.score += points as u64;
        self.combo.bump(ceiling);
        points as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_pickup_scales_with_multiplier() {
        let mut s = Scoring::default();
        assert_eq!(s.coin_pickup(10, COMBO_MAX), 10);
        assert!(s.combo.multiplier > 1.0);
        // Second pickup pays out with the bumped multiplier
        let second = s.coin_pickup(10, COMBO_MAX);
        assert_eq!(second, (10.0 * (1.0 + COMBO_DELTA)).floor() as u64);
    }

    #[test]
    fn test_combo_expiry_emits_once() {
        let mut combo = Combo::default();
        combo.bump(COMBO_MAX);
        let mut ends = 0;
        for _ in 0..COMBO_DURATION_TICKS + 10 {
            if combo.tick(1) {
                ends += 1;
            }
        }
        assert_eq!(ends, 1);
        assert_eq!(combo.multiplier, 1.0);
        assert_eq!(combo.remaining_ticks, 0);
    }

    #[test]
    fn test_glass_cannon_decays_twice_as_fast() {
        let mut fast = Combo::default();
        let mut slow = Combo::default();
        fast.bump(COMBO_MAX);
        slow.bump(COMBO_MAX);
        let mut fast_ticks = 0;
        while !fast.tick(2) {
            fast_ticks += 1;
        }
        let mut slow_ticks = 0;
        while !slow.tick(1) {
            slow_ticks += 1;
        }
        assert_eq!((fast_ticks + 1) * 2, slow_ticks + 1);
    }

    #[test]
    fn test_multiplier_respects_ceiling() {
        let mut combo = Combo::default();
        for _ in 0..100 {
            combo.bump(COMBO_MAX);
        }
        assert_eq!(combo.multiplier, COMBO_MAX);
    }

    #[test]
    fn test_multiplier_never_below_one() {
        let mut combo = Combo::default();
        combo.bump(COMBO_MAX);
        while !combo.tick(1) {}
        assert!(combo.multiplier >= 1.0);
    }
}
