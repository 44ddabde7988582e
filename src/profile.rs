//! Persisted player profile, read and written by the driver only
//!
//! One JSON document. Missing keys default, unknown top-level keys are
//! preserved across a load/save round trip so older and newer builds can
//! share a file. The simulation core never touches this; the driver
//! translates it into a `RunConfig` up front.

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::sim::modifiers::{Artifact, Directive, Upgrades};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Characters {
    pub unlocked: Vec<String>,
    pub selected: String,
}

impl Default for Characters {
    fn default() -> Self {
        Self {
            unlocked: vec!["scout".to_string()],
            selected: "scout".to_string(),
        }
    }
}

/// Everything the player has ever seen, for the collection screens
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Compendium {
    pub perks: Vec<String>,
    pub curses: Vec<String>,
    pub items: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub play_time: f64,
    pub total_coins: u64,
    pub runs_started: u64,
    pub daily_challenge_high_score: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifacts {
    pub unlocked: Vec<String>,
    pub equipped: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sfx_volume: f32,
    pub music_volume: f32,
    pub screen_shake: bool,
    pub resizable_window: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sfx_volume: 0.8,
            music_volume: 0.6,
            screen_shake: true,
            resizable_window: true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub banked_coins: u64,
    pub high_score: u64,
    pub upgrades: std::collections::BTreeMap<String, u32>,
    pub characters: Characters,
    pub compendium: Compendium,
    pub stats: Stats,
    pub biomes_unlocked: Vec<String>,
    pub artifacts: Artifacts,
    pub active_directive: Option<Directive>,
    pub settings: Settings,
    /// Keys this build does not recognize ride along untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    /// Load from disk, falling back to defaults on any error.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<Profile>(&text) {
                Ok(mut profile) => {
                    profile.sanitize();
                    profile
                }
                Err(e) => {
                    warn!("profile at {} unreadable ({e}), using defaults", path.display());
                    Profile::default()
                }
            },
            Err(_) => Profile::default(),
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, text)
    }

    fn sanitize(&mut self) {
        self.settings.sfx_volume = self.settings.sfx_volume.clamp(0.0, 1.0);
        self.settings.music_volume = self.settings.music_volume.clamp(0.0, 1.0);
        if let Some(directive) = &self.active_directive {
            if !directive.is_valid() {
                warn!("stored directive failed validation, dropping it");
                self.active_directive = None;
            }
        }
    }

    /// Upgrade levels in the shape the modifier bag wants. Missing keys
    /// default to level 0.
    pub fn upgrade_levels(&self) -> Upgrades {
        let level = |key: &str| self.upgrades.get(key).copied().unwrap_or(0);
        Upgrades {
            coin_magnet: level("coin_magnet"),
            focus_mastery: level("focus_mastery"),
            starting_item: level("starting_item"),
            curse_reroll: level("curse_reroll"),
        }
    }

    /// The equipped artifact, if its id parses.
    pub fn equipped_artifact(&self) -> Option<Artifact> {
        let id = self.artifacts.equipped.as_deref()?;
        serde_json::from_value(serde_json::Value::String(id.to_string())).ok()
    }

    /// Fold a finished run back into the profile.
    pub fn record_run(&mut self, score: u64, coins: u64, daily: bool) {
        self.banked_coins += coins;
        self.stats.total_coins += coins;
        if daily {
            self.stats.daily_challenge_high_score =
                self.stats.daily_challenge_high_score.max(score);
        } else {
            self.high_score = self.high_score.max(score);
        }
    }
}
