//! Data-driven balance tables: biomes, item drops, upgrades, characters
//!
//! Built-in defaults are compiled in; `Tuning::from_json` overlays an
//! external document on top of them. Validation never fails the whole
//! load over a bad entry: unknown tile kinds are dropped with a warning,
//! missing sections fall back to the defaults. Only structurally broken
//! JSON is rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sim::entities::ItemKind;
use crate::sim::grid::TileKind;
use crate::sim::run::ConfigError;

/// Spawn tables and thresholds for one biome
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Biome {
    pub name: String,
    /// Score at which this biome takes over
    pub score_req: u64,
    pub tile_weights: Vec<(TileKind, u32)>,
    /// Overrides the base table at `special_rate` percent
    pub special_weights: Vec<(TileKind, u32)>,
    pub special_rate: u32,
    /// Percent chance a settled tile carries a turret
    pub turret_rate: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub name: String,
    pub desc: String,
    pub base_cost: u64,
    pub max_level: u32,
}

impl UpgradeDef {
    /// Cost of buying the next level when `level` are already owned.
    pub fn cost(&self, level: u32) -> u64 {
        (self.base_cost as f64 * 1.5f64.powi(level as i32)).floor() as u64
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CharacterDef {
    pub id: String,
    pub name: String,
    pub desc: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tuning {
    pub biomes: Vec<Biome>,
    /// Weighted chest/item drop table
    pub item_weights: Vec<(ItemKind, u32)>,
    pub upgrades: BTreeMap<String, UpgradeDef>,
    pub characters: Vec<CharacterDef>,
    /// Validation fallbacks collected during load; surfaced once per run
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl Default for Tuning {
    fn default() -> Self {
        use ItemKind::*;
        use TileKind::*;

        let biomes = vec![
            Biome {
                name: "meadow".to_string(),
                score_req: 0,
                tile_weights: vec![
                    (Solid, 60),
                    (Fragile, 15),
                    (Bounce, 10),
                    (Greed, 8),
                    (Chest, 4),
                    (Sticky, 3),
                ],
                special_weights: vec![(Magnetic, 40), (Motherlode, 30), (Unstable, 30)],
                special_rate: 6,
                turret_rate: 0,
            },
            Biome {
                name: "caverns".to_string(),
                score_req: 500,
                tile_weights: vec![
                    (Solid, 50),
                    (Fragile, 15),
                    (Spike, 10),
                    (Bounce, 8),
                    (Greed, 8),
                    (Chest, 5),
                    (Magnetic, 4),
                ],
                special_weights: vec![(Motherlode, 40), (Unstable, 40), (Sticky, 20)],
                special_rate: 8,
                turret_rate: 3,
            },
            Biome {
                name: "foundry".to_string(),
                score_req: 1500,
                tile_weights: vec![
                    (Solid, 45),
                    (Spike, 14),
                    (Fragile, 12),
                    (Bounce, 8),
                    (Unstable, 8),
                    (Greed, 7),
                    (Chest, 6),
                ],
                special_weights: vec![(Motherlode, 50), (Magnetic, 25), (Unstable, 25)],
                special_rate: 10,
                turret_rate: 6,
            },
            Biome {
                name: "stratosphere".to_string(),
                score_req: 3500,
                tile_weights: vec![
                    (Solid, 40),
                    (Spike, 16),
                    (Fragile, 14),
                    (Bounce, 10),
                    (Unstable, 10),
                    (Chest, 6),
                    (Greed, 4),
                ],
                special_weights: vec![(Motherlode, 60), (Unstable, 40)],
                special_rate: 12,
                turret_rate: 9,
            },
        ];

        let item_weights = vec![
            (Shield, 20),
            (Bomb, 18),
            (Freeze, 15),
            (Hourglass, 15),
            (Jump, 12),
            (Cube, 12),
            (Warp, 8),
        ];

        let mut upgrades = BTreeMap::new();
        upgrades.insert(
            "coin_magnet".to_string(),
            UpgradeDef {
                name: "Coin Magnet".to_string(),
                desc: "Coins drift toward you from farther away".to_string(),
                base_cost: 100,
                max_level: 5,
            },
        );
        upgrades.insert(
            "focus_mastery".to_string(),
            UpgradeDef {
                name: "Focus Mastery".to_string(),
                desc: "Dashes cost less focus".to_string(),
                base_cost: 150,
                max_level: 4,
            },
        );
        upgrades.insert(
            "starting_item".to_string(),
            UpgradeDef {
                name: "Packed Lunch".to_string(),
                desc: "Begin each run holding a shield".to_string(),
                base_cost: 250,
                max_level: 1,
            },
        );
        upgrades.insert(
            "curse_reroll".to_string(),
            UpgradeDef {
                name: "Second Opinion".to_string(),
                desc: "Reroll one curse before a run".to_string(),
                base_cost: 200,
                max_level: 1,
            },
        );

        let characters = vec![
            CharacterDef {
                id: "scout".to_string(),
                name: "Scout".to_string(),
                desc: "Balanced all-rounder".to_string(),
            },
            CharacterDef {
                id: "miner".to_string(),
                name: "Miner".to_string(),
                desc: "At home under falling rock".to_string(),
            },
            CharacterDef {
                id: "drifter".to_string(),
                name: "Drifter".to_string(),
                desc: "Never stays anywhere long".to_string(),
            },
        ];

        Self {
            biomes,
            item_weights,
            upgrades,
            characters,
            warnings: Vec::new(),
        }
    }
}

/// External document shape: weights keyed by kind name so hand-edited
/// tables stay readable.
#[derive(Debug, Deserialize)]
struct RawTuning {
    #[serde(default)]
    biomes: Option<Vec<RawBiome>>,
    #[serde(default)]
    item_weights: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    upgrades: Option<BTreeMap<String, UpgradeDef>>,
    #[serde(default)]
    characters: Option<Vec<CharacterDef>>,
}

#[derive(Debug, Deserialize)]
struct RawBiome {
    name: String,
    #[serde(default)]
    score_req: u64,
    tile_weights: BTreeMap<String, u32>,
    #[serde(default)]
    special_weights: BTreeMap<String, u32>,
    #[serde(default)]
    special_rate: u32,
    #[serde(default)]
    turret_rate: u32,
}

fn parse_kind<K: serde::de::DeserializeOwned>(name: &str) -> Option<K> {
    serde_json::from_value(serde_json::Value::String(name.to_string())).ok()
}

fn convert_weights<K: serde::de::DeserializeOwned>(
    raw: &BTreeMap<String, u32>,
    context: &str,
    warnings: &mut Vec<String>,
) -> Vec<(K, u32)> {
    let mut out = Vec::new();
    for (name, &weight) in raw {
        match parse_kind::<K>(name) {
            Some(kind) => out.push((kind, weight)),
            None => {
                let message = format!("{context}: unknown kind `{name}` ignored");
                log::warn!("{message}");
                warnings.push(message);
            }
        }
    }
    out
}

impl Tuning {
    /// Overlay an external JSON document onto the built-in defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawTuning =
            serde_json::from_str(text).map_err(|e| ConfigError::BadTable(e.to_string()))?;
        let mut tuning = Tuning::default();
        let mut warnings = Vec::new();

        if let Some(biomes) = raw.biomes {
            let mut converted = Vec::new();
            for b in biomes {
                let tile_weights =
                    convert_weights::<TileKind>(&b.tile_weights, &b.name, &mut warnings);
                if tile_weights.is_empty() {
                    warnings.push(format!("biome `{}` has no usable tiles, skipped", b.name));
                    continue;
                }
                converted.push(Biome {
                    tile_weights,
                    special_weights: convert_weights::<TileKind>(
                        &b.special_weights,
                        &b.name,
                        &mut warnings,
                    ),
                    name: b.name,
                    score_req: b.score_req,
                    special_rate: b.special_rate,
                    turret_rate: b.turret_rate,
                });
            }
            if converted.is_empty() {
                return Err(ConfigError::BadTable("no valid biomes".to_string()));
            }
            tuning.biomes = converted;
        }
        if let Some(items) = raw.item_weights {
            let item_weights = convert_weights::<ItemKind>(&items, "items", &mut warnings);
            if !item_weights.is_empty() {
                tuning.item_weights = item_weights;
            }
        }
        if let Some(upgrades) = raw.upgrades {
            tuning.upgrades = upgrades;
        }
        if let Some(characters) = raw.characters {
            tuning.characters = characters;
        }

        tuning.warnings = warnings;
        Ok(tuning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_are_usable() {
        let tuning = Tuning::default();
        assert!(!tuning.biomes.is_empty());
        for biome in &tuning.biomes {
            assert!(!biome.tile_weights.is_empty());
            assert!(biome.tile_weights.iter().all(|&(_, w)| w > 0));
            assert!(biome.special_rate <= 100);
        }
        // Thresholds must be monotonic for the biome tracker
        for pair in tuning.biomes.windows(2) {
            assert!(pair[0].score_req < pair[1].score_req);
        }
        assert!(!tuning.item_weights.is_empty());
    }

    #[test]
    fn test_upgrade_cost_scaling() {
        let def = UpgradeDef {
            name: "x".into(),
            desc: "x".into(),
            base_cost: 100,
            max_level: 5,
        };
        assert_eq!(def.cost(0), 100);
        assert_eq!(def.cost(1), 150);
        assert_eq!(def.cost(2), 225);
        assert_eq!(def.cost(3), 337);
    }

    #[test]
    fn test_from_json_ignores_unknown_kinds() {
        let doc = r#"{
            "biomes": [{
                "name": "test",
                "score_req": 0,
                "tile_weights": {"solid": 10, "lava": 5},
                "special_weights": {"motherlode": 1},
                "special_rate": 5
            }]
        }"#;
        let tuning = Tuning::from_json(doc).unwrap();
        assert_eq!(tuning.biomes.len(), 1);
        assert_eq!(tuning.biomes[0].tile_weights, vec![(TileKind::Solid, 10)]);
        assert_eq!(tuning.warnings.len(), 1);
        assert!(tuning.warnings[0].contains("lava"));
    }

    #[test]
    fn test_from_json_missing_sections_default() {
        let tuning = Tuning::from_json("{}").unwrap();
        assert_eq!(tuning.biomes.len(), Tuning::default().biomes.len());
        assert!(tuning.warnings.is_empty());
    }

    #[test]
    fn test_from_json_rejects_broken_document() {
        assert!(matches!(
            Tuning::from_json("not json"),
            Err(ConfigError::BadTable(_))
        ));
    }

    #[test]
    fn test_biome_with_no_usable_tiles_is_skipped() {
        let doc = r#"{
            "biomes": [
                {"name": "junk", "tile_weights": {"lava": 5}},
                {"name": "ok", "tile_weights": {"solid": 1}}
            ]
        }"#;
        let tuning = Tuning::from_json(doc).unwrap();
        assert_eq!(tuning.biomes.len(), 1);
        assert_eq!(tuning.biomes[0].name, "ok");
    }
}
