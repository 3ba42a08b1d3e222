//! Bonus spots along the track and the bonuses spawned on them.
use super::random_uuid;
use crate::error::Result;
use crate::geometry::Vec3;
use crate::level::{BonusInstance, BonusSpot, LevelRepresentation};
use crate::pipeline::{LevelGeneratorModule, LevelRng};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusSpotsSettings {
    /// Spots between each pair of consecutive track points
    pub count_between_hoops: usize,
}

impl Default for BonusSpotsSettings {
    fn default() -> Self {
        Self { count_between_hoops: 3 }
    }
}

/// Divides every track segment evenly into bonus spots. Which bonus (if any)
/// ends up on a spot is decided later by [`BonusPlacement`].
pub struct BonusSpotsGeneration {
    settings: BonusSpotsSettings,
}

impl BonusSpotsGeneration {
    pub fn new(settings: BonusSpotsSettings) -> Self {
        Self { settings }
    }
}

impl LevelGeneratorModule for BonusSpotsGeneration {
    fn name(&self) -> &'static str {
        "BonusSpotsGeneration"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, _rng: &mut LevelRng) -> Result<()> {
        let count = self.settings.count_between_hoops;
        level.bonuses.clear();
        for i in 0..level.track.len().saturating_sub(1) {
            let a = level.track[i].position;
            let b = level.track[i + 1].position;
            for j in 1..=count {
                let fraction = j as f32 / (count + 1) as f32;
                let mut spot = BonusSpot::new(a.lerp(b, fraction), i, fraction);
                spot.grid_coords = level.nearest_grid_point(spot.position);
                level.bonuses.push(spot);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusTypeSettings {
    pub name: String,
    /// Minimum and maximum number of instances in one row, inclusive
    pub count_range: [u32; 2],
    /// Repeating pattern of spots to fill, e.g. `[false, true]` is every other spot
    pub pattern: Vec<bool>,
    #[serde(default = "available_by_default")]
    pub available: bool,
}

fn available_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusPlacementSettings {
    /// Earlier entries take precedence when several patterns hit one spot
    pub bonuses: Vec<BonusTypeSettings>,
    /// Gap between bonuses in a row
    pub spacing: f32,
}

impl Default for BonusPlacementSettings {
    fn default() -> Self {
        let bonus = |name: &str, count_range, pattern: &[bool]| BonusTypeSettings {
            name: name.to_string(),
            count_range,
            pattern: pattern.to_vec(),
            available: true,
        };
        Self {
            bonuses: vec![
                bonus("speed", [2, 4], &[true, false, false, false, false]),
                bonus("navigation", [1, 2], &[false, true, false, false]),
                bonus("mana", [1, 3], &[false, false, true]),
                bonus("recharge", [1, 1], &[false, false, false, false, false, false, true]),
            ],
            spacing: 2.0,
        }
    }
}

/// Fills bonus spots according to per-type patterns, spawning a row of
/// instances across the track, and drops spots that stay empty.
pub struct BonusPlacement {
    settings: BonusPlacementSettings,
}

impl BonusPlacement {
    pub fn new(settings: BonusPlacementSettings) -> Self {
        Self { settings }
    }

    fn fill_spot(&self, level: &mut LevelRepresentation, index: usize, bonus: &BonusTypeSettings, rng: &mut LevelRng) {
        let [a, b] = bonus.count_range;
        let count = rng.gen_range(a.min(b)..=a.max(b));
        if count == 0 {
            return;
        }
        let spot = &level.bonuses[index];
        let previous = spot.previous_hoop_index;
        let forward = match (level.track.get(previous), level.track.get(previous + 1)) {
            (Some(p), Some(n)) => (n.position - p.position).with_y(0.0),
            _ => Vec3::FORWARD,
        };
        let across = forward.cross(&Vec3::UP);
        let right = if across.length() > 1e-4 {
            across.normalize()
        } else {
            Vec3::new(1.0, 0.0, 0.0)
        };
        let spacing = self.settings.spacing;
        let leftmost = spot.position - right * (spacing * (count - 1) as f32 / 2.0);

        let instances: Vec<BonusInstance> = (0..count)
            .map(|i| BonusInstance {
                id: random_uuid(rng),
                bonus: bonus.name.clone(),
                position: leftmost + right * (spacing * i as f32),
            })
            .collect();
        let spot = &mut level.bonuses[index];
        spot.instances.extend(instances);
        spot.is_empty = false;
    }
}

impl LevelGeneratorModule for BonusPlacement {
    fn name(&self) -> &'static str {
        "BonusPlacement"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) -> Result<()> {
        for bonus in &self.settings.bonuses {
            if !bonus.available || bonus.pattern.is_empty() {
                continue;
            }
            for i in 0..level.bonuses.len() {
                if level.bonuses[i].is_empty && bonus.pattern[i % bonus.pattern.len()] {
                    self.fill_spot(level, i, bonus, rng);
                }
            }
        }
        let before = level.bonuses.len();
        level.bonuses.retain(|spot| !spot.is_empty);
        debug!("Filled {} of {} bonus spots", level.bonuses.len(), before);
        Ok(())
    }
}
