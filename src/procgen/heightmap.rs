//! Height map generators based on octaved Perlin noise.
use super::noise::{OctaveSettings, OctavedPerlin};
use crate::error::Result;
use crate::geometry::remap;
use crate::level::LevelRepresentation;
use crate::pipeline::{LevelGeneratorModule, LevelRng};
use crate::region::RegionKind;
use crate::terrain::TerrainPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightMapPerlinSettings {
    pub octaves: OctaveSettings,
    /// Minimum and maximum terrain height
    pub height_range: [f32; 2],
}

impl Default for HeightMapPerlinSettings {
    fn default() -> Self {
        Self {
            octaves: OctaveSettings::default(),
            height_range: [-5.0, 25.0],
        }
    }
}

/// Assigns every terrain point a height from one octaved Perlin noise,
/// remapped onto the configured height range.
pub struct HeightMapPerlin {
    settings: HeightMapPerlinSettings,
}

impl HeightMapPerlin {
    pub fn new(settings: HeightMapPerlinSettings) -> Self {
        Self { settings }
    }
}

impl LevelGeneratorModule for HeightMapPerlin {
    fn name(&self) -> &'static str {
        "HeightMapPerlin"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) -> Result<()> {
        let noise = OctavedPerlin::from_rng(rng, self.settings.octaves);
        let (min, max) = sample_heights(level, |_| &noise);

        let [low, high] = self.settings.height_range;
        for_each_point(level, |point| {
            point.position.y = remap(point.position.y, min, max, low, high);
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionHeightSettings {
    pub region: RegionKind,
    #[serde(default)]
    pub octaves: OctaveSettings,
    pub height_range: [f32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionHeightMapSettings {
    /// Used for regions without their own entry
    pub default_octaves: OctaveSettings,
    pub default_height_range: [f32; 2],
    pub regions: Vec<RegionHeightSettings>,
}

impl Default for RegionHeightMapSettings {
    fn default() -> Self {
        let region = |region, octaves, low, high| RegionHeightSettings {
            region,
            octaves,
            height_range: [low, high],
        };
        let gentle = OctaveSettings {
            octaves: 2,
            initial_frequency: 0.02,
            ..OctaveSettings::default()
        };
        let rugged = OctaveSettings {
            octaves: 4,
            initial_frequency: 0.03,
            ..OctaveSettings::default()
        };
        Self {
            default_octaves: OctaveSettings::default(),
            default_height_range: [0.0, 6.0],
            regions: vec![
                region(RegionKind::AboveWater, gentle, -3.0, 1.0),
                region(RegionKind::EnchantedForest, OctaveSettings::default(), 0.0, 8.0),
                region(RegionKind::AridDesert, gentle, 0.0, 10.0),
                region(RegionKind::BloomingMeadow, gentle, 0.0, 5.0),
                region(RegionKind::StormyArea, OctaveSettings::default(), 0.0, 14.0),
                region(RegionKind::SnowyMountain, rugged, 5.0, 40.0),
            ],
        }
    }
}

/// Like [`HeightMapPerlin`] but with noise parameters and height range chosen
/// per terrain region. Needs regions to be assigned already.
pub struct HeightMapRegionPerlin {
    settings: RegionHeightMapSettings,
}

impl HeightMapRegionPerlin {
    pub fn new(settings: RegionHeightMapSettings) -> Self {
        Self { settings }
    }
}

impl LevelGeneratorModule for HeightMapRegionPerlin {
    fn name(&self) -> &'static str {
        "HeightMapRegionPerlin"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) -> Result<()> {
        let mut region_noise = HashMap::new();
        let mut region_range = HashMap::new();
        for params in &self.settings.regions {
            region_noise.insert(params.region, OctavedPerlin::from_rng(rng, params.octaves));
            region_range.insert(params.region, params.height_range);
        }
        let default_noise = OctavedPerlin::from_rng(rng, self.settings.default_octaves);

        let (min, max) = sample_heights(level, |region| {
            region_noise.get(&region).unwrap_or(&default_noise)
        });

        for_each_point(level, |point| {
            let [low, high] = region_range
                .get(&point.region)
                .copied()
                .unwrap_or(self.settings.default_height_range);
            point.position.y = remap(point.position.y, min, max, low, high);
        });
        Ok(())
    }
}

/// Writes raw noise values into point heights and returns their range.
/// Sampling uses distances rather than indices so the terrain shape does not
/// depend on the grid spacing.
fn sample_heights<'n>(
    level: &mut LevelRepresentation,
    noise_for: impl Fn(RegionKind) -> &'n OctavedPerlin,
) -> (f32, f32) {
    let offset = level.terrain.point_offset();
    let count = level.terrain.point_count();
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for x in 0..count.x {
        for z in 0..count.z {
            let point = &mut level.terrain[(x, z)];
            let height = noise_for(point.region).sample(x as f32 * offset, z as f32 * offset);
            point.position.y = height;
            min = min.min(height);
            max = max.max(height);
        }
    }
    (min, max)
}

fn for_each_point(level: &mut LevelRepresentation, mut f: impl FnMut(&mut TerrainPoint)) {
    let count = level.terrain.point_count();
    for x in 0..count.x {
        for z in 0..count.z {
            f(&mut level.terrain[(x, z)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use rand::SeedableRng;

    fn level() -> LevelRepresentation {
        LevelRepresentation::new(Vec2::new(40.0, 40.0), 1.0, 10)
    }

    fn heights(level: &LevelRepresentation) -> Vec<f32> {
        let count = level.terrain.point_count();
        (0..count.x)
            .flat_map(|x| (0..count.z).map(move |z| (x, z)))
            .map(|(x, z)| level.terrain[(x, z)].position.y)
            .collect()
    }

    #[test]
    fn test_heights_span_configured_range() {
        let mut level = level();
        let mut rng = LevelRng::seed_from_u64(3);
        HeightMapPerlin::new(HeightMapPerlinSettings::default())
            .generate(&mut level, &mut rng)
            .unwrap();

        let heights = heights(&level);
        let min = heights.iter().cloned().fold(f32::MAX, f32::min);
        let max = heights.iter().cloned().fold(f32::MIN, f32::max);
        assert!((min + 5.0).abs() < 1e-3);
        assert!((max - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_same_seed_same_heights() {
        let mut a = level();
        let mut b = level();
        let mut module = HeightMapPerlin::new(HeightMapPerlinSettings::default());
        module.generate(&mut a, &mut LevelRng::seed_from_u64(9)).unwrap();
        module.generate(&mut b, &mut LevelRng::seed_from_u64(9)).unwrap();
        assert_eq!(heights(&a), heights(&b));
    }

    #[test]
    fn test_region_heights_stay_in_region_range() {
        let mut level = level();
        let count = level.terrain.point_count();
        for x in 0..count.x {
            for z in 0..count.z {
                level.terrain[(x, z)].region = if x < count.x / 2 {
                    RegionKind::SnowyMountain
                } else {
                    RegionKind::StormyArea
                };
            }
        }
        let settings = RegionHeightMapSettings {
            regions: vec![RegionHeightSettings {
                region: RegionKind::SnowyMountain,
                octaves: OctaveSettings::default(),
                height_range: [20.0, 30.0],
            }],
            ..RegionHeightMapSettings::default()
        };

        let mut rng = LevelRng::seed_from_u64(5);
        HeightMapRegionPerlin::new(settings).generate(&mut level, &mut rng).unwrap();

        for x in 0..count.x {
            for z in 0..count.z {
                let point = &level.terrain[(x, z)];
                let (low, high) = match point.region {
                    RegionKind::SnowyMountain => (20.0, 30.0),
                    _ => (0.0, 6.0),
                };
                assert!(point.position.y >= low - 1e-3 && point.position.y <= high + 1e-3);
            }
        }
    }
}
