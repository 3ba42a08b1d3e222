//! Level generator modules and the default generation setup.
//!
//! Modules run in the order returned by [`default_modules`]: the track is
//! laid out first because it decides the terrain size, then regions and
//! heights are generated around it, and finally the track is fitted onto the
//! terrain and populated with hoops, walls, bonuses and opponents.

pub mod bonus;
pub mod border;
pub mod heightmap;
pub mod noise;
pub mod opponents;
pub mod regions;
pub mod track;
pub mod water;

pub use bonus::{BonusPlacement, BonusPlacementSettings, BonusSpotsGeneration, BonusSpotsSettings, BonusTypeSettings};
pub use border::{TrackBorderGeneration, TrackBorderSettings};
pub use heightmap::{HeightMapPerlin, HeightMapPerlinSettings, HeightMapRegionPerlin, RegionHeightMapSettings};
pub use noise::{OctaveSettings, OctavedPerlin};
pub use opponents::{OpponentsGeneration, OpponentsSettings};
pub use regions::{
    BorderDetectionSettings, BorderSmoothingGauss, GaussSmoothingSettings, GaussianKernelSize,
    RegionBorderDetection, RegionGeneratorVoronoi, VoronoiSettings,
};
pub use track::{
    AngleCorrectionSettings, MaximumAngleCorrection, RandomWalkSettings, TrackHeightSettings,
    TrackObjectsPlacement, TrackObjectsSettings, TrackPointsRandomWalk, TrackRegionGenerator,
    TrackRegionSettings, TrackTerrainHeight,
};
pub use water::{WaterPlacement, WaterSettings};

use crate::pipeline::{LevelRng, ModuleSlot};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settings of one module plus whether it takes part in generation.
///
/// The module's own keys sit next to `enabled` in the config table, and a
/// table without `enabled` turns the module on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig<T> {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: T,
}

fn enabled_by_default() -> bool {
    true
}

impl<T> ModuleConfig<T> {
    pub fn enabled(settings: T) -> Self {
        Self { enabled: true, settings }
    }

    pub fn disabled(settings: T) -> Self {
        Self { enabled: false, settings }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSettings {
    pub track_points: ModuleConfig<RandomWalkSettings>,
    pub track_regions: ModuleConfig<TrackRegionSettings>,
    pub region_voronoi: ModuleConfig<VoronoiSettings>,
    pub region_borders: ModuleConfig<BorderDetectionSettings>,
    /// Single-noise heights, superseded by `region_height_map` unless enabled
    pub height_map: ModuleConfig<HeightMapPerlinSettings>,
    pub region_height_map: ModuleConfig<RegionHeightMapSettings>,
    pub border_smoothing: ModuleConfig<GaussSmoothingSettings>,
    pub bonus_spots: ModuleConfig<BonusSpotsSettings>,
    pub track_height: ModuleConfig<TrackHeightSettings>,
    pub angle_correction: ModuleConfig<AngleCorrectionSettings>,
    pub track_objects: ModuleConfig<TrackObjectsSettings>,
    pub track_border: ModuleConfig<TrackBorderSettings>,
    pub bonus_placement: ModuleConfig<BonusPlacementSettings>,
    pub water: ModuleConfig<WaterSettings>,
    pub opponents: ModuleConfig<OpponentsSettings>,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            track_points: ModuleConfig::enabled(RandomWalkSettings::default()),
            track_regions: ModuleConfig::enabled(TrackRegionSettings::default()),
            region_voronoi: ModuleConfig::enabled(VoronoiSettings::default()),
            region_borders: ModuleConfig::enabled(BorderDetectionSettings::default()),
            height_map: ModuleConfig::disabled(HeightMapPerlinSettings::default()),
            region_height_map: ModuleConfig::enabled(RegionHeightMapSettings::default()),
            border_smoothing: ModuleConfig::enabled(GaussSmoothingSettings::default()),
            bonus_spots: ModuleConfig::enabled(BonusSpotsSettings::default()),
            track_height: ModuleConfig::enabled(TrackHeightSettings::default()),
            angle_correction: ModuleConfig::enabled(AngleCorrectionSettings::default()),
            track_objects: ModuleConfig::enabled(TrackObjectsSettings::default()),
            track_border: ModuleConfig::enabled(TrackBorderSettings::default()),
            bonus_placement: ModuleConfig::enabled(BonusPlacementSettings::default()),
            water: ModuleConfig::enabled(WaterSettings::default()),
            opponents: ModuleConfig::enabled(OpponentsSettings::default()),
        }
    }
}

/// Builds the full module list in generation order.
pub fn default_modules(settings: &ModuleSettings) -> Vec<ModuleSlot> {
    fn slot<T: Clone, M: crate::pipeline::LevelGeneratorModule + 'static>(
        config: &ModuleConfig<T>,
        build: impl FnOnce(T) -> M,
    ) -> ModuleSlot {
        ModuleSlot::new(Box::new(build(config.settings.clone())), config.enabled)
    }

    vec![
        slot(&settings.track_points, TrackPointsRandomWalk::new),
        slot(&settings.track_regions, TrackRegionGenerator::new),
        slot(&settings.region_voronoi, RegionGeneratorVoronoi::new),
        slot(&settings.region_borders, RegionBorderDetection::new),
        slot(&settings.height_map, HeightMapPerlin::new),
        slot(&settings.region_height_map, HeightMapRegionPerlin::new),
        slot(&settings.border_smoothing, BorderSmoothingGauss::new),
        slot(&settings.bonus_spots, BonusSpotsGeneration::new),
        slot(&settings.track_height, TrackTerrainHeight::new),
        slot(&settings.angle_correction, MaximumAngleCorrection::new),
        slot(&settings.track_objects, TrackObjectsPlacement::new),
        slot(&settings.track_border, TrackBorderGeneration::new),
        slot(&settings.bonus_placement, BonusPlacement::new),
        slot(&settings.water, WaterPlacement::new),
        slot(&settings.opponents, OpponentsGeneration::new),
    ]
}

/// Uniform float in `[a, b)`, bounds in either order. Returns the lower bound
/// for an empty interval instead of panicking.
pub(crate) fn random_range(rng: &mut LevelRng, a: f32, b: f32) -> f32 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    if high - low <= f32::EPSILON {
        low
    } else {
        rng.gen_range(low..high)
    }
}

/// Ids drawn from the level rng keep generated levels reproducible.
pub(crate) fn random_uuid(rng: &mut LevelRng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_default_module_order() {
        let slots = default_modules(&ModuleSettings::default());
        let names: Vec<&str> = slots.iter().map(|s| s.module.name()).collect();
        assert_eq!(
            names,
            [
                "TrackPointsRandomWalk",
                "TrackRegionGenerator",
                "RegionGeneratorVoronoi",
                "RegionBorderDetection",
                "HeightMapPerlin",
                "HeightMapRegionPerlin",
                "BorderSmoothingGauss",
                "BonusSpotsGeneration",
                "TrackTerrainHeight",
                "MaximumAngleCorrection",
                "TrackObjectsPlacement",
                "TrackBorderGeneration",
                "BonusPlacement",
                "WaterPlacement",
                "OpponentsGeneration",
            ]
        );
        let disabled: Vec<&str> = slots
            .iter()
            .filter(|s| !s.enabled)
            .map(|s| s.module.name())
            .collect();
        assert_eq!(disabled, ["HeightMapPerlin"]);
    }

    #[test]
    fn test_module_settings_from_toml() {
        let settings: ModuleSettings = toml::from_str(
            r#"
[height_map]
height_range = [0.0, 10.0]

[track_points]
hoops_between = 2

[bonus_placement]
enabled = false

[opponents]
count = 3
spacing = 4.0
"#,
        )
        .unwrap();
        assert!(settings.height_map.enabled);
        assert_eq!(settings.height_map.settings.height_range, [0.0, 10.0]);
        assert_eq!(settings.track_points.settings.hoops_between, 2);
        assert_eq!(settings.track_points.settings.checkpoint_count, 4);
        assert!(!settings.bonus_placement.enabled);
        assert!(settings.region_height_map.enabled);
        assert_eq!(settings.opponents.settings.count, 3);
        assert_eq!(settings.opponents.settings.skill_levels.len(), 5);
        assert!(settings.water.enabled);
    }

    #[test]
    fn test_random_range_handles_swapped_and_empty_bounds() {
        let mut rng = LevelRng::seed_from_u64(0);
        for _ in 0..100 {
            let value = random_range(&mut rng, 5.0, -5.0);
            assert!((-5.0..5.0).contains(&value));
        }
        assert_eq!(random_range(&mut rng, 3.0, 3.0), 3.0);
    }

    #[test]
    fn test_random_uuid_follows_seed() {
        let a = random_uuid(&mut LevelRng::seed_from_u64(11));
        let b = random_uuid(&mut LevelRng::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
