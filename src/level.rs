//! Everything a generated level consists of: terrain, track, bonuses and the
//! regions it passes through.
use crate::geometry::{Vec2, Vec3};
use crate::region::{LevelRegion, RegionCatalog, RegionKind, RegionTables};
use crate::terrain::{GridCoords, TerrainPoint, TerrainRepresentation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::info;
use uuid::Uuid;

/// A hoop or checkpoint spawned for a track point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnedHoop {
    pub id: Uuid,
    pub scale: f32,
    pub is_checkpoint: bool,
    /// Horizontal facing, from the previous towards the next track point
    pub direction: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Nearest terrain grid point
    pub grid_coords: GridCoords,
    pub position: Vec3,
    pub is_checkpoint: bool,
    /// Track region the point belongs to, `None` when it has none
    pub track_region: RegionKind,
    pub hoop: Option<SpawnedHoop>,
}

impl TrackPoint {
    pub fn new(position: Vec3, is_checkpoint: bool) -> Self {
        Self {
            grid_coords: GridCoords::default(),
            position,
            is_checkpoint,
            track_region: RegionKind::None,
            hoop: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusSpot {
    pub position: Vec3,
    pub grid_coords: GridCoords,
    /// Index of the track point right before the spot
    pub previous_hoop_index: usize,
    /// Position between the previous and the next track point, 0-1
    pub distance_fraction: f32,
    pub is_empty: bool,
    pub instances: Vec<BonusInstance>,
}

impl BonusSpot {
    pub fn new(position: Vec3, previous_hoop_index: usize, distance_fraction: f32) -> Self {
        Self {
            position,
            grid_coords: GridCoords::default(),
            previous_hoop_index,
            distance_fraction,
            is_empty: true,
            instances: Vec::new(),
        }
    }
}

/// One bonus object spawned in a row on a bonus spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusInstance {
    pub id: Uuid,
    /// Name of the bonus type, e.g. "speed"
    pub bonus: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinishLine {
    pub position: Vec3,
    /// Direction in which the finish line has to be crossed
    pub direction: Vec3,
}

/// How well an opponent races, from the best to the worst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Best,
    Good,
    #[default]
    Average,
    Bad,
    Worst,
}

/// An opponent waiting on the start line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Opponent {
    pub start_position: Vec3,
    pub skill_level: SkillLevel,
}

/// One straight piece of the wall keeping racers on the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderSegment {
    /// End points, `y` is the middle of the covered height range
    pub start: Vec3,
    pub end: Vec3,
    /// Extent of the covered height range
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterPlane {
    pub center: Vec3,
    /// Extent along X and Z
    pub size: Vec2,
}

/// The generated level. Modules of the generation pipeline write into it, the
/// rest of the game only reads it once generation has finished.
#[derive(Debug, Clone)]
pub struct LevelRepresentation {
    pub id: Uuid,
    pub terrain: TerrainRepresentation,
    pub track: Vec<TrackPoint>,
    pub bonuses: Vec<BonusSpot>,
    pub player_start_position: Vec3,
    pub finish: Option<FinishLine>,
    pub opponents: Vec<Opponent>,
    pub borders: Vec<BorderSegment>,
    pub water: Option<WaterPlane>,
    pub terrain_regions: HashMap<RegionKind, LevelRegion>,
    pub track_regions: HashMap<RegionKind, LevelRegion>,
    /// Terrain regions the region generators should use
    pub terrain_regions_to_include: Vec<RegionKind>,
    pub region_tables: RegionTables,
    pub regions_in_level: BTreeSet<RegionKind>,
}

impl LevelRepresentation {
    pub fn new(dimensions: Vec2, point_offset: f32, block_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            terrain: TerrainRepresentation::new(dimensions, point_offset, block_size),
            track: Vec::new(),
            bonuses: Vec::new(),
            player_start_position: Vec3::ZERO,
            finish: None,
            opponents: Vec::new(),
            borders: Vec::new(),
            water: None,
            terrain_regions: HashMap::new(),
            track_regions: HashMap::new(),
            terrain_regions_to_include: Vec::new(),
            region_tables: RegionTables::default(),
            regions_in_level: BTreeSet::new(),
        }
    }

    /// Prepares the level for a fresh generation run: new id, region catalog
    /// and tables, terrain reallocated with the requested parameters.
    pub fn initialize(
        &mut self,
        dimensions: Vec2,
        point_offset: f32,
        block_size: usize,
        catalog: &RegionCatalog,
        tables: RegionTables,
    ) {
        self.id = Uuid::new_v4();
        self.terrain_regions = catalog.terrain_map();
        self.track_regions = catalog.track_map();
        self.region_tables = tables;
        self.region_tables.fill_missing(catalog);
        self.terrain.update_parameters(dimensions, point_offset, block_size);
        self.clear_contents();
    }

    /// Resets terrain points in place and drops everything placed on them.
    pub fn reset_level(&mut self) {
        self.terrain.reset_points();
        self.clear_contents();
    }

    pub fn change_dimensions(&mut self, new_dimensions: Vec2) {
        let before = self.terrain.dimensions();
        self.terrain.change_dimensions(new_dimensions);
        let after = self.terrain.dimensions();
        info!(
            "Terrain resized from {}x{} to {}x{} ({}x{} points)",
            before.x,
            before.y,
            after.x,
            after.y,
            self.terrain.point_count().x,
            self.terrain.point_count().z
        );
    }

    pub fn nearest_grid_point(&self, position: Vec3) -> GridCoords {
        self.terrain.nearest_grid_point(position)
    }

    pub fn nearest_terrain_point(&self, position: Vec3) -> &TerrainPoint {
        self.terrain.nearest_point(position)
    }

    pub fn mark_region_in_level(&mut self, region: RegionKind) {
        if region != RegionKind::None {
            self.regions_in_level.insert(region);
        }
    }

    pub fn is_region_in_level(&self, region: RegionKind) -> bool {
        self.regions_in_level.contains(&region)
    }

    pub fn is_region_available(&self, region: RegionKind) -> bool {
        self.region_tables.is_available(region)
    }

    pub fn is_region_visited(&self, region: RegionKind) -> bool {
        self.region_tables.is_visited(region)
    }

    /// Terrain regions that are unlocked and present in the catalog.
    pub fn available_terrain_regions(&self) -> Vec<RegionKind> {
        let mut regions: Vec<RegionKind> = self
            .terrain_regions
            .keys()
            .copied()
            .filter(|r| self.is_region_available(*r))
            .collect();
        regions.sort();
        regions
    }

    pub fn checkpoint_count(&self) -> usize {
        self.track.iter().filter(|p| p.is_checkpoint).count()
    }

    pub fn summary(&self) -> LevelSummary {
        let region_name = |kind: &RegionKind| {
            self.terrain_regions
                .get(kind)
                .or_else(|| self.track_regions.get(kind))
                .map(|r| r.display_name.clone())
                .unwrap_or_else(|| format!("{:?}", kind))
        };
        LevelSummary {
            id: self.id,
            dimensions: self.terrain.dimensions(),
            point_offset: self.terrain.point_offset(),
            point_count: self.terrain.point_count(),
            block_count: self.terrain.block_count(),
            track_points: self.track.len(),
            checkpoints: self.checkpoint_count(),
            bonus_spots: self.bonuses.len(),
            player_start_position: self.player_start_position,
            finish: self.finish,
            opponents: self.opponents.clone(),
            border_segments: self.borders.len(),
            water: self.water,
            regions_in_level: self.regions_in_level.iter().map(region_name).collect(),
        }
    }

    fn clear_contents(&mut self) {
        self.track.clear();
        self.bonuses.clear();
        self.player_start_position = Vec3::ZERO;
        self.finish = None;
        self.opponents.clear();
        self.borders.clear();
        self.water = None;
        self.regions_in_level.clear();
    }
}

/// Serializable digest of a generated level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSummary {
    pub id: Uuid,
    pub dimensions: Vec2,
    pub point_offset: f32,
    pub point_count: GridCoords,
    pub block_count: GridCoords,
    pub track_points: usize,
    pub checkpoints: usize,
    pub bonus_spots: usize,
    pub player_start_position: Vec3,
    pub finish: Option<FinishLine>,
    pub opponents: Vec<Opponent>,
    pub border_segments: usize,
    pub water: Option<WaterPlane>,
    pub regions_in_level: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> LevelRepresentation {
        let mut level = LevelRepresentation::new(Vec2::new(10.0, 10.0), 1.0, 4);
        level.initialize(
            Vec2::new(10.0, 10.0),
            1.0,
            4,
            &RegionCatalog::builtin(),
            RegionTables::default(),
        );
        level
    }

    #[test]
    fn test_initialize_fills_region_tables() {
        let level = level();
        assert_eq!(level.terrain_regions.len(), 6);
        assert_eq!(level.track_regions.len(), 2);
        assert!(!level.is_region_available(RegionKind::AridDesert));
        assert!(level.region_tables.availability.contains_key(&RegionKind::AridDesert));
    }

    #[test]
    fn test_reset_level_clears_contents() {
        let mut level = level();
        level.terrain[(2, 2)].position.y = 5.0;
        level.track.push(TrackPoint::new(Vec3::new(1.0, 2.0, 3.0), true));
        level.bonuses.push(BonusSpot::new(Vec3::ZERO, 0, 0.5));
        level.mark_region_in_level(RegionKind::AboveWater);
        level.opponents.push(Opponent {
            start_position: Vec3::ZERO,
            skill_level: SkillLevel::Best,
        });
        level.water = Some(WaterPlane {
            center: Vec3::ZERO,
            size: Vec2::new(10.0, 10.0),
        });

        level.reset_level();

        assert_eq!(level.terrain[(2, 2)].position.y, 0.0);
        assert!(level.track.is_empty());
        assert!(level.bonuses.is_empty());
        assert!(level.regions_in_level.is_empty());
        assert!(level.opponents.is_empty());
        assert!(level.water.is_none());
    }

    #[test]
    fn test_region_none_is_never_in_level() {
        let mut level = level();
        level.mark_region_in_level(RegionKind::None);
        assert!(level.regions_in_level.is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let mut level = level();
        level.track.push(TrackPoint::new(Vec3::ZERO, true));
        level.track.push(TrackPoint::new(Vec3::FORWARD, false));
        level.mark_region_in_level(RegionKind::AboveWater);

        let summary = level.summary();
        assert_eq!(summary.track_points, 2);
        assert_eq!(summary.checkpoints, 1);
        assert_eq!(summary.point_count, GridCoords::new(11, 11));
        assert_eq!(summary.regions_in_level, vec!["Above Water".to_string()]);
    }

    #[test]
    fn test_nearest_terrain_point() {
        let level = level();
        let point = level.nearest_terrain_point(Vec3::new(0.4, 10.0, -4.6));
        assert_eq!(point.position, Vec3::new(0.0, 0.0, -5.0));
    }
}
