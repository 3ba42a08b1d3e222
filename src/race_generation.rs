//! Maps player progression onto level generation parameters and picks the
//! terrain regions a level is built from.
use crate::error::Result;
use crate::geometry::{lerp, Vec2};
use crate::level::LevelRepresentation;
use crate::pipeline::LevelGenerationPipeline;
use crate::region::{RegionCatalog, RegionKind, RegionTables, RegionUnlocks};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// The five player stats, each in 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub endurance: u8,
    pub speed: u8,
    pub dexterity: u8,
    pub precision: u8,
    pub magic: u8,
}

impl PlayerStats {
    pub fn new(endurance: u8, speed: u8, dexterity: u8, precision: u8, magic: u8) -> Self {
        Self {
            endurance,
            speed,
            dexterity,
            precision,
            magic,
        }
    }
}

/// Everything about the player the generator depends on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerProgress {
    pub stats: PlayerStats,
    /// Highest altitude the player's broom can reach
    pub max_altitude: f32,
    pub tutorial_stage: u32,
    pub regions_availability: HashMap<RegionKind, bool>,
    pub regions_visited: HashMap<RegionKind, bool>,
}

/// Parameters derived from player stats, handed to the generator modules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaceParameters {
    pub checkpoint_count: usize,
    /// Maximum direction change between consecutive hoops in degrees,
    /// `x` vertical (up/down), `y` horizontal (left/right)
    pub max_direction_change: Vec2,
    pub hoop_scale: f32,
    /// Minimum and maximum distance between consecutive hoops
    pub hoop_distance_range: Vec2,
    pub max_altitude: f32,
    /// Opponents lined up next to the player
    pub opponents_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSelection {
    /// At most one new region per level, the rest from visited ones
    #[default]
    Progression,
    /// Any available regions
    QuickRace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    /// Checkpoints at endurance 0 and 100
    pub initial_checkpoints: u32,
    pub final_checkpoints: u32,
    /// Maximum direction change at dexterity 0 and 100
    pub initial_direction_change: [f32; 2],
    pub final_direction_change: [f32; 2],
    /// Hoop scale at precision 0 and 100
    pub initial_hoop_scale: f32,
    pub final_hoop_scale: f32,
    /// Hoop distance range at speed 0 and 100
    pub initial_hoop_distance: [f32; 2],
    pub final_hoop_distance: [f32; 2],
    /// Upper bound on distinct terrain regions in a level, default regions included
    pub region_count_in_level: usize,
    pub selection: RegionSelection,
    pub unlocks: RegionUnlocks,
    pub opponents_count: usize,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            initial_checkpoints: 4,
            final_checkpoints: 10,
            initial_direction_change: [5.0, 20.0],
            final_direction_change: [20.0, 45.0],
            initial_hoop_scale: 1.0,
            final_hoop_scale: 0.4,
            initial_hoop_distance: [40.0, 50.0],
            final_hoop_distance: [80.0, 100.0],
            region_count_in_level: 3,
            selection: RegionSelection::Progression,
            unlocks: RegionUnlocks::default(),
            opponents_count: 5,
        }
    }
}

pub struct RaceGeneration {
    settings: RaceSettings,
}

impl RaceGeneration {
    pub fn new(settings: RaceSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RaceSettings {
        &self.settings
    }

    pub fn compute_parameters(&self, stats: &PlayerStats, max_altitude: f32) -> RaceParameters {
        let t = |stat: u8| stat.min(100) as f32 / 100.0;
        let s = &self.settings;
        let pair = |v: [f32; 2]| Vec2::new(v[0], v[1]);

        RaceParameters {
            checkpoint_count: lerp(
                s.initial_checkpoints as f32,
                s.final_checkpoints as f32,
                t(stats.endurance),
            )
            .round() as usize,
            max_direction_change: pair(s.initial_direction_change)
                .lerp(pair(s.final_direction_change), t(stats.dexterity)),
            hoop_scale: lerp(s.initial_hoop_scale, s.final_hoop_scale, t(stats.precision)),
            hoop_distance_range: pair(s.initial_hoop_distance)
                .lerp(pair(s.final_hoop_distance), t(stats.speed)),
            max_altitude,
            opponents_count: s.opponents_count,
        }
    }

    /// Availability of every region after applying the unlock rules to the
    /// player's current table.
    pub fn update_availability(&self, progress: &PlayerProgress) -> HashMap<RegionKind, bool> {
        self.settings.unlocks.availability(
            &progress.regions_availability,
            progress.tutorial_stage,
            progress.stats.endurance,
            progress.max_altitude,
        )
    }

    pub fn choose_terrain_regions<R: Rng + ?Sized>(
        &self,
        catalog: &RegionCatalog,
        tables: &RegionTables,
        rng: &mut R,
    ) -> Vec<RegionKind> {
        match self.settings.selection {
            RegionSelection::Progression => self.choose_progression_regions(catalog, tables, rng),
            RegionSelection::QuickRace => self.choose_quick_race_regions(catalog, tables, rng),
        }
    }

    fn choose_progression_regions<R: Rng + ?Sized>(
        &self,
        catalog: &RegionCatalog,
        tables: &RegionTables,
        rng: &mut R,
    ) -> Vec<RegionKind> {
        let defaults = &self.settings.unlocks.default_regions;
        let mut chosen = Vec::new();
        let mut unvisited = Vec::new();
        let mut visited = Vec::new();

        for region in &catalog.terrain {
            if !tables.is_available(region.kind) {
                continue;
            }
            if defaults.contains(&region.kind) {
                chosen.push(region.kind);
            } else if tables.is_visited(region.kind) {
                visited.push(region.kind);
            } else {
                unvisited.push(region.kind);
            }
        }

        // At most one new region per level, and none if a new track region
        // may appear instead
        let new_track_region = catalog
            .track
            .iter()
            .any(|r| tables.is_available(r.kind) && !tables.is_visited(r.kind));
        if !new_track_region
            && !unvisited.is_empty()
            && chosen.len() < self.settings.region_count_in_level
        {
            chosen.push(unvisited[rng.gen_range(0..unvisited.len())]);
        }

        while chosen.len() < self.settings.region_count_in_level && !visited.is_empty() {
            let idx = rng.gen_range(0..visited.len());
            chosen.push(visited.remove(idx));
        }
        chosen
    }

    fn choose_quick_race_regions<R: Rng + ?Sized>(
        &self,
        catalog: &RegionCatalog,
        tables: &RegionTables,
        rng: &mut R,
    ) -> Vec<RegionKind> {
        let mut available: Vec<RegionKind> = catalog
            .terrain
            .iter()
            .map(|r| r.kind)
            .filter(|kind| tables.is_available(*kind))
            .collect();
        let mut chosen = Vec::new();
        while chosen.len() < self.settings.region_count_in_level && !available.is_empty() {
            let idx = rng.gen_range(0..available.len());
            chosen.push(available.remove(idx));
        }
        chosen
    }

    /// Writes parameters, region tables and chosen regions into the pipeline.
    pub fn configure_pipeline<R: Rng + ?Sized>(
        &self,
        pipeline: &mut LevelGenerationPipeline,
        progress: &PlayerProgress,
        rng: &mut R,
    ) -> RaceParameters {
        let params = self.compute_parameters(&progress.stats, progress.max_altitude);
        let tables = RegionTables::new(
            self.update_availability(progress),
            progress.regions_visited.clone(),
        );
        let regions = self.choose_terrain_regions(pipeline.catalog(), &tables, rng);
        info!(
            "Race parameters: {} checkpoints, hoop scale {:.2}, regions {:?}",
            params.checkpoint_count, params.hoop_scale, regions
        );

        pipeline.set_region_tables(tables);
        pipeline.set_terrain_regions_to_include(regions);
        pipeline.apply_race_parameters(&params);
        params
    }

    pub fn generate_level<'p, R: Rng + ?Sized>(
        &self,
        pipeline: &'p mut LevelGenerationPipeline,
        progress: &PlayerProgress,
        rng: &mut R,
    ) -> Result<&'p LevelRepresentation> {
        self.configure_pipeline(pipeline, progress, rng);
        pipeline.generate()
    }
}

impl Default for RaceGeneration {
    fn default() -> Self {
        Self::new(RaceSettings::default())
    }
}
