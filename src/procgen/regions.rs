//! Terrain region assignment and the region border post-processing.
use crate::error::{LevelGenError, Result};
use crate::level::LevelRepresentation;
use crate::pipeline::{LevelGeneratorModule, LevelRng};
use crate::region::RegionKind;
use crate::terrain::GridCoords;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoronoiSettings {
    /// Side of the square tiles the map is divided into, in world units.
    /// Each tile hosts one region centre.
    pub region_size: f32,
}

impl Default for VoronoiSettings {
    fn default() -> Self {
        Self { region_size: 150.0 }
    }
}

/// Splits the terrain into regions with a Voronoi diagram over jittered
/// centres, one centre per tile of a coarse grid.
pub struct RegionGeneratorVoronoi {
    settings: VoronoiSettings,
}

impl RegionGeneratorVoronoi {
    pub fn new(settings: VoronoiSettings) -> Self {
        Self { settings }
    }

    /// Regions picked for the level which are also unlocked, or any unlocked
    /// terrain region when none of the picked ones qualifies.
    fn allowed_regions(level: &LevelRepresentation) -> Vec<RegionKind> {
        let allowed: Vec<RegionKind> = level
            .terrain_regions_to_include
            .iter()
            .copied()
            .filter(|r| level.terrain_regions.contains_key(r) && level.is_region_available(*r))
            .collect();
        if allowed.is_empty() {
            level.available_terrain_regions()
        } else {
            allowed
        }
    }
}

impl LevelGeneratorModule for RegionGeneratorVoronoi {
    fn name(&self) -> &'static str {
        "RegionGeneratorVoronoi"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) -> Result<()> {
        let allowed = Self::allowed_regions(level);
        if allowed.is_empty() {
            return Err(LevelGenError::Module {
                module: self.name(),
                reason: "no available terrain region".to_string(),
            });
        }

        let dimensions = level.terrain.dimensions();
        let points = level.terrain.point_count();
        let tiles = GridCoords::new(
            ((dimensions.x / self.settings.region_size).floor() as usize).max(1),
            ((dimensions.y / self.settings.region_size).floor() as usize).max(1),
        );
        let tile_size = GridCoords::new(points.x.div_ceil(tiles.x), points.z.div_ceil(tiles.z));

        // One random centre per tile, edge tiles may be smaller or empty
        let mut centres: Vec<Option<(GridCoords, RegionKind)>> = Vec::with_capacity(tiles.x * tiles.z);
        for tile_x in 0..tiles.x {
            for tile_z in 0..tiles.z {
                let start = GridCoords::new(tile_x * tile_size.x, tile_z * tile_size.z);
                if start.x >= points.x || start.z >= points.z {
                    centres.push(None);
                    continue;
                }
                let size = GridCoords::new(
                    tile_size.x.min(points.x - start.x),
                    tile_size.z.min(points.z - start.z),
                );
                let centre = GridCoords::new(
                    start.x + rng.gen_range(0..size.x),
                    start.z + rng.gen_range(0..size.z),
                );
                let region = allowed[rng.gen_range(0..allowed.len())];
                level.terrain[(centre.x, centre.z)].region = region;
                level.mark_region_in_level(region);
                centres.push(Some((centre, region)));
            }
        }
        debug!(
            "Placed {} region centres in {}x{} tiles",
            centres.iter().flatten().count(),
            tiles.x,
            tiles.z
        );

        for x in 0..points.x {
            for z in 0..points.z {
                if level.terrain[(x, z)].region != RegionKind::None {
                    continue;
                }
                let tile_x = x / tile_size.x;
                let tile_z = z / tile_size.z;
                let mut closest = allowed[0];
                let mut min_distance = f32::MAX;
                for other_x in tile_x.saturating_sub(1)..=(tile_x + 1).min(tiles.x - 1) {
                    for other_z in tile_z.saturating_sub(1)..=(tile_z + 1).min(tiles.z - 1) {
                        if let Some((centre, region)) = centres[other_x * tiles.z + other_z] {
                            let dx = x as f32 - centre.x as f32;
                            let dz = z as f32 - centre.z as f32;
                            let distance = (dx * dx + dz * dz).sqrt();
                            if distance < min_distance {
                                min_distance = distance;
                                closest = region;
                            }
                        }
                    }
                }
                level.terrain[(x, z)].region = closest;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBorderTolerance {
    pub region: RegionKind,
    pub tolerance: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderDetectionSettings {
    /// Points this many grid steps (or fewer) from another region, in any of
    /// the 8 directions, lie on a border
    pub default_tolerance: usize,
    pub overrides: Vec<RegionBorderTolerance>,
}

impl Default for BorderDetectionSettings {
    fn default() -> Self {
        Self {
            default_tolerance: 5,
            overrides: Vec::new(),
        }
    }
}

/// Flags terrain points close to a point of a different region.
pub struct RegionBorderDetection {
    settings: BorderDetectionSettings,
}

impl RegionBorderDetection {
    pub fn new(settings: BorderDetectionSettings) -> Self {
        Self { settings }
    }

    fn tolerance(&self, overrides: &HashMap<RegionKind, usize>, region: RegionKind) -> usize {
        overrides
            .get(&region)
            .copied()
            .unwrap_or(self.settings.default_tolerance)
    }
}

impl LevelGeneratorModule for RegionBorderDetection {
    fn name(&self) -> &'static str {
        "RegionBorderDetection"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, _rng: &mut LevelRng) -> Result<()> {
        let overrides: HashMap<RegionKind, usize> = self
            .settings
            .overrides
            .iter()
            .map(|o| (o.region, o.tolerance))
            .collect();
        let count = level.terrain.point_count();

        for x in 0..count.x {
            for z in 0..count.z {
                let region = level.terrain[(x, z)].region;
                let tolerance = self.tolerance(&overrides, region);
                let on_border = (1..=tolerance).any(|step| {
                    DIRECTIONS.iter().any(|(dx, dz)| {
                        let other_x = x as isize + dx * step as isize;
                        let other_z = z as isize + dz * step as isize;
                        other_x >= 0
                            && other_z >= 0
                            && level
                                .terrain
                                .get(other_x as usize, other_z as usize)
                                .is_some_and(|p| p.region != region)
                    })
                });
                level.terrain[(x, z)].is_on_border = on_border;
            }
        }
        Ok(())
    }
}

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaussianKernelSize {
    Kernel3x3,
    #[default]
    Kernel5x5,
    Kernel7x7,
}

impl GaussianKernelSize {
    /// Row-major weights and the kernel side length.
    fn weights(self) -> (Vec<f32>, usize) {
        let (raw, norm, side): (&[f32], f32, usize) = match self {
            GaussianKernelSize::Kernel3x3 => (&KERNEL_3, 16.0, 3),
            GaussianKernelSize::Kernel5x5 => (&KERNEL_5, 273.0, 5),
            GaussianKernelSize::Kernel7x7 => (&KERNEL_7, 1003.0, 7),
        };
        (raw.iter().map(|w| w / norm).collect(), side)
    }
}

#[rustfmt::skip]
const KERNEL_3: [f32; 9] = [
    1.0, 2.0, 1.0,
    2.0, 4.0, 2.0,
    1.0, 2.0, 1.0,
];

#[rustfmt::skip]
const KERNEL_5: [f32; 25] = [
    1.0,  4.0,  7.0,  4.0, 1.0,
    4.0, 16.0, 26.0, 16.0, 4.0,
    7.0, 26.0, 41.0, 26.0, 7.0,
    4.0, 16.0, 26.0, 16.0, 4.0,
    1.0,  4.0,  7.0,  4.0, 1.0,
];

#[rustfmt::skip]
const KERNEL_7: [f32; 49] = [
    0.0,  0.0,  1.0,   2.0,  1.0,  0.0, 0.0,
    0.0,  3.0, 13.0,  22.0, 13.0,  3.0, 0.0,
    1.0, 13.0, 59.0,  97.0, 59.0, 13.0, 1.0,
    2.0, 22.0, 97.0, 159.0, 97.0, 22.0, 2.0,
    1.0, 13.0, 59.0,  97.0, 59.0, 13.0, 1.0,
    0.0,  3.0, 13.0,  22.0, 13.0,  3.0, 0.0,
    0.0,  0.0,  1.0,   2.0,  1.0,  0.0, 0.0,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussSmoothingSettings {
    /// Blur only points flagged as region border
    pub borders_only: bool,
    pub iterations: u32,
    pub kernel_size: GaussianKernelSize,
}

impl Default for GaussSmoothingSettings {
    fn default() -> Self {
        Self {
            borders_only: true,
            iterations: 1,
            kernel_size: GaussianKernelSize::Kernel5x5,
        }
    }
}

/// Gaussian blur of terrain heights, softening the steps between regions.
///
/// Weights falling outside the grid are dropped without renormalizing, so
/// points at the terrain edge are pulled slightly down.
pub struct BorderSmoothingGauss {
    settings: GaussSmoothingSettings,
}

impl BorderSmoothingGauss {
    pub fn new(settings: GaussSmoothingSettings) -> Self {
        Self { settings }
    }
}

impl LevelGeneratorModule for BorderSmoothingGauss {
    fn name(&self) -> &'static str {
        "BorderSmoothingGauss"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, _rng: &mut LevelRng) -> Result<()> {
        let (kernel, side) = self.settings.kernel_size.weights();
        let half = (side / 2) as isize;
        let count = level.terrain.point_count();
        let mut new_heights: Vec<Option<f32>> = vec![None; count.x * count.z];

        for _ in 0..self.settings.iterations {
            for x in 0..count.x {
                for z in 0..count.z {
                    if self.settings.borders_only && !level.terrain[(x, z)].is_on_border {
                        continue;
                    }
                    let mut height = 0.0;
                    for i in -half..=half {
                        for j in -half..=half {
                            let (other_x, other_z) = (x as isize + i, z as isize + j);
                            if other_x < 0 || other_z < 0 {
                                continue;
                            }
                            if let Some(point) = level.terrain.get(other_x as usize, other_z as usize) {
                                let weight = kernel[((i + half) as usize) * side + (j + half) as usize];
                                height += point.position.y * weight;
                            }
                        }
                    }
                    new_heights[x * count.z + z] = Some(height);
                }
            }
            for x in 0..count.x {
                for z in 0..count.z {
                    if let Some(height) = new_heights[x * count.z + z].take() {
                        level.terrain[(x, z)].position.y = height;
                    }
                }
            }
        }
        Ok(())
    }
}
