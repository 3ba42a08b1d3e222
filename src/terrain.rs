//! Terrain of a level as a regular grid of points, partitioned into square
//! blocks for block-local work such as mesh synthesis.
//!
//! All points live in one flat buffer laid out block by block, so a block is a
//! contiguous slice and any grid coordinate resolves to its storage index with
//! a few divisions:
//!
//! * blocks are ordered by block X, then block Z
//! * every block in block column `bx` is `min(block_size, count_x - bx * block_size)` points wide
//! * points inside a block are stored X-major (`local_x * block_height + local_z`)
use crate::error::{LevelGenError, Result};
use crate::geometry::{Color, Vec2, Vec3};
use crate::region::RegionKind;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Integer grid coordinates, or a point/block count along X and Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridCoords {
    pub x: usize,
    pub z: usize,
}

impl GridCoords {
    pub const fn new(x: usize, z: usize) -> Self {
        Self { x, z }
    }
}

/// A single sample of the terrain grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainPoint {
    /// World position; generators only move it along Y
    pub position: Vec3,
    /// Terrain color assigned from the region this point belongs to
    pub color: Color,
    /// Terrain region this point belongs to
    pub region: RegionKind,
    /// Whether the point lies on a border between adjacent regions
    pub is_on_border: bool,
    orig_position: Vec3,
}

impl TerrainPoint {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            color: Color::BLACK,
            region: RegionKind::None,
            is_on_border: false,
            orig_position: position,
        }
    }

    /// Reverts every field to its initial value and the lattice position.
    pub fn reset(&mut self) {
        self.position = self.orig_position;
        self.color = Color::BLACK;
        self.region = RegionKind::None;
        self.is_on_border = false;
    }

    pub fn original_position(&self) -> Vec3 {
        self.orig_position
    }

    fn copy_mutable_fields(&mut self, other: &TerrainPoint) {
        self.position.y = other.position.y;
        self.region = other.region;
        self.is_on_border = other.is_on_border;
        self.color = other.color;
    }
}

/// Read-only view of one terrain block.
#[derive(Debug, Clone, Copy)]
pub struct TerrainBlockView<'a> {
    pub block_x: usize,
    pub block_z: usize,
    /// Grid coordinates of the block's first point
    pub origin: GridCoords,
    /// Number of points in the block along X and Z
    pub size: GridCoords,
    points: &'a [TerrainPoint],
}

impl<'a> TerrainBlockView<'a> {
    pub fn at(&self, local_x: usize, local_z: usize) -> &'a TerrainPoint {
        assert!(
            local_x < self.size.x && local_z < self.size.z,
            "local point ({}, {}) outside block of size {}x{}",
            local_x,
            local_z,
            self.size.x,
            self.size.z
        );
        &self.points[local_x * self.size.z + local_z]
    }

    pub fn points(&self) -> &'a [TerrainPoint] {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates over the block's points with their global grid coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoords, &'a TerrainPoint)> + 'a {
        let origin = self.origin;
        let height = self.size.z;
        self.points.iter().enumerate().map(move |(idx, point)| {
            (
                GridCoords::new(origin.x + idx / height, origin.z + idx % height),
                point,
            )
        })
    }
}

/// The terrain grid of a level.
#[derive(Debug, Clone)]
pub struct TerrainRepresentation {
    dimensions: Vec2,
    point_offset: f32,
    point_count: GridCoords,
    start_position: Vec2,
    block_size: usize,
    block_count: GridCoords,
    points: Vec<TerrainPoint>,
}

impl TerrainRepresentation {
    /// Creates a flat terrain. Final dimensions are the closest multiple of
    /// `point_offset` not smaller than `dimensions`.
    pub fn new(dimensions: Vec2, point_offset: f32, block_size: usize) -> Self {
        let mut terrain = Self {
            dimensions,
            point_offset,
            point_count: GridCoords::default(),
            start_position: Vec2::default(),
            block_size,
            block_count: GridCoords::default(),
            points: Vec::new(),
        };
        terrain.update_parameters(dimensions, point_offset, block_size);
        terrain
    }

    /// Rebuilds the grid from scratch with new parameters.
    pub fn update_parameters(&mut self, dimensions: Vec2, point_offset: f32, block_size: usize) {
        assert!(point_offset > 0.0, "point offset must be positive");
        assert!(block_size > 0, "block size must be positive");
        self.point_offset = point_offset;
        self.block_size = block_size;
        self.compute_dependent_parameters(dimensions);
        self.reset_terrain();
    }

    /// Changes dimensions while keeping the points with the lowest indices.
    /// Height, region, border flag and color are copied over the overlapping
    /// index range, the rest of the grid starts flat.
    pub fn change_dimensions(&mut self, new_dimensions: Vec2) {
        let old_count = self.point_count;
        let old_points = std::mem::take(&mut self.points);
        self.compute_dependent_parameters(new_dimensions);
        self.reset_terrain();

        let overlap_x = old_count.x.min(self.point_count.x);
        let overlap_z = old_count.z.min(self.point_count.z);
        for x in 0..overlap_x {
            for z in 0..overlap_z {
                let old = &old_points[storage_index(x, z, old_count, self.block_size)];
                let idx = self.storage_index(x, z);
                self.points[idx].copy_mutable_fields(old);
            }
        }
    }

    /// Reallocates every block with fresh, flat points at lattice positions.
    pub fn reset_terrain(&mut self) {
        let mut points = Vec::with_capacity(self.point_count.x * self.point_count.z);
        for block_x in 0..self.block_count.x {
            for block_z in 0..self.block_count.z {
                let origin = GridCoords::new(block_x * self.block_size, block_z * self.block_size);
                let size = self.block_extent(block_x, block_z);
                for local_x in 0..size.x {
                    for local_z in 0..size.z {
                        points.push(TerrainPoint::new(
                            self.lattice_position(origin.x + local_x, origin.z + local_z),
                        ));
                    }
                }
            }
        }
        self.points = points;
    }

    /// Resets all points in place without reallocating.
    pub fn reset_points(&mut self) {
        for point in &mut self.points {
            point.reset();
        }
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&TerrainPoint> {
        self.contains(i, j).then(|| &self.points[self.storage_index(i, j)])
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> Option<&mut TerrainPoint> {
        if self.contains(i, j) {
            let idx = self.storage_index(i, j);
            Some(&mut self.points[idx])
        } else {
            None
        }
    }

    /// Checked access reporting the grid size on failure.
    pub fn try_point(&self, i: usize, j: usize) -> Result<&TerrainPoint> {
        self.get(i, j).ok_or(LevelGenError::GridOutOfBounds {
            i,
            j,
            count_x: self.point_count.x,
            count_z: self.point_count.z,
        })
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        i < self.point_count.x && j < self.point_count.z
    }

    pub fn block(&self, block_x: usize, block_z: usize) -> Option<TerrainBlockView<'_>> {
        if block_x >= self.block_count.x || block_z >= self.block_count.z {
            return None;
        }
        let size = self.block_extent(block_x, block_z);
        let start = self.block_offset(block_x, block_z);
        Some(TerrainBlockView {
            block_x,
            block_z,
            origin: GridCoords::new(block_x * self.block_size, block_z * self.block_size),
            size,
            points: &self.points[start..start + size.x * size.z],
        })
    }

    /// Enumerates all blocks, block X first.
    pub fn blocks(&self) -> impl Iterator<Item = TerrainBlockView<'_>> + '_ {
        let count = self.block_count;
        (0..count.x)
            .flat_map(move |x| (0..count.z).map(move |z| (x, z)))
            .filter_map(move |(x, z)| self.block(x, z))
    }

    /// Closest grid point to a world position, clamped to the grid.
    pub fn nearest_grid_point(&self, position: Vec3) -> GridCoords {
        let to_index = |value: f32, start: f32, count: usize| -> usize {
            let idx = ((value - start) / self.point_offset).round();
            if idx <= 0.0 {
                0
            } else {
                (idx as usize).min(count - 1)
            }
        };
        GridCoords::new(
            to_index(position.x, self.start_position.x, self.point_count.x),
            to_index(position.z, self.start_position.y, self.point_count.z),
        )
    }

    pub fn nearest_point(&self, position: Vec3) -> &TerrainPoint {
        let coords = self.nearest_grid_point(position);
        &self[(coords.x, coords.z)]
    }

    /// Effective dimensions, `(point_count - 1) * point_offset`.
    pub fn dimensions(&self) -> Vec2 {
        self.dimensions
    }

    pub fn point_offset(&self) -> f32 {
        self.point_offset
    }

    pub fn point_count(&self) -> GridCoords {
        self.point_count
    }

    /// World XZ position of the point (0, 0).
    pub fn start_position(&self) -> Vec2 {
        self.start_position
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_count(&self) -> GridCoords {
        self.block_count
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn compute_dependent_parameters(&mut self, dimensions: Vec2) {
        let count = |dim: f32| (dim.max(0.0) / self.point_offset).ceil() as usize + 1;
        self.point_count = GridCoords::new(count(dimensions.x), count(dimensions.y));
        // Centre is at the origin
        self.start_position = Vec2::new(
            -((self.point_count.x - 1) as f32) * self.point_offset / 2.0,
            -((self.point_count.z - 1) as f32) * self.point_offset / 2.0,
        );
        self.block_count = GridCoords::new(
            self.point_count.x.div_ceil(self.block_size),
            self.point_count.z.div_ceil(self.block_size),
        );
        self.dimensions = Vec2::new(
            (self.point_count.x - 1) as f32 * self.point_offset,
            (self.point_count.z - 1) as f32 * self.point_offset,
        );
    }

    fn lattice_position(&self, i: usize, j: usize) -> Vec3 {
        Vec3::new(
            self.start_position.x + i as f32 * self.point_offset,
            0.0,
            self.start_position.y + j as f32 * self.point_offset,
        )
    }

    fn block_extent(&self, block_x: usize, block_z: usize) -> GridCoords {
        block_extent(block_x, block_z, self.point_count, self.block_size)
    }

    fn block_offset(&self, block_x: usize, block_z: usize) -> usize {
        block_offset(block_x, block_z, self.point_count, self.block_size)
    }

    fn storage_index(&self, i: usize, j: usize) -> usize {
        storage_index(i, j, self.point_count, self.block_size)
    }
}

impl Index<(usize, usize)> for TerrainRepresentation {
    type Output = TerrainPoint;

    fn index(&self, (i, j): (usize, usize)) -> &TerrainPoint {
        assert!(
            self.contains(i, j),
            "terrain point ({}, {}) outside the {}x{} grid",
            i,
            j,
            self.point_count.x,
            self.point_count.z
        );
        &self.points[self.storage_index(i, j)]
    }
}

impl IndexMut<(usize, usize)> for TerrainRepresentation {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut TerrainPoint {
        assert!(
            self.contains(i, j),
            "terrain point ({}, {}) outside the {}x{} grid",
            i,
            j,
            self.point_count.x,
            self.point_count.z
        );
        let idx = self.storage_index(i, j);
        &mut self.points[idx]
    }
}

fn block_extent(block_x: usize, block_z: usize, count: GridCoords, block_size: usize) -> GridCoords {
    GridCoords::new(
        block_size.min(count.x - block_x * block_size),
        block_size.min(count.z - block_z * block_size),
    )
}

fn block_offset(block_x: usize, block_z: usize, count: GridCoords, block_size: usize) -> usize {
    let width = block_size.min(count.x - block_x * block_size);
    block_x * block_size * count.z + width * block_z * block_size
}

fn storage_index(i: usize, j: usize, count: GridCoords, block_size: usize) -> usize {
    let (block_x, block_z) = (i / block_size, j / block_size);
    let extent = block_extent(block_x, block_z, count, block_size);
    block_offset(block_x, block_z, count, block_size)
        + (i % block_size) * extent.z
        + (j % block_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_terrain_layout() {
        let terrain = TerrainRepresentation::new(Vec2::new(50.0, 50.0), 0.5, 25);

        assert_eq!(terrain.point_count(), GridCoords::new(101, 101));
        assert_eq!(terrain.block_count(), GridCoords::new(5, 5));
        assert_eq!(terrain.dimensions(), Vec2::new(50.0, 50.0));
        assert_eq!(terrain.len(), 101 * 101);

        let corner = terrain.block(4, 4).unwrap();
        assert_eq!(corner.size, GridCoords::new(1, 1));
        let edge = terrain.block(4, 2).unwrap();
        assert_eq!(edge.size, GridCoords::new(1, 25));
        let inner = terrain.block(1, 3).unwrap();
        assert_eq!(inner.size, GridCoords::new(25, 25));
        assert!(terrain.block(5, 0).is_none());
    }

    #[test]
    fn test_dimensions_round_up_to_spacing() {
        let terrain = TerrainRepresentation::new(Vec2::new(10.2, 3.0), 1.0, 4);
        assert_eq!(terrain.point_count(), GridCoords::new(12, 4));
        assert_eq!(terrain.dimensions(), Vec2::new(11.0, 3.0));
        assert_eq!(terrain.block_count(), GridCoords::new(3, 1));
    }

    #[test]
    fn test_lattice_is_centered() {
        let terrain = TerrainRepresentation::new(Vec2::new(50.0, 50.0), 0.5, 25);
        assert_eq!(terrain[(0, 0)].position, Vec3::new(-25.0, 0.0, -25.0));
        assert_eq!(terrain[(100, 100)].position, Vec3::new(25.0, 0.0, 25.0));
        assert_eq!(terrain[(50, 26)].position, Vec3::new(0.0, 0.0, -12.0));
    }

    #[test]
    fn test_storage_is_a_bijection() {
        let terrain = TerrainRepresentation::new(Vec2::new(13.0, 7.0), 1.0, 5);
        let count = terrain.point_count();
        let mut seen = vec![false; terrain.len()];
        for i in 0..count.x {
            for j in 0..count.z {
                let idx = terrain.storage_index(i, j);
                assert!(!seen[idx], "index {} used twice", idx);
                seen[idx] = true;
            }
        }
        assert!(seen.into_iter().all(|used| used));
    }

    #[test]
    fn test_block_view_matches_grid_access() {
        let mut terrain = TerrainRepresentation::new(Vec2::new(12.0, 12.0), 1.0, 5);
        terrain[(7, 11)].position.y = 3.5;
        terrain[(7, 11)].region = RegionKind::AridDesert;

        let block = terrain.block(1, 2).unwrap();
        assert_eq!(block.origin, GridCoords::new(5, 10));
        assert_eq!(block.size, GridCoords::new(5, 3));
        assert_eq!(block.at(2, 1).position.y, 3.5);
        assert_eq!(block.at(2, 1).region, RegionKind::AridDesert);

        let (coords, point) = block
            .iter()
            .find(|(_, p)| p.region == RegionKind::AridDesert)
            .unwrap();
        assert_eq!(coords, GridCoords::new(7, 11));
        assert_eq!(point.position.y, 3.5);
    }

    #[test]
    fn test_blocks_cover_every_point_once() {
        let terrain = TerrainRepresentation::new(Vec2::new(50.0, 50.0), 0.5, 25);
        let total: usize = terrain.blocks().map(|b| b.points().len()).sum();
        assert_eq!(total, terrain.len());
        assert_eq!(terrain.blocks().count(), 25);
    }

    #[test]
    fn test_change_dimensions_preserves_overlap() {
        let mut terrain = TerrainRepresentation::new(Vec2::new(10.0, 10.0), 1.0, 4);
        terrain[(3, 9)].position.y = 7.0;
        terrain[(3, 9)].is_on_border = true;
        terrain[(10, 10)].region = RegionKind::StormyArea;

        terrain.change_dimensions(Vec2::new(20.0, 6.0));
        assert_eq!(terrain.point_count(), GridCoords::new(21, 7));
        // (3, 9) is outside the new Z range, (10, 10) too
        assert!(terrain.get(3, 9).is_none());

        let mut terrain = TerrainRepresentation::new(Vec2::new(10.0, 10.0), 1.0, 4);
        terrain[(3, 9)].position.y = 7.0;
        terrain[(3, 9)].is_on_border = true;
        terrain[(3, 9)].color = Color::rgb(1.0, 0.0, 0.0);
        terrain[(10, 10)].region = RegionKind::StormyArea;

        terrain.change_dimensions(Vec2::new(30.0, 30.0));
        assert_eq!(terrain.point_count(), GridCoords::new(31, 31));
        assert_eq!(terrain[(3, 9)].position.y, 7.0);
        assert!(terrain[(3, 9)].is_on_border);
        assert_eq!(terrain[(3, 9)].color, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(terrain[(10, 10)].region, RegionKind::StormyArea);
        // New area is flat and untagged
        assert_eq!(terrain[(20, 20)].position.y, 0.0);
        assert_eq!(terrain[(20, 20)].region, RegionKind::None);
        assert_eq!(terrain[(11, 3)].region, RegionKind::None);
        // Lattice follows the new centre
        assert_eq!(terrain[(0, 0)].position.x, -15.0);
    }

    #[test]
    fn test_reset_points_restores_lattice() {
        let mut terrain = TerrainRepresentation::new(Vec2::new(4.0, 4.0), 1.0, 2);
        terrain[(1, 1)].position.y = 9.0;
        terrain[(1, 1)].region = RegionKind::AboveWater;
        terrain.reset_points();
        assert_eq!(terrain[(1, 1)].position, terrain[(1, 1)].original_position());
        assert_eq!(terrain[(1, 1)].region, RegionKind::None);
    }

    #[test]
    fn test_nearest_grid_point_is_clamped() {
        let terrain = TerrainRepresentation::new(Vec2::new(50.0, 50.0), 0.5, 25);
        assert_eq!(terrain.nearest_grid_point(Vec3::ZERO), GridCoords::new(50, 50));
        assert_eq!(
            terrain.nearest_grid_point(Vec3::new(0.26, 3.0, -0.24)),
            GridCoords::new(51, 50)
        );
        assert_eq!(
            terrain.nearest_grid_point(Vec3::new(-1000.0, 0.0, 1000.0)),
            GridCoords::new(0, 100)
        );
    }

    #[test]
    fn test_checked_access() {
        let terrain = TerrainRepresentation::new(Vec2::new(2.0, 2.0), 1.0, 2);
        assert!(terrain.try_point(2, 2).is_ok());
        assert!(matches!(
            terrain.try_point(3, 0),
            Err(LevelGenError::GridOutOfBounds { i: 3, j: 0, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "outside the 3x3 grid")]
    fn test_out_of_range_index_panics() {
        let terrain = TerrainRepresentation::new(Vec2::new(2.0, 2.0), 1.0, 2);
        let _ = &terrain[(0, 3)];
    }
}
