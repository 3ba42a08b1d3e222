use crate::error::{LevelGenError, Result};
use crate::geometry::{Color, Vec3};
use crate::region::{LevelRegion, RegionKind};
use crate::terrain::{GridCoords, TerrainRepresentation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use tracing::{info, warn};

/// Largest index count that still fits 16-bit index buffers.
pub const MAX_U16_INDEX_COUNT: usize = u16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "data", rename_all = "snake_case")]
pub enum MeshIndices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl MeshIndices {
    /// Picks the narrowest index width able to hold `indices`.
    pub fn from_indices(indices: Vec<u32>) -> Self {
        if indices.len() <= MAX_U16_INDEX_COUNT {
            MeshIndices::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            MeshIndices::U32(indices)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MeshIndices::U16(indices) => indices.len(),
            MeshIndices::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            MeshIndices::U16(indices) => indices.get(i).map(|&idx| idx as u32),
            MeshIndices::U32(indices) => indices.get(i).copied(),
        }
    }

    pub fn to_u32(&self) -> Vec<u32> {
        match self {
            MeshIndices::U16(indices) => indices.iter().map(|&i| i as u32).collect(),
            MeshIndices::U32(indices) => indices.clone(),
        }
    }
}

/// Flat-shaded triangle mesh of one terrain block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainMesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Color>,
    pub indices: MeshIndices,
}

impl TerrainMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Shared-vertex grid patch of a block before flat shading. Includes the extra
/// row and column borrowed from existing neighbours so adjacent patches share
/// their boundary vertices.
#[derive(Debug, Clone)]
pub struct GridPatch {
    pub origin: GridCoords,
    /// Patch size in points, neighbour row/column included
    pub size: GridCoords,
    /// X-major: vertex `x * size.z + z`
    pub vertices: Vec<Vec3>,
    pub colors: Vec<Color>,
    pub indices: Vec<u32>,
}

/// Receives finished block meshes, e.g. a renderer or a collision backend.
pub trait MeshSink {
    fn submit_block_mesh(&mut self, block_x: usize, block_z: usize, mesh: TerrainMesh);
}

/// Builds the mesh of a single terrain block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainBlock {
    pub block_x: usize,
    pub block_z: usize,
}

impl TerrainBlock {
    pub fn new(block_x: usize, block_z: usize) -> Self {
        Self { block_x, block_z }
    }

    pub fn grid_patch(
        &self,
        terrain: &TerrainRepresentation,
        regions: &HashMap<RegionKind, LevelRegion>,
    ) -> Result<GridPatch> {
        let block = terrain
            .block(self.block_x, self.block_z)
            .filter(|b| !b.is_empty())
            .ok_or(LevelGenError::UnbackedBlock {
                block_x: self.block_x,
                block_z: self.block_z,
            })?;

        let block_count = terrain.block_count();
        let width = block.size.x + usize::from(self.block_x + 1 < block_count.x);
        let height = block.size.z + usize::from(self.block_z + 1 < block_count.z);

        let mut vertices = Vec::with_capacity(width * height);
        let mut colors = Vec::with_capacity(width * height);
        let mut unknown_regions = BTreeSet::new();
        for x in 0..width {
            for z in 0..height {
                let point = &terrain[(block.origin.x + x, block.origin.z + z)];
                vertices.push(point.position);
                match regions.get(&point.region) {
                    Some(region) => colors.push(region.color),
                    None => {
                        unknown_regions.insert(point.region);
                        colors.push(Color::BLACK);
                    }
                }
            }
        }
        for region in unknown_regions {
            warn!(
                "Unknown region {:?} in terrain block ({}, {}), using fallback color",
                region, self.block_x, self.block_z
            );
        }

        let mut indices = Vec::with_capacity(width.saturating_sub(1) * height.saturating_sub(1) * 6);
        for x in 0..width.saturating_sub(1) {
            for z in 0..height.saturating_sub(1) {
                let v = (x * height + z) as u32;
                let h = height as u32;
                indices.extend_from_slice(&[v, v + 1, v + h, v + h, v + 1, v + h + 1]);
            }
        }

        Ok(GridPatch {
            origin: block.origin,
            size: GridCoords::new(width, height),
            vertices,
            colors,
            indices,
        })
    }

    /// Builds the flat-shaded mesh: every triangle corner gets its own vertex
    /// so each face carries its own normal.
    pub fn build_mesh(
        &self,
        terrain: &TerrainRepresentation,
        regions: &HashMap<RegionKind, LevelRegion>,
    ) -> Result<TerrainMesh> {
        let patch = self.grid_patch(terrain, regions)?;

        let mut vertices = Vec::with_capacity(patch.indices.len());
        let mut normals = Vec::with_capacity(patch.indices.len());
        let mut colors = Vec::with_capacity(patch.indices.len());
        for triangle in patch.indices.chunks_exact(3) {
            let corners = [
                patch.vertices[triangle[0] as usize],
                patch.vertices[triangle[1] as usize],
                patch.vertices[triangle[2] as usize],
            ];
            let normal = (corners[1] - corners[0])
                .cross(&(corners[2] - corners[0]))
                .normalize();
            for (corner, &idx) in corners.iter().zip(triangle) {
                vertices.push(*corner);
                normals.push(normal);
                colors.push(patch.colors[idx as usize]);
            }
        }
        let indices = (0..vertices.len() as u32).collect();

        Ok(TerrainMesh {
            vertices,
            normals,
            colors,
            indices: MeshIndices::from_indices(indices),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub blocks: usize,
    pub vertices: usize,
    pub triangles: usize,
}

/// Builds and submits the mesh of every terrain block.
pub fn generate_terrain_meshes(
    terrain: &TerrainRepresentation,
    regions: &HashMap<RegionKind, LevelRegion>,
    sink: &mut dyn MeshSink,
) -> Result<MeshStats> {
    let mut stats = MeshStats::default();
    let count = terrain.block_count();
    for block_x in 0..count.x {
        for block_z in 0..count.z {
            let mesh = TerrainBlock::new(block_x, block_z).build_mesh(terrain, regions)?;
            stats.blocks += 1;
            stats.vertices += mesh.vertices.len();
            stats.triangles += mesh.triangle_count();
            sink.submit_block_mesh(block_x, block_z, mesh);
        }
    }
    info!(
        "Built terrain meshes: {} blocks, {} vertices, {} triangles",
        stats.blocks, stats.vertices, stats.triangles
    );
    Ok(stats)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBlockMesh {
    pub block_x: usize,
    pub block_z: usize,
    pub mesh: TerrainMesh,
}

/// In-memory sink keeping every submitted block mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshStore {
    blocks: Vec<StoredBlockMesh>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[StoredBlockMesh] {
        &self.blocks
    }

    pub fn get(&self, block_x: usize, block_z: usize) -> Option<&TerrainMesh> {
        self.blocks
            .iter()
            .find(|b| b.block_x == block_x && b.block_z == block_z)
            .map(|b| &b.mesh)
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Wavefront OBJ with one object per block.
    pub fn export_obj(&self) -> String {
        let mut obj = String::new();
        obj.push_str("# Hoop race terrain\n");

        let mut base = 1;
        for block in &self.blocks {
            let _ = writeln!(obj, "\no block_{}_{}", block.block_x, block.block_z);
            for v in &block.mesh.vertices {
                let _ = writeln!(obj, "v {} {} {}", v.x, v.y, v.z);
            }
            for n in &block.mesh.normals {
                let _ = writeln!(obj, "vn {} {} {}", n.x, n.y, n.z);
            }
            let indices = block.mesh.indices.to_u32();
            for triangle in indices.chunks_exact(3) {
                let (i0, i1, i2) = (
                    triangle[0] as usize + base,
                    triangle[1] as usize + base,
                    triangle[2] as usize + base,
                );
                let _ = writeln!(obj, "f {}//{} {}//{} {}//{}", i0, i0, i1, i1, i2, i2);
            }
            base += block.mesh.vertices.len();
        }
        obj
    }
}

impl MeshSink for MeshStore {
    fn submit_block_mesh(&mut self, block_x: usize, block_z: usize, mesh: TerrainMesh) {
        self.blocks.push(StoredBlockMesh {
            block_x,
            block_z,
            mesh,
        });
    }
}
