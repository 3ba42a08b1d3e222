use hooprace_levelgen::geometry::{Vec2, Vec3};
use hooprace_levelgen::mesh::{generate_terrain_meshes, MeshStore};
use hooprace_levelgen::terrain::TerrainRepresentation;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

fn terrain_strategy() -> impl Strategy<Value = TerrainRepresentation> {
    (1.0f32..80.0, 1.0f32..80.0, 1.0f32..10.0, 1usize..40).prop_map(|(w, d, offset, block)| {
        TerrainRepresentation::new(Vec2::new(w, d), offset, block)
    })
}

proptest! {
    #[test]
    fn grid_covers_requested_dimensions(
        width in 1.0f32..80.0,
        depth in 1.0f32..80.0,
        offset in 1.0f32..10.0,
        block in 1usize..40,
    ) {
        let terrain = TerrainRepresentation::new(Vec2::new(width, depth), offset, block);
        let count = terrain.point_count();
        let dims = terrain.dimensions();
        prop_assert!(count.x >= 2 && count.z >= 2);
        prop_assert_eq!(terrain.len(), count.x * count.z);
        // rounded up to whole cells, never by a full cell too many
        prop_assert!(dims.x >= width - 1e-3 && dims.x < width + offset + 1e-3);
        prop_assert!(dims.y >= depth - 1e-3 && dims.y < depth + offset + 1e-3);
    }

    #[test]
    fn grid_is_centered_lattice(terrain in terrain_strategy()) {
        let count = terrain.point_count();
        let offset = terrain.point_offset();
        let first = terrain[(0, 0)].position;
        let last = terrain[(count.x - 1, count.z - 1)].position;
        prop_assert!((first.x + last.x).abs() < 1e-2);
        prop_assert!((first.z + last.z).abs() < 1e-2);
        for (i, j) in [(0, count.z - 1), (count.x / 2, count.z / 2), (count.x - 1, 0)] {
            let p = terrain[(i, j)].position;
            prop_assert!((p.x - (first.x + i as f32 * offset)).abs() < 1e-2);
            prop_assert!((p.z - (first.z + j as f32 * offset)).abs() < 1e-2);
        }
    }

    #[test]
    fn blocks_partition_the_grid(terrain in terrain_strategy()) {
        let count = terrain.point_count();
        let mut seen = HashSet::new();
        for block in terrain.blocks() {
            prop_assert!(block.size.x <= terrain.block_size() && block.size.z <= terrain.block_size());
            for (coords, point) in block.iter() {
                prop_assert!(seen.insert((coords.x, coords.z)));
                prop_assert_eq!(point.position, terrain[(coords.x, coords.z)].position);
            }
        }
        prop_assert_eq!(seen.len(), count.x * count.z);
    }

    #[test]
    fn nearest_grid_point_stays_in_bounds(
        terrain in terrain_strategy(),
        x in -500.0f32..500.0,
        z in -500.0f32..500.0,
    ) {
        let coords = terrain.nearest_grid_point(Vec3::new(x, 0.0, z));
        prop_assert!(terrain.contains(coords.x, coords.z));
    }

    #[test]
    fn every_block_gets_a_mesh(terrain in terrain_strategy()) {
        let mut store = MeshStore::new();
        let stats = generate_terrain_meshes(&terrain, &HashMap::new(), &mut store).unwrap();
        let blocks = terrain.block_count();
        prop_assert_eq!(store.len(), blocks.x * blocks.z);
        prop_assert_eq!(stats.blocks, blocks.x * blocks.z);

        // every grid cell is covered by exactly two triangles
        let cells = (terrain.point_count().x - 1) * (terrain.point_count().z - 1);
        prop_assert_eq!(stats.triangles, cells * 2);
    }
}
