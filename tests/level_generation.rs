use hooprace_levelgen::config::{GeneratorConfig, TerrainSettings};
use hooprace_levelgen::geometry::Vec3;
use hooprace_levelgen::level::LevelRepresentation;
use hooprace_levelgen::pipeline::{LevelGenerationPipeline, LevelRng, PipelineState};
use hooprace_levelgen::procgen::{default_modules, ModuleSettings};
use hooprace_levelgen::race_generation::{PlayerProgress, PlayerStats, RaceGeneration, RaceParameters};
use hooprace_levelgen::region::{RegionCatalog, RegionKind};
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

const MAX_ALTITUDE: f32 = 20.0;

fn terrain() -> TerrainSettings {
    TerrainSettings {
        dimensions: [50.0, 50.0],
        point_offset: 5.0,
        block_size: 32,
    }
}

fn progress(endurance: u8, dexterity: u8) -> PlayerProgress {
    PlayerProgress {
        stats: PlayerStats::new(endurance, 0, dexterity, 0, 0),
        max_altitude: MAX_ALTITUDE,
        ..PlayerProgress::default()
    }
}

/// Configures a fresh pipeline with every default module and runs it.
fn generate(seed: u64, progress: &PlayerProgress) -> (LevelGenerationPipeline, RaceParameters) {
    let mut pipeline = LevelGenerationPipeline::new(terrain(), RegionCatalog::builtin())
        .with_modules(default_modules(&ModuleSettings::default()));
    pipeline.set_seed(Some(seed));
    let race = RaceGeneration::default();
    let params = race.configure_pipeline(&mut pipeline, progress, &mut LevelRng::seed_from_u64(seed));
    pipeline.generate().expect("level generation failed");
    (pipeline, params)
}

fn terrain_heights(level: &LevelRepresentation) -> Vec<f32> {
    let count = level.terrain.point_count();
    (0..count.x)
        .flat_map(|x| (0..count.z).map(move |z| (x, z)))
        .map(|(x, z)| level.terrain[(x, z)].position.y)
        .collect()
}

#[test]
fn test_full_generation_produces_consistent_level() {
    let (pipeline, params) = generate(42, &progress(0, 0));
    let level = pipeline.level();

    assert_eq!(pipeline.state(), PipelineState::Complete);
    assert_eq!(params.checkpoint_count, 4);
    assert_eq!(level.track.len(), 4 + 3 * 3);
    assert_eq!(level.checkpoint_count(), 4);
    assert!(level.track[0].is_checkpoint);
    assert!(level.track.last().unwrap().is_checkpoint);

    // the random walk grew the terrain around the track
    let dimensions = level.terrain.dimensions();
    assert!(dimensions.x >= 300.0 && dimensions.y >= 300.0);

    for point in &level.track {
        assert!(point.position.y >= 0.0 && point.position.y <= MAX_ALTITUDE);
        assert!(point.hoop.is_some());
        let grid = level.terrain[(point.grid_coords.x, point.grid_coords.z)].position;
        assert_eq!((grid.x, grid.z), (point.position.x, point.position.z));
    }
    for spot in &level.bonuses {
        assert!(!spot.is_empty);
        assert!(!spot.instances.is_empty());
        assert!(spot.previous_hoop_index + 1 < level.track.len());
    }
    assert!(level.finish.is_some());
    assert!(level.player_start_position.y >= level.track[0].position.y);

    assert_eq!(params.opponents_count, 5);
    assert_eq!(level.opponents.len(), 5);
    for opponent in &level.opponents {
        assert_eq!(opponent.start_position.z, level.player_start_position.z);
        assert_eq!(opponent.start_position.y, level.player_start_position.y);
        assert_ne!(opponent.start_position.x, level.player_start_position.x);
    }
    assert_eq!(level.borders.len(), 2 * (level.track.len() - 1) + 6);
    let water = level.water.expect("water placed");
    assert_eq!(water.size, dimensions);
}

#[test]
fn test_regions_in_level_are_available() {
    for seed in 0..5 {
        let (pipeline, _) = generate(seed, &progress(30, 30));
        let level = pipeline.level();

        assert!(!level.regions_in_level.is_empty());
        for region in &level.regions_in_level {
            assert!(level.is_region_available(*region), "{:?} is locked", region);
        }
        let count = level.terrain.point_count();
        for x in 0..count.x {
            for z in 0..count.z {
                let region = level.terrain[(x, z)].region;
                assert_ne!(region, RegionKind::None);
                assert!(level.is_region_in_level(region));
            }
        }
        for point in &level.track {
            if point.track_region != RegionKind::None {
                assert!(level.is_region_in_level(point.track_region));
            }
        }
    }
}

#[test]
fn test_same_seed_same_level() {
    let (a, _) = generate(7, &progress(50, 50));
    let (b, _) = generate(7, &progress(50, 50));
    let (a, b) = (a.level(), b.level());

    assert_ne!(a.id, b.id);
    assert_eq!(a.track, b.track);
    assert_eq!(a.bonuses, b.bonuses);
    assert_eq!(a.player_start_position, b.player_start_position);
    assert_eq!(a.regions_in_level, b.regions_in_level);
    assert_eq!(terrain_heights(a), terrain_heights(b));
}

#[test]
fn test_meshes_cover_every_block() {
    let (pipeline, _) = generate(3, &progress(0, 0));
    let blocks = pipeline.level().terrain.block_count();
    assert_eq!(pipeline.meshes().len(), blocks.x * blocks.z);
    for x in 0..blocks.x {
        for z in 0..blocks.z {
            let mesh = pipeline.meshes().get(x, z).expect("block mesh");
            assert_eq!(mesh.vertices.len(), mesh.indices.len());
            assert_eq!(mesh.normals.len(), mesh.vertices.len());
        }
    }
    let obj = pipeline.meshes().export_obj();
    assert!(obj.contains("o block_0_0"));
}

#[test]
fn test_steeper_angles_with_dexterity() {
    let (_, low) = generate(1, &progress(0, 0));
    let (_, high) = generate(1, &progress(0, 100));
    assert!(high.max_direction_change.x > low.max_direction_change.x);
    assert!(high.max_direction_change.y > low.max_direction_change.y);
}

#[test]
fn test_angle_limit_holds_along_track() {
    let (pipeline, params) = generate(11, &progress(0, 0));
    let level = pipeline.level();
    let tan = params.max_direction_change.x.to_radians().tan();

    // hoops and bonus spots interleaved in flying order
    let mut sequence: Vec<Vec3> = Vec::new();
    for (i, point) in level.track.iter().enumerate() {
        sequence.push(point.position);
        sequence.extend(
            level
                .bonuses
                .iter()
                .filter(|b| b.previous_hoop_index == i)
                .map(|b| b.position),
        );
    }
    for pair in sequence.windows(2) {
        let rise = (pair[1].y - pair[0].y).abs();
        let run = pair[0].horizontal_distance(&pair[1]);
        assert!(rise <= run * tan + 1e-3, "rise {} over {}", rise, run);
    }
}

#[test]
fn test_listener_sees_finished_level() {
    let mut pipeline = LevelGenerationPipeline::new(terrain(), RegionCatalog::builtin())
        .with_modules(default_modules(&ModuleSettings::default()));
    pipeline.set_seed(Some(5));
    RaceGeneration::default().configure_pipeline(&mut pipeline, &progress(0, 0), &mut LevelRng::seed_from_u64(5));

    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    pipeline.on_level_generated(move |level| {
        *sink.lock().unwrap() = Some((level.id, level.track.len()));
    });
    let id = pipeline.generate().unwrap().id;

    assert_eq!(*seen.lock().unwrap(), Some((id, 13)));
}

#[test]
fn test_regenerate_keeps_level_identity() {
    let (mut pipeline, _) = generate(9, &progress(0, 0));
    let id = pipeline.level().id;
    let level = pipeline.regenerate().unwrap();
    assert_eq!(level.id, id);
    assert_eq!(level.track.len(), 13);
}

#[test]
fn test_async_generation() {
    let mut pipeline = LevelGenerationPipeline::new(terrain(), RegionCatalog::builtin())
        .with_modules(default_modules(&ModuleSettings::default()));
    pipeline.set_seed(Some(21));
    RaceGeneration::default().configure_pipeline(&mut pipeline, &progress(0, 0), &mut LevelRng::seed_from_u64(21));

    let track_points = tokio_test::block_on(async { pipeline.generate_async().await.map(|l| l.track.len()) });
    assert_eq!(track_points.unwrap(), 13);
    assert_eq!(pipeline.state(), PipelineState::Complete);
}

#[test]
fn test_generation_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("levelgen.toml");
    std::fs::write(
        &path,
        r#"
[terrain]
point_offset = 10.0
block_size = 16

[generation]
seed = 99

[generation.modules.bonus_placement]
enabled = false

[race]
final_checkpoints = 8
opponents_count = 2
"#,
    )
    .unwrap();
    let config = GeneratorConfig::load(&path).unwrap();

    let mut pipeline = LevelGenerationPipeline::new(config.terrain.clone(), RegionCatalog::builtin())
        .with_modules(default_modules(&config.generation.modules));
    pipeline.set_seed(config.generation.seed);
    let race = RaceGeneration::new(config.race.clone());
    let level = race
        .generate_level(&mut pipeline, &progress(100, 0), &mut LevelRng::seed_from_u64(99))
        .unwrap();

    assert_eq!(level.terrain.point_offset(), 10.0);
    assert_eq!(level.checkpoint_count(), 8);
    // spots stay unpopulated without bonus placement
    assert!(level.bonuses.iter().all(|b| b.is_empty));
    assert_eq!(level.bonuses.len(), (level.track.len() - 1) * 3);
    assert_eq!(level.opponents.len(), 2);
    assert_eq!(pipeline.seed_used(), 99);
}
