use clap::Parser;
use hooprace_levelgen::{
    config::{GeneratorConfig, LoggingSettings},
    pipeline::{LevelGenerationPipeline, LevelRng},
    procgen::default_modules,
    race_generation::{PlayerProgress, PlayerStats, RaceGeneration, RegionSelection},
    region::RegionCatalog,
};
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a hoop race level", long_about = None)]
struct Args {
    /// Path to the generator TOML configuration file
    #[arg(short, long, default_value = "./levelgen.toml")]
    config: String,

    /// Seed for the level, overrides `generation.seed`
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    endurance: u8,

    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    speed: u8,

    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    dexterity: u8,

    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    precision: u8,

    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    magic: u8,

    /// Highest altitude the broom can reach
    #[arg(long, default_value_t = 20.0)]
    max_altitude: f32,

    #[arg(long, default_value_t = 0)]
    tutorial_stage: u32,

    /// Pick regions uniformly from everything unlocked
    #[arg(long)]
    quick_race: bool,

    /// Write the level summary as JSON here instead of stdout
    #[arg(short, long)]
    summary: Option<PathBuf>,

    /// Export the terrain meshes as a Wavefront OBJ file
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Override log level (trace|debug|info|warn|error)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn init_tracing(
    logging: &LoggingSettings,
    level: &str,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let (writer, guard) = match &logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path.file_name().ok_or("log file path has no file name")?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(writer);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = GeneratorConfig::load(&args.config);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(config.logging.level.as_str())
        .to_string();
    let _guard = init_tracing(&config.logging, &log_level)?;

    info!("Starting hoop race level generator v{}", env!("CARGO_PKG_VERSION"));
    match &loaded {
        Ok(_) => info!("Loaded configuration from {}", args.config),
        Err(e) => warn!("Failed to load config from {}: {}, using defaults", args.config, e),
    }

    let mut race_settings = config.race.clone();
    if args.quick_race {
        race_settings.selection = RegionSelection::QuickRace;
    }
    let race = RaceGeneration::new(race_settings);

    let seed = args.seed.or(config.generation.seed);
    let mut pipeline = LevelGenerationPipeline::new(config.terrain.clone(), RegionCatalog::builtin())
        .with_modules(default_modules(&config.generation.modules));
    pipeline.set_seed(seed);

    let progress = PlayerProgress {
        stats: PlayerStats::new(args.endurance, args.speed, args.dexterity, args.precision, args.magic),
        max_altitude: args.max_altitude,
        tutorial_stage: args.tutorial_stage,
        ..PlayerProgress::default()
    };
    let mut selection_rng = match seed {
        Some(seed) => LevelRng::seed_from_u64(seed),
        None => LevelRng::from_entropy(),
    };
    let params = race.configure_pipeline(&mut pipeline, &progress, &mut selection_rng);

    let summary = pipeline.generate_async().await?.summary();
    info!(
        "Generated level {} with seed {}: {} track points, {} bonus spots, {} terrain blocks",
        summary.id,
        pipeline.seed_used(),
        summary.track_points,
        summary.bonus_spots,
        pipeline.meshes().len()
    );

    if let Some(path) = &args.obj {
        std::fs::write(path, pipeline.meshes().export_obj())?;
        info!("Terrain meshes written to {}", path.display());
    }

    let output = serde_json::to_string_pretty(&serde_json::json!({
        "seed": pipeline.seed_used(),
        "parameters": params,
        "level": summary,
    }))?;
    match &args.summary {
        Some(path) => {
            std::fs::write(path, output)?;
            info!("Level summary written to {}", path.display());
        }
        None => println!("{}", output),
    }

    Ok(())
}
