use crate::error::{LevelGenError, Result};
use crate::geometry::Vec2;
use crate::procgen::ModuleSettings;
use crate::race_generation::RaceSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub terrain: TerrainSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub race: RaceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Requested size in X and Z, rounded up to a multiple of `point_offset`
    pub dimensions: [f32; 2],
    /// Distance between adjacent grid points
    pub point_offset: f32,
    /// Points per block side
    pub block_size: usize,
}

impl TerrainSettings {
    pub fn dimensions(&self) -> Vec2 {
        Vec2::new(self.dimensions[0], self.dimensions[1])
    }
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            dimensions: [50.0, 50.0],
            point_offset: 5.0,
            block_size: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Fixed seed, a random one is drawn per run when absent
    pub seed: Option<u64>,
    pub modules: ModuleSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Also write logs into this file
    pub file: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json: false,
        }
    }
}

impl GeneratorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: GeneratorConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}, using defaults", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        let terrain = &self.terrain;
        if !(terrain.point_offset > 0.0) {
            return Err(LevelGenError::InvalidConfig(format!(
                "terrain.point_offset must be positive, got {}",
                terrain.point_offset
            )));
        }
        if terrain.block_size == 0 {
            return Err(LevelGenError::InvalidConfig(
                "terrain.block_size must be at least 1".to_string(),
            ));
        }
        if terrain.dimensions.iter().any(|d| !(*d > 0.0)) {
            return Err(LevelGenError::InvalidConfig(format!(
                "terrain.dimensions must be positive, got {:?}",
                terrain.dimensions
            )));
        }
        if self.race.region_count_in_level == 0 {
            return Err(LevelGenError::InvalidConfig(
                "race.region_count_in_level must be at least 1".to_string(),
            ));
        }
        if self.race.initial_checkpoints < 2 || self.race.final_checkpoints < 2 {
            return Err(LevelGenError::InvalidConfig(
                "a race needs at least 2 checkpoints".to_string(),
            ));
        }
        Ok(())
    }
}
