use thiserror::Error;

#[derive(Debug, Error)]
pub enum LevelGenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Terrain point ({i}, {j}) is outside the {count_x}x{count_z} grid")]
    GridOutOfBounds {
        i: usize,
        j: usize,
        count_x: usize,
        count_z: usize,
    },
    #[error("Terrain block ({block_x}, {block_z}) has no backing points")]
    UnbackedBlock { block_x: usize, block_z: usize },
    #[error("Level generation is already in progress")]
    GenerationInProgress,
    #[error("Level has not been generated yet")]
    NotInitialized,
    #[error("Module '{module}' failed: {reason}")]
    Module { module: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, LevelGenError>;
