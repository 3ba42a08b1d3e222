//! Procedural level generation for a hoop racing game.
//!
//! A level is a terrain height field split into meshable blocks, a track of
//! hoops flying over it and bonus spots along the way. Levels are built by a
//! [`pipeline::LevelGenerationPipeline`] running a list of generator modules,
//! while [`race_generation::RaceGeneration`] turns player progression into the
//! parameters and regions those modules use.

pub mod config;
pub mod error;
pub mod geometry;
pub mod level;
pub mod mesh;
pub mod pipeline;
pub mod procgen;
pub mod race_generation;
pub mod region;
pub mod terrain;

pub use config::GeneratorConfig;
pub use error::{LevelGenError, Result};
pub use level::{LevelRepresentation, LevelSummary};
pub use pipeline::{LevelGenerationPipeline, LevelGeneratorModule, LevelRng};
pub use race_generation::{PlayerProgress, PlayerStats, RaceGeneration, RaceParameters};
