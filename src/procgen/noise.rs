//! Multi-octave Perlin noise used by the height map generators.
use crate::pipeline::LevelRng;
use noise::{NoiseFn, Perlin};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Shape of an octaved noise: how many layers and how each layer relates to
/// the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctaveSettings {
    pub octaves: u32,
    /// Frequency of the first octave
    pub initial_frequency: f32,
    /// Frequency multiplier between consecutive octaves
    pub frequency_factor: f32,
    /// Amplitude multiplier between consecutive octaves
    pub scale_factor: f32,
}

impl Default for OctaveSettings {
    fn default() -> Self {
        Self {
            octaves: 3,
            initial_frequency: 0.05,
            frequency_factor: 2.0,
            scale_factor: 0.5,
        }
    }
}

/// Layered Perlin noise sampler with a random offset into the noise field.
pub struct OctavedPerlin {
    perlin: Perlin,
    offset_x: f32,
    offset_z: f32,
    octaves: OctaveSettings,
}

impl OctavedPerlin {
    pub fn new(seed: u32, offset_x: f32, offset_z: f32, octaves: OctaveSettings) -> Self {
        Self {
            perlin: Perlin::new(seed),
            offset_x,
            offset_z,
            octaves,
        }
    }

    /// Seed and offsets are drawn from the level generator's RNG so a level
    /// seed reproduces the same terrain.
    pub fn from_rng(rng: &mut LevelRng, octaves: OctaveSettings) -> Self {
        let seed = rng.gen::<u32>();
        let offset_x = rng.gen_range(0.0..1000.0);
        let offset_z = rng.gen_range(0.0..1000.0);
        Self::new(seed, offset_x, offset_z, octaves)
    }

    /// Sample at world distances `x`, `z` from the grid origin.
    ///
    /// Each octave contributes a value in roughly [-1, 1], weighted by the
    /// accumulated scale factor, so the result is not normalized.
    pub fn sample(&self, x: f32, z: f32) -> f32 {
        let mut value = 0.0;
        let mut scale = 1.0;
        let mut frequency = self.octaves.initial_frequency;
        for _ in 0..self.octaves.octaves {
            value += self.perlin.get([
                ((self.offset_x + x) * frequency) as f64,
                ((self.offset_z + z) * frequency) as f64,
            ]) as f32
                * scale;
            frequency *= self.octaves.frequency_factor;
            scale *= self.octaves.scale_factor;
        }
        value
    }
}
