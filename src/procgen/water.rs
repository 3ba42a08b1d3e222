//! Water surface under the whole level.
use crate::error::Result;
use crate::geometry::Vec3;
use crate::level::{LevelRepresentation, WaterPlane};
use crate::pipeline::{LevelGeneratorModule, LevelRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterSettings {
    /// Height of the water surface
    pub level: f32,
}

/// Stretches the water plane over the final terrain dimensions.
pub struct WaterPlacement {
    settings: WaterSettings,
}

impl WaterPlacement {
    pub fn new(settings: WaterSettings) -> Self {
        Self { settings }
    }
}

impl LevelGeneratorModule for WaterPlacement {
    fn name(&self) -> &'static str {
        "WaterPlacement"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, _rng: &mut LevelRng) -> Result<()> {
        level.water = Some(WaterPlane {
            center: Vec3::new(0.0, self.settings.level, 0.0),
            size: level.terrain.dimensions(),
        });
        Ok(())
    }
}
