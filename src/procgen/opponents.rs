//! Opponents lined up on the start line next to the player.
use crate::error::Result;
use crate::geometry::Vec3;
use crate::level::{LevelRepresentation, Opponent, SkillLevel};
use crate::pipeline::{LevelGeneratorModule, LevelRng};
use crate::race_generation::RaceParameters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpponentsSettings {
    pub count: usize,
    /// Each skill level is handed out at most once, the rest race as `Average`
    pub skill_levels: Vec<SkillLevel>,
    /// Gap between neighbours on the start line
    pub spacing: f32,
}

impl Default for OpponentsSettings {
    fn default() -> Self {
        Self {
            count: 5,
            skill_levels: vec![
                SkillLevel::Best,
                SkillLevel::Good,
                SkillLevel::Average,
                SkillLevel::Bad,
                SkillLevel::Worst,
            ],
            spacing: 2.0,
        }
    }
}

pub struct OpponentsGeneration {
    settings: OpponentsSettings,
}

impl OpponentsGeneration {
    pub fn new(settings: OpponentsSettings) -> Self {
        Self { settings }
    }

    /// Slot on the start line relative to the player, never 0. With an odd
    /// count the extra opponent goes to the left.
    fn line_slot(index: usize, count: usize) -> i64 {
        let offset = index as i64 - ((count as i64 + 1) / 2);
        if offset >= 0 {
            offset + 1
        } else {
            offset
        }
    }
}

impl LevelGeneratorModule for OpponentsGeneration {
    fn name(&self) -> &'static str {
        "OpponentsGeneration"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) -> Result<()> {
        let count = self.settings.count;
        let mut remaining = self.settings.skill_levels.clone();

        level.opponents.clear();
        for i in 0..count {
            let slot = Self::line_slot(i, count) as f32 * self.settings.spacing;
            let start_position = level.player_start_position + Vec3::RIGHT * slot;
            let skill_level = if remaining.is_empty() {
                SkillLevel::Average
            } else {
                remaining.remove(rng.gen_range(0..remaining.len()))
            };
            level.opponents.push(Opponent {
                start_position,
                skill_level,
            });
        }
        debug!("Placed {} opponents on the start line", count);
        Ok(())
    }

    fn apply_race_parameters(&mut self, params: &RaceParameters) {
        self.settings.count = params.opponents_count;
    }
}
