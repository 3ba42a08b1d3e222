//! Walls along both sides of the track, closed around the start and behind
//! the finish.
use crate::error::Result;
use crate::geometry::{line_intersection_xz, Vec3};
use crate::level::{BorderSegment, LevelRepresentation};
use crate::pipeline::{LevelGeneratorModule, LevelRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackBorderSettings {
    /// Distance between the two walls
    pub track_width: f32,
    /// Heights covered by the walls, bottom then top
    pub height_range: [f32; 2],
    /// How far in front of the first hoop the walls are closed
    pub start_padding: f32,
    /// How far behind the last hoop the walls are closed
    pub end_padding: f32,
}

impl Default for TrackBorderSettings {
    fn default() -> Self {
        Self {
            track_width: 80.0,
            height_range: [-10.0, 70.0],
            start_padding: 150.0,
            end_padding: 200.0,
        }
    }
}

pub struct TrackBorderGeneration {
    settings: TrackBorderSettings,
}

impl TrackBorderGeneration {
    pub fn new(settings: TrackBorderSettings) -> Self {
        Self { settings }
    }

    fn segment(&self, start: Vec3, end: Vec3) -> BorderSegment {
        let [bottom, top] = self.settings.height_range;
        let middle = (bottom + top) / 2.0;
        BorderSegment {
            start: start.with_y(middle),
            end: end.with_y(middle),
            height: top - bottom,
        }
    }

    /// Three walls boxing in the area `padding` away from the two end points.
    fn close(&self, borders: &mut Vec<BorderSegment>, a: Vec3, b: Vec3, direction: Vec3, padding: f32) {
        let corner_a = a + direction * padding;
        let corner_b = b + direction * padding;
        borders.push(self.segment(a, corner_a));
        borders.push(self.segment(b, corner_b));
        borders.push(self.segment(corner_a, corner_b));
    }
}

fn horizontal_direction(v: Vec3) -> Vec3 {
    let flat = v.with_y(0.0);
    if flat.length() < 1e-4 {
        Vec3::FORWARD
    } else {
        flat.normalize()
    }
}

/// Direction of the segment starting at `index`. The last point reuses the
/// direction of the segment leading to it.
fn segment_direction(track: &[Vec3], index: usize) -> Vec3 {
    match track.len() {
        0 | 1 => Vec3::FORWARD,
        n if index + 1 >= n => horizontal_direction(track[n - 1] - track[n - 2]),
        _ => horizontal_direction(track[index + 1] - track[index]),
    }
}

/// Points half the track width to the right and to the left of `center`.
fn sides(center: Vec3, direction: Vec3, half_width: f32) -> (Vec3, Vec3) {
    let right = direction.rotate_y(90.0);
    (center + right * half_width, center - right * half_width)
}

impl LevelGeneratorModule for TrackBorderGeneration {
    fn name(&self) -> &'static str {
        "TrackBorderGeneration"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, _rng: &mut LevelRng) -> Result<()> {
        level.borders.clear();
        let track: Vec<Vec3> = level.track.iter().map(|p| p.position).collect();
        if track.is_empty() {
            return Ok(());
        }
        let half_width = self.settings.track_width / 2.0;
        let mut borders = Vec::new();

        let mut previous_direction = segment_direction(&track, 0);
        let (mut previous_right, mut previous_left) = sides(track[0], previous_direction, half_width);
        self.close(
            &mut borders,
            previous_right,
            previous_left,
            previous_direction * -1.0,
            self.settings.start_padding,
        );

        for i in 0..track.len() - 1 {
            let next_direction = segment_direction(&track, i + 1);
            let (right, left) = sides(track[i + 1], next_direction, half_width);
            // Inner corners meet where the walls of both segments cross
            let (next_right, next_left) = if i + 2 < track.len() {
                let crossing_right = line_intersection_xz(
                    previous_right,
                    previous_right + previous_direction,
                    right,
                    right + next_direction,
                );
                let crossing_left = line_intersection_xz(
                    previous_left,
                    previous_left + previous_direction,
                    left,
                    left + next_direction,
                );
                match (crossing_right, crossing_left) {
                    (Some(r), Some(l)) => (r, l),
                    _ => (right, left),
                }
            } else {
                (right, left)
            };
            borders.push(self.segment(previous_right, next_right));
            borders.push(self.segment(previous_left, next_left));
            previous_direction = next_direction;
            previous_right = next_right;
            previous_left = next_left;
        }

        self.close(
            &mut borders,
            previous_right,
            previous_left,
            previous_direction,
            self.settings.end_padding,
        );
        debug!("Track border built from {} segments", borders.len());
        level.borders = borders;
        Ok(())
    }
}
