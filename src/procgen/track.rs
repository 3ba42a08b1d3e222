//! Track generation: the random walk through hoop positions and the modules
//! that refine the track once the terrain exists.
use super::{random_range, random_uuid};
use crate::error::Result;
use crate::geometry::{lerp, Vec2, Vec3};
use crate::level::{FinishLine, LevelRepresentation, SpawnedHoop, TrackPoint};
use crate::pipeline::{LevelGeneratorModule, LevelRng};
use crate::race_generation::RaceParameters;
use crate::region::RegionKind;
use crate::terrain::{GridCoords, TerrainPoint};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Highest altitude used until race parameters say otherwise.
pub const DEFAULT_MAX_ALTITUDE: f32 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomWalkSettings {
    pub checkpoint_count: usize,
    /// Hoops following each checkpoint except the last one
    pub hoops_between: usize,
    /// Approximate minimum and maximum distance between consecutive points
    pub distance_range: [f32; 2],
    /// Maximum angle between consecutive segments, up/down then left/right
    pub max_direction_change: [f32; 2],
    pub max_altitude: f32,
    /// Free space kept around the track when the terrain is resized
    pub level_padding: f32,
    /// How far behind the first point the player starts
    pub player_start_distance: f32,
}

impl Default for RandomWalkSettings {
    fn default() -> Self {
        Self {
            checkpoint_count: 4,
            hoops_between: 3,
            distance_range: [40.0, 50.0],
            max_direction_change: [10.0, 20.0],
            max_altitude: DEFAULT_MAX_ALTITUDE,
            level_padding: 150.0,
            player_start_distance: 60.0,
        }
    }
}

/// Lays out track points with a random walk. The accumulated turn never
/// exceeds 90 degrees to either side, so the track cannot cross itself.
/// Afterwards the track is centred, the terrain resized around it and every
/// point snapped onto the grid.
pub struct TrackPointsRandomWalk {
    settings: RandomWalkSettings,
    global_angle: f32,
    last_angle: f32,
}

impl TrackPointsRandomWalk {
    pub fn new(settings: RandomWalkSettings) -> Self {
        Self {
            settings,
            global_angle: 0.0,
            last_angle: 0.0,
        }
    }

    pub fn settings(&self) -> &RandomWalkSettings {
        &self.settings
    }

    pub fn point_count(&self) -> usize {
        let checkpoints = self.settings.checkpoint_count;
        checkpoints + self.settings.hoops_between * checkpoints.saturating_sub(1)
    }

    fn generate_points(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) {
        self.global_angle = 0.0;
        self.last_angle = 0.0;
        let count = self.point_count();
        let [min_distance, max_distance] = self.settings.distance_range;

        level.track.clear();
        level.track.push(TrackPoint::new(Vec3::ZERO, true));
        let mut position = Vec3::ZERO;
        let mut direction = Vec3::FORWARD;
        let mut distance = random_range(rng, min_distance, max_distance);

        while level.track.len() < count {
            position = position + direction * distance;
            let is_checkpoint = level.track.len() % (self.settings.hoops_between + 1) == 0;
            level.track.push(TrackPoint::new(position, is_checkpoint));

            let last = level.track.len() - 1;
            let segment = level.track[last].position - level.track[last - 1].position;
            direction = self.select_direction(segment, position.y, rng);
            distance = random_range(rng, min_distance, max_distance);
        }
    }

    /// Turns the previous segment left/right and then sets its slope. The
    /// horizontal part is normalized first so the slope is absolute rather
    /// than relative to the segment length.
    fn select_direction(&mut self, segment: Vec3, altitude: f32, rng: &mut LevelRng) -> Vec3 {
        let angle_y = self.select_angle_y(rng);
        let horizontal = segment.rotate_y(angle_y).with_y(0.0).normalize();
        let angle_x = self.select_angle_x(altitude, segment.y, rng);
        let slope = -angle_x.to_radians().sin();
        horizontal.with_y(slope).normalize()
    }

    /// Up/down angle, negative angles climb.
    fn select_angle_x(&self, altitude: f32, climb: f32, rng: &mut LevelRng) -> f32 {
        let max = self.settings.max_direction_change[0];
        if altitude < 1.0 {
            random_range(rng, -max, 0.0)
        } else if altitude > self.settings.max_altitude - 1.0 {
            random_range(rng, 0.0, max)
        } else if rng.gen::<f32>() < 0.4 {
            // keep climbing or descending
            let signed_max = -max * climb.signum();
            random_range(rng, signed_max.min(0.0), signed_max.max(0.0))
        } else {
            random_range(rng, -max, max)
        }
    }

    fn select_angle_y(&mut self, rng: &mut LevelRng) -> f32 {
        let max = self.settings.max_direction_change[1];
        let (low, high) = self.angle_interval_y();
        let roll = rng.gen::<f32>();
        self.last_angle = if roll < 0.4 {
            // same side as last time
            if self.last_angle < 0.0 {
                random_range(rng, low, 0.0)
            } else {
                random_range(rng, 0.0, high)
            }
        } else if roll < 0.8 {
            // bigger turn to whichever side has room
            let left = low < -max / 2.0;
            let right = high > max / 2.0;
            let go_left = match (left, right) {
                (true, true) => rng.gen::<f32>() < 0.5,
                (true, false) => true,
                _ => false,
            };
            if go_left {
                random_range(rng, low, -max / 2.0)
            } else {
                random_range(rng, max / 2.0, high)
            }
        } else {
            random_range(rng, low, high)
        };
        self.global_angle += self.last_angle;
        self.last_angle
    }

    fn angle_interval_y(&self) -> (f32, f32) {
        let max = self.settings.max_direction_change[1];
        if self.global_angle < 0.0 {
            ((-90.0 - self.global_angle).max(-max), max)
        } else {
            (-max, (90.0 - self.global_angle).min(max))
        }
    }

    /// Moves the track so its bounding box is centred on the origin and
    /// returns the half extents.
    fn center_track(level: &mut LevelRepresentation) -> Vec2 {
        let mut min = Vec2::new(f32::MAX, f32::MAX);
        let mut max = Vec2::new(f32::MIN, f32::MIN);
        for point in &level.track {
            min.x = min.x.min(point.position.x);
            max.x = max.x.max(point.position.x);
            min.y = min.y.min(point.position.z);
            max.y = max.y.max(point.position.z);
        }
        let half = Vec2::new((max.x - min.x) / 2.0, (max.y - min.y) / 2.0);
        let offset = Vec3::new(half.x - max.x, 0.0, half.y - max.y);
        for point in &mut level.track {
            point.position = point.position + offset;
        }
        half
    }

    fn snap_to_grid(level: &mut LevelRepresentation) {
        for i in 0..level.track.len() {
            let position = level.track[i].position;
            let coords = level.nearest_grid_point(position);
            let grid_position = level.terrain[(coords.x, coords.z)].position;
            let point = &mut level.track[i];
            point.position = grid_position.with_y(position.y);
            point.grid_coords = coords;
        }
    }
}

impl LevelGeneratorModule for TrackPointsRandomWalk {
    fn name(&self) -> &'static str {
        "TrackPointsRandomWalk"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) -> Result<()> {
        self.generate_points(level, rng);
        let half = Self::center_track(level);

        let padding = self.settings.level_padding;
        level.change_dimensions(Vec2::new(2.0 * (half.x + padding), 2.0 * (half.y + padding)));
        Self::snap_to_grid(level);

        level.player_start_position =
            level.track[0].position + Vec3::BACK * self.settings.player_start_distance;
        debug!(
            "Random walk placed {} track points, global turn {:.1} deg",
            level.track.len(),
            self.global_angle
        );
        Ok(())
    }

    fn apply_race_parameters(&mut self, params: &RaceParameters) {
        self.settings.checkpoint_count = params.checkpoint_count;
        self.settings.max_direction_change = [params.max_direction_change.x, params.max_direction_change.y];
        self.settings.distance_range = [params.hoop_distance_range.x, params.hoop_distance_range.y];
        self.settings.max_altitude = params.max_altitude;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRegionParams {
    pub region: RegionKind,
    /// Chance the region appears in a track once it has been visited
    pub probability: f32,
    /// Minimum and maximum number of track points in the region
    pub length_range: [usize; 2],
    pub height_range: [f32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackRegionSettings {
    pub regions: Vec<TrackRegionParams>,
}

impl Default for TrackRegionSettings {
    fn default() -> Self {
        Self {
            regions: vec![
                TrackRegionParams {
                    region: RegionKind::MysteriousTunnel,
                    probability: 0.3,
                    length_range: [3, 5],
                    height_range: [2.0, 6.0],
                },
                TrackRegionParams {
                    region: RegionKind::AboveClouds,
                    probability: 0.3,
                    length_range: [3, 6],
                    height_range: [35.0, 45.0],
                },
            ],
        }
    }
}

const TRACK_HEIGHT_KERNEL: [f32; 5] = [0.1, 0.2, 0.4, 0.2, 0.1];

/// Places each available track region on one run of consecutive track points.
/// A region the player has not visited yet always appears.
pub struct TrackRegionGenerator {
    settings: TrackRegionSettings,
}

impl TrackRegionGenerator {
    pub fn new(settings: TrackRegionSettings) -> Self {
        Self { settings }
    }

    /// Weighted average of heights over the run and two points on each side.
    fn smooth_heights(track: &mut [TrackPoint], start: usize, end: usize) {
        let from = start.saturating_sub(2);
        let to = (end + 2).min(track.len() - 1);
        let heights: Vec<f32> = (from..=to)
            .map(|current| {
                TRACK_HEIGHT_KERNEL
                    .iter()
                    .enumerate()
                    .filter_map(|(k, weight)| {
                        let neighbour = (current + k).checked_sub(2)?;
                        track.get(neighbour).map(|p| p.position.y * weight)
                    })
                    .sum()
            })
            .collect();
        for (point, height) in track[from..=to].iter_mut().zip(heights) {
            point.position.y = height;
        }
    }
}

impl LevelGeneratorModule for TrackRegionGenerator {
    fn name(&self) -> &'static str {
        "TrackRegionGenerator"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) -> Result<()> {
        if level.track.is_empty() {
            return Ok(());
        }
        for params in &self.settings.regions {
            if !level.track_regions.contains_key(&params.region)
                || !level.is_region_available(params.region)
            {
                continue;
            }
            if level.is_region_visited(params.region) && rng.gen::<f32>() >= params.probability {
                continue;
            }

            let [min_length, max_length] = params.length_range;
            let length = rng
                .gen_range(min_length.min(max_length)..=max_length.max(min_length))
                .clamp(1, level.track.len());
            let start = rng.gen_range(0..=level.track.len() - length);
            let [low, high] = params.height_range;
            for point in &mut level.track[start..start + length] {
                if point.position.y < low || point.position.y > high {
                    point.position.y = random_range(rng, low, high);
                }
                point.track_region = params.region;
            }
            Self::smooth_heights(&mut level.track, start, start + length - 1);

            if start == 0 {
                level.player_start_position.y =
                    level.player_start_position.y.max(level.track[0].position.y);
            }
            level.mark_region_in_level(params.region);
            debug!(
                "Track region {:?} on points {}..{}",
                params.region,
                start,
                start + length
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackHeightOverride {
    pub region: RegionKind,
    pub minimum_height: f32,
    /// Relative to the ground, otherwise an absolute height
    #[serde(default = "relative_by_default")]
    pub relative_to_ground: bool,
}

fn relative_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackHeightSettings {
    /// Grid radius searched for the highest terrain around a point
    pub area_radius: usize,
    pub default_min_offset: f32,
    pub overrides: Vec<TrackHeightOverride>,
    pub max_altitude: f32,
}

impl Default for TrackHeightSettings {
    fn default() -> Self {
        Self {
            area_radius: 3,
            default_min_offset: 1.0,
            overrides: vec![TrackHeightOverride {
                region: RegionKind::EnchantedForest,
                minimum_height: 8.0,
                relative_to_ground: true,
            }],
            max_altitude: DEFAULT_MAX_ALTITUDE,
        }
    }
}

/// Lifts track points, bonus spots and the player start above the terrain
/// around them, then clamps them to the reachable altitude.
pub struct TrackTerrainHeight {
    settings: TrackHeightSettings,
}

struct MinimumHeights {
    relative: HashMap<RegionKind, f32>,
    absolute: HashMap<RegionKind, f32>,
    default_offset: f32,
}

impl MinimumHeights {
    fn at(&self, point: &TerrainPoint) -> f32 {
        if let Some(height) = self.absolute.get(&point.region) {
            return *height;
        }
        point.position.y + self.relative.get(&point.region).copied().unwrap_or(self.default_offset)
    }
}

impl TrackTerrainHeight {
    pub fn new(settings: TrackHeightSettings) -> Self {
        Self { settings }
    }

    fn minimum_heights(&self) -> MinimumHeights {
        let mut heights = MinimumHeights {
            relative: HashMap::new(),
            absolute: HashMap::new(),
            default_offset: self.settings.default_min_offset,
        };
        for o in &self.settings.overrides {
            if o.relative_to_ground {
                heights.relative.insert(o.region, o.minimum_height);
            } else {
                heights.absolute.insert(o.region, o.minimum_height);
            }
        }
        heights
    }

    fn neighbourhood_height(&self, level: &LevelRepresentation, heights: &MinimumHeights, coords: GridCoords) -> f32 {
        let radius = self.settings.area_radius;
        let count = level.terrain.point_count();
        let x_range = coords.x.saturating_sub(radius)..=(coords.x + radius).min(count.x - 1);
        let mut highest = heights.at(&level.terrain[(coords.x, coords.z)]);
        for x in x_range {
            for z in coords.z.saturating_sub(radius)..=(coords.z + radius).min(count.z - 1) {
                highest = highest.max(heights.at(&level.terrain[(x, z)]));
            }
        }
        highest
    }

    fn clamp_altitude(&self, height: f32) -> f32 {
        height.clamp(0.0, self.settings.max_altitude.max(0.0))
    }
}

impl LevelGeneratorModule for TrackTerrainHeight {
    fn name(&self) -> &'static str {
        "TrackTerrainHeight"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, _rng: &mut LevelRng) -> Result<()> {
        let heights = self.minimum_heights();

        for i in 0..level.track.len() {
            let ground = self.neighbourhood_height(level, &heights, level.track[i].grid_coords);
            let point = &mut level.track[i];
            point.position.y = self.clamp_altitude(point.position.y.max(ground));
        }

        for i in 0..level.bonuses.len() {
            let spot = &level.bonuses[i];
            let (Some(previous), Some(next)) = (
                level.track.get(spot.previous_hoop_index),
                level.track.get(spot.previous_hoop_index + 1),
            ) else {
                continue;
            };
            let along = lerp(previous.position.y, next.position.y, spot.distance_fraction);
            let ground = self.neighbourhood_height(level, &heights, spot.grid_coords);
            level.bonuses[i].position.y = self.clamp_altitude(along.max(ground));
        }

        let start = level.nearest_grid_point(level.player_start_position);
        let ground = self.neighbourhood_height(level, &heights, start);
        level.player_start_position.y = self.clamp_altitude(level.player_start_position.y.max(ground));
        Ok(())
    }

    fn apply_race_parameters(&mut self, params: &RaceParameters) {
        self.settings.max_altitude = params.max_altitude;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngleCorrectionSettings {
    /// Maximum vertical angle between consecutive elements, in degrees
    pub max_angle: f32,
}

impl Default for AngleCorrectionSettings {
    fn default() -> Self {
        Self { max_angle: 10.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RaceElement {
    Hoop(usize),
    Bonus(usize),
}

/// Lowers or raises track points and bonus spots so the vertical angle
/// between consecutive elements stays within a limit. Starts at the highest
/// element so most corrections move elements up, away from the terrain.
pub struct MaximumAngleCorrection {
    settings: AngleCorrectionSettings,
}

impl MaximumAngleCorrection {
    pub fn new(settings: AngleCorrectionSettings) -> Self {
        Self { settings }
    }

    /// Hoops and bonus spots in the order they are flown through.
    fn race_order(level: &LevelRepresentation) -> Vec<RaceElement> {
        let mut bonuses: Vec<usize> = (0..level.bonuses.len()).collect();
        bonuses.sort_by_key(|i| level.bonuses[*i].previous_hoop_index);
        let mut bonuses = bonuses.into_iter().peekable();

        let mut order = Vec::with_capacity(level.track.len() + level.bonuses.len());
        for hoop in 0..level.track.len() {
            order.push(RaceElement::Hoop(hoop));
            while let Some(bonus) = bonuses.next_if(|b| level.bonuses[*b].previous_hoop_index == hoop) {
                order.push(RaceElement::Bonus(bonus));
            }
        }
        order
    }

    fn position(level: &LevelRepresentation, element: RaceElement) -> Vec3 {
        match element {
            RaceElement::Hoop(i) => level.track[i].position,
            RaceElement::Bonus(i) => level.bonuses[i].position,
        }
    }

    fn set_height(level: &mut LevelRepresentation, element: RaceElement, height: f32) {
        match element {
            RaceElement::Hoop(i) => level.track[i].position.y = height,
            RaceElement::Bonus(i) => level.bonuses[i].position.y = height,
        }
    }

    fn highest(level: &LevelRepresentation, order: &[RaceElement]) -> usize {
        let mut best = 0;
        let mut best_height = f32::MIN;
        // hoops win ties against bonus spots
        for (k, element) in order.iter().enumerate() {
            if matches!(element, RaceElement::Hoop(_)) && Self::position(level, *element).y > best_height {
                best = k;
                best_height = Self::position(level, *element).y;
            }
        }
        for (k, element) in order.iter().enumerate() {
            if matches!(element, RaceElement::Bonus(_)) && Self::position(level, *element).y > best_height {
                best = k;
                best_height = Self::position(level, *element).y;
            }
        }
        best
    }

    fn limited_height(&self, point: Vec3, other: Vec3) -> f32 {
        let max_difference = point.horizontal_distance(&other) * self.settings.max_angle.to_radians().tan();
        let difference = point.y - other.y;
        if difference.abs() < max_difference {
            point.y
        } else {
            other.y + difference.signum() * max_difference
        }
    }

    fn correct(&self, level: &mut LevelRepresentation, order: &[RaceElement], from: usize, to: usize) {
        let corrected = self.limited_height(Self::position(level, order[to]), Self::position(level, order[from]));
        Self::set_height(level, order[to], corrected);
    }
}

impl LevelGeneratorModule for MaximumAngleCorrection {
    fn name(&self) -> &'static str {
        "MaximumAngleCorrection"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, _rng: &mut LevelRng) -> Result<()> {
        if level.track.is_empty() {
            return Ok(());
        }
        let order = Self::race_order(level);
        let start = Self::highest(level, &order);

        for k in (0..start).rev() {
            self.correct(level, &order, k + 1, k);
        }
        for k in start + 1..order.len() {
            self.correct(level, &order, k - 1, k);
        }

        level.player_start_position.y = level.player_start_position.y.max(level.track[0].position.y);
        Ok(())
    }

    fn apply_race_parameters(&mut self, params: &RaceParameters) {
        self.settings.max_angle = params.max_direction_change.x;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackObjectsSettings {
    /// Scale of regular hoops, checkpoints always keep scale 1
    pub hoop_scale: f32,
    /// Distance of the finish line behind the last hoop
    pub finish_line_offset: f32,
}

impl Default for TrackObjectsSettings {
    fn default() -> Self {
        Self {
            hoop_scale: 1.0,
            finish_line_offset: 50.0,
        }
    }
}

/// Spawns a hoop on every track point and places the finish line.
pub struct TrackObjectsPlacement {
    settings: TrackObjectsSettings,
}

impl TrackObjectsPlacement {
    pub fn new(settings: TrackObjectsSettings) -> Self {
        Self { settings }
    }
}

impl LevelGeneratorModule for TrackObjectsPlacement {
    fn name(&self) -> &'static str {
        "TrackObjectsPlacement"
    }

    fn generate(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) -> Result<()> {
        let count = level.track.len();
        let mut direction = Vec3::FORWARD;
        for i in 0..count {
            let current = level.track[i].position;
            let previous = if i > 0 { level.track[i - 1].position } else { current };
            let next = if i + 1 < count { level.track[i + 1].position } else { current };
            direction = (next - previous).with_y(0.0);

            let point = &mut level.track[i];
            point.hoop = Some(SpawnedHoop {
                id: random_uuid(rng),
                scale: if point.is_checkpoint { 1.0 } else { self.settings.hoop_scale },
                is_checkpoint: point.is_checkpoint,
                direction,
            });
        }

        if let Some(last) = level.track.last() {
            if direction.length() < 1e-4 {
                direction = Vec3::FORWARD;
            }
            let position = (last.position + direction.normalize() * self.settings.finish_line_offset).with_y(0.0);
            level.finish = Some(FinishLine { position, direction });
        }
        Ok(())
    }

    fn apply_race_parameters(&mut self, params: &RaceParameters) {
        self.settings.hoop_scale = params.hoop_scale;
    }
}
