//! Small vector and color types shared by the terrain model and the mesher.
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Component-wise linear interpolation, `t` is not clamped.
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2::new(lerp(self.x, other.x, t), lerp(self.y, other.y, t))
    }
}

/// World-space position. Y is up, the terrain grid spans X and Z.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);
    pub const BACK: Vec3 = Vec3::new(0.0, 0.0, -1.0);
    pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const RIGHT: Vec3 = Vec3::new(1.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn with_y(self, y: f32) -> Self {
        Self { y, ..self }
    }

    pub fn cross(&self, other: &Vec3) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Distance in the XZ plane.
    pub fn horizontal_distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn normalize(&self) -> Vec3 {
        let length = self.length();
        if length > 0.0001 {
            Vec3::new(self.x / length, self.y / length, self.z / length)
        } else {
            Vec3::UP
        }
    }

    /// Rotates around the Y axis by `degrees`, positive angles turn right
    /// (from +Z towards +X).
    pub fn rotate_y(self, degrees: f32) -> Vec3 {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Vec3::new(
            self.x * cos + self.z * sin,
            self.y,
            -self.x * sin + self.z * cos,
        )
    }

    pub fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        self + (other - self) * t
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Linear RGBA color, components in 0-1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Maps `value` from `[from_min, from_max]` onto `[to_min, to_max]`.
/// A degenerate source range maps everything onto `to_min`.
pub fn remap(value: f32, from_min: f32, from_max: f32, to_min: f32, to_max: f32) -> f32 {
    let span = from_max - from_min;
    if span.abs() < f32::EPSILON {
        return to_min;
    }
    to_min + (value - from_min) / span * (to_max - to_min)
}

/// Intersection of the line through `a`, `b` with the line through `c`, `d`,
/// projected onto the XZ plane. `None` for parallel lines, `y` is always 0.
pub fn line_intersection_xz(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Option<Vec3> {
    let (x1, z1, x2, z2) = (a.x as f64, a.z as f64, b.x as f64, b.z as f64);
    let (x3, z3, x4, z4) = (c.x as f64, c.z as f64, d.x as f64, d.z as f64);
    let denominator = (x1 - x2) * (z3 - z4) - (z1 - z2) * (x3 - x4);
    if denominator.abs() < 1e-6 {
        return None;
    }
    let first = x1 * z2 - z1 * x2;
    let second = x3 * z4 - z3 * x4;
    Some(Vec3::new(
        ((first * (x3 - x4) - (x1 - x2) * second) / denominator) as f32,
        0.0,
        ((first * (z3 - z4) - (z1 - z2) * second) / denominator) as f32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_y_quarter_turn() {
        let right = Vec3::FORWARD.rotate_y(90.0);
        assert!((right.x - 1.0).abs() < 1e-5);
        assert!(right.z.abs() < 1e-5);
    }

    #[test]
    fn test_remap_range() {
        assert_eq!(remap(5.0, 0.0, 10.0, -5.0, 25.0), 10.0);
        assert_eq!(remap(3.0, 2.0, 2.0, 1.0, 9.0), 1.0);
    }

    #[test]
    fn test_line_intersection_xz() {
        let hit = line_intersection_xz(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(10.0, 5.0, 10.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, 0.0),
        );
        assert_eq!(hit, Some(Vec3::new(5.0, 0.0, 5.0)));

        let parallel =
            line_intersection_xz(Vec3::ZERO, Vec3::FORWARD, Vec3::RIGHT, Vec3::RIGHT + Vec3::FORWARD);
        assert_eq!(parallel, None);
    }

    #[test]
    fn test_vec2_lerp() {
        let v = Vec2::new(5.0, 20.0).lerp(Vec2::new(20.0, 45.0), 0.5);
        assert_eq!(v, Vec2::new(12.5, 32.5));
    }
}
