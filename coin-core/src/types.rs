//! Core types for the coin drop simulation.
//!
//! All units are SI-like simulation units:
//! - Position: meters (m)
//! - Velocity: meters per second (m/s)
//! - Angular velocity: radians per second (rad/s)
//! - Mass: kilograms (kg)
//! - Angles exposed to users: degrees

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Vec3 - 3D Vector
// =============================================================================

/// A 3D vector used for positions, velocities and axes.
///
/// Coordinate system:
/// - X: horizontal, along the grid rows
/// - Y: vertical (positive upward, opposite to gravity)
/// - Z: horizontal, along the grid columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// World "up", the direction opposite to gravity.
    pub const UP: Vec3 = Vec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared magnitude (avoids sqrt for comparisons)
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Magnitude (length) of the vector
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Returns a unit vector in the same direction, or zero if magnitude is zero
    pub fn normalized(&self) -> Self {
        let mag = self.magnitude();
        if mag < constants::EPSILON {
            Self::ZERO
        } else {
            *self / mag
        }
    }

    /// Dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Unsigned angle to another vector in degrees, in `[0, 180]`.
    ///
    /// Returns 0 when either vector is (nearly) zero.
    pub fn angle_to_deg(&self, other: &Self) -> f64 {
        let denom = self.magnitude() * other.magnitude();
        if denom < constants::EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Same vector with the vertical component zeroed.
    pub fn horizontal(&self) -> Self {
        Self::new(self.x, 0.0, self.z)
    }
}

// Operator overloads for Vec3
impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
        self.z -= other.z;
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Vector3<f64>> for Vec3 {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for Vector3<f64> {
    fn from(v: Vec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

// =============================================================================
// Body State
// =============================================================================

/// Complete kinematic state of a rigid body at a given instant.
///
/// The orientation maps body-local axes to world axes; the coin's face normal
/// is local +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub pos: Vec3,
    pub vel: Vec3,
    pub orientation: UnitQuaternion<f64>,
    pub angular_vel: Vec3,
}

impl BodyState {
    pub fn new(
        pos: Vec3,
        vel: Vec3,
        orientation: UnitQuaternion<f64>,
        angular_vel: Vec3,
    ) -> Self {
        Self {
            pos,
            vel,
            orientation,
            angular_vel,
        }
    }

    /// Body at rest at a given position, upright.
    pub fn at_rest(pos: Vec3) -> Self {
        Self {
            pos,
            vel: Vec3::ZERO,
            orientation: UnitQuaternion::identity(),
            angular_vel: Vec3::ZERO,
        }
    }

    /// Local +Y axis expressed in world space.
    pub fn up_axis(&self) -> Vec3 {
        (self.orientation * Vector3::y()).into()
    }

    /// Transform a body-local point into world space.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.pos + (self.orientation * Vector3::from(local)).into()
    }
}

impl Default for BodyState {
    fn default() -> Self {
        Self::at_rest(Vec3::ZERO)
    }
}

// =============================================================================
// Coin Properties
// =============================================================================

/// Physical description of the coin every trial spawns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinProperties {
    /// Horizontal scale of the unit cylinder.
    pub radius: f64,
    /// Normalized thickness control, clamped to `[0, 1]`.
    pub shape_parameter: f64,
    /// Body mass in kg.
    pub mass: f64,
}

impl CoinProperties {
    /// A coin at the thick end of the range.
    pub fn thick() -> Self {
        Self {
            radius: 1.0,
            shape_parameter: 0.0,
            mass: 0.01,
        }
    }
}

impl Default for CoinProperties {
    fn default() -> Self {
        Self::thick()
    }
}

/// Physical dimensions of a coin body as handed to the physics host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinDimensions {
    /// Radius of the circular faces.
    pub radius: f64,
    /// Half of the distance between the two faces.
    pub half_height: f64,
}

// =============================================================================
// Orientation
// =============================================================================

/// Classification of a coin's face-up direction relative to gravity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Heads,
    Tails,
    Side,
    Undetermined,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Heads,
        Orientation::Tails,
        Orientation::Side,
        Orientation::Undetermined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Heads => "heads",
            Orientation::Tails => "tails",
            Orientation::Side => "side",
            Orientation::Undetermined => "undetermined",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a coin is still moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestState {
    #[default]
    Moving,
    AtRest,
}

// =============================================================================
// Physical Constants
// =============================================================================

/// Physical and geometric constants used in the simulation.
pub mod constants {
    /// Gravitational acceleration (m/s²)
    pub const GRAVITY: f64 = 9.81;

    /// Small value for floating-point comparisons
    pub const EPSILON: f64 = 1e-10;

    /// Tolerance around 0°, 90° and 180° for orientation bands (degrees)
    pub const ORIENTATION_TOLERANCE_DEG: f64 = 10.0;

    /// Diameter-to-height ratio bounds of the coin shape: √3 and 2√2
    pub const MIN_SHAPE_RATIO: f64 = 1.732_050_807_568_877_2;
    pub const MAX_SHAPE_RATIO: f64 = 2.828_427_124_746_190_3;

    /// Vertical scale of the unit cylinder relative to its horizontal scale
    pub const CYLINDER_VERTICAL_MULTIPLIER: f64 = 0.25;

    /// Unit cylinder: radius 0.5 and half-height 1 at scale 1
    pub const UNIT_CYLINDER_RADIUS: f64 = 0.5;
    pub const UNIT_CYLINDER_HALF_HEIGHT: f64 = 1.0;
}

// =============================================================================
// Tests
// =============================================================================
