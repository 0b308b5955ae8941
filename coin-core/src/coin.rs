//! A single simulated coin.
//!
//! The coin owns its geometric parameters and its rest state. Motion itself
//! belongs to the physics host; the coin only reads the host's sleep signal
//! and up axis through the manager.
//!
//! ## Shape
//!
//! The coin is a unit cylinder scaled by `(radius, thickness, radius)`, with
//!
//! ```text
//! thickness = 0.25 / lerp(√3, 2√2, shape_parameter)
//! ```
//!
//! so `shape_parameter = 0` is the thickest coin and `1` the thinnest.
//!
//! ## Orientation bands
//!
//! ```text
//!   tilt:   0°      10°        80°   90°  100°        170°    180°
//!           |Heads  |  Undet.   | Side    |   Undet.   | Tails  |
//! ```

use crate::physics::BodyHandle;
use crate::types::{constants, CoinDimensions, CoinProperties, Orientation, RestState, Vec3};

/// Index of a coin within one trial.
pub type CoinId = usize;

/// Linear interpolation, `t` is not clamped.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Thickness scale for a shape parameter, clamping it to `[0, 1]` first.
pub fn thickness_for(shape_parameter: f64) -> f64 {
    let t = shape_parameter.clamp(0.0, 1.0);
    constants::CYLINDER_VERTICAL_MULTIPLIER
        / lerp(constants::MIN_SHAPE_RATIO, constants::MAX_SHAPE_RATIO, t)
}

/// Physical dimensions of a freshly configured coin.
pub fn dimensions_for(props: &CoinProperties) -> CoinDimensions {
    CoinDimensions {
        radius: props.radius * constants::UNIT_CYLINDER_RADIUS,
        half_height: thickness_for(props.shape_parameter) * constants::UNIT_CYLINDER_HALF_HEIGHT,
    }
}

/// Classify a tilt angle (degrees between world up and the coin's face normal).
pub fn classify_tilt(angle_deg: f64) -> Orientation {
    let tol = constants::ORIENTATION_TOLERANCE_DEG;
    if angle_deg.abs() < tol {
        Orientation::Heads
    } else if (angle_deg - 180.0).abs() < tol {
        Orientation::Tails
    } else if (angle_deg - 90.0).abs() < tol {
        Orientation::Side
    } else {
        Orientation::Undetermined
    }
}

/// One coin of a trial.
#[derive(Debug, Clone)]
pub struct Coin {
    id: CoinId,
    body: BodyHandle,
    radius: f64,
    shape_parameter: f64,
    thickness: f64,
    rest_state: RestState,
}

impl Coin {
    pub fn new(id: CoinId, body: BodyHandle, props: &CoinProperties) -> Self {
        let mut coin = Self {
            id,
            body,
            radius: props.radius,
            shape_parameter: props.shape_parameter,
            thickness: 0.0,
            rest_state: RestState::Moving,
        };
        coin.update_shape();
        coin
    }

    pub fn id(&self) -> CoinId {
        self.id
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn shape_parameter(&self) -> f64 {
        self.shape_parameter
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn rest_state(&self) -> RestState {
        self.rest_state
    }

    pub fn is_at_rest(&self) -> bool {
        self.rest_state == RestState::AtRest
    }

    /// Set the shape parameter; takes effect on the next [`Coin::update_shape`].
    pub fn set_shape_parameter(&mut self, shape_parameter: f64) {
        self.shape_parameter = shape_parameter;
    }

    /// Clamp the shape parameter and recompute the thickness.
    ///
    /// Returns `true` when the thickness changed.
    pub fn update_shape(&mut self) -> bool {
        self.shape_parameter = self.shape_parameter.clamp(0.0, 1.0);
        let thickness = thickness_for(self.shape_parameter);
        let changed = thickness != self.thickness;
        self.thickness = thickness;
        changed
    }

    /// Physical dimensions of the scaled unit cylinder.
    pub fn dimensions(&self) -> CoinDimensions {
        CoinDimensions {
            radius: self.radius * constants::UNIT_CYLINDER_RADIUS,
            half_height: self.thickness * constants::UNIT_CYLINDER_HALF_HEIGHT,
        }
    }

    /// Feed the host's sleep signal for this tick.
    ///
    /// Returns `true` exactly once, on the Moving → AtRest transition.
    pub fn poll_rest_state(&mut self, sleeping: bool) -> bool {
        if self.rest_state == RestState::AtRest || !sleeping {
            return false;
        }
        self.rest_state = RestState::AtRest;
        true
    }

    /// Classify the orientation from the coin's up axis in world space.
    ///
    /// Only authoritative once the coin is at rest.
    pub fn determine_orientation(&self, up_axis: Vec3) -> Orientation {
        classify_tilt(Vec3::UP.angle_to_deg(&up_axis))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(shape_parameter: f64) -> Coin {
        let props = CoinProperties {
            shape_parameter,
            ..CoinProperties::default()
        };
        Coin::new(0, BodyHandle(0), &props)
    }

    #[test]
    fn test_thickness_positive_and_non_increasing() {
        let mut previous = f64::INFINITY;
        for i in 0..=100 {
            let t = i as f64 / 100.0;
            let thickness = thickness_for(t);
            assert!(thickness > 0.0, "thickness must be positive at {}", t);
            assert!(
                thickness <= previous,
                "thickness increased at {}: {} > {}",
                t,
                thickness,
                previous
            );
            previous = thickness;
        }
    }

    #[test]
    fn test_thickness_bounds() {
        assert!((thickness_for(0.0) - 0.25 / 3f64.sqrt()).abs() < 1e-12);
        assert!((thickness_for(1.0) - 0.25 / (2.0 * 2f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_update_shape_clamps() {
        let mut c = coin(1.7);
        assert_eq!(c.shape_parameter(), 1.0);
        assert!((c.thickness() - thickness_for(1.0)).abs() < 1e-12);

        c.set_shape_parameter(-3.0);
        assert!(c.update_shape());
        assert_eq!(c.shape_parameter(), 0.0);

        // Idempotent once settled
        assert!(!c.update_shape());
    }

    #[test]
    fn test_dimensions_scale_unit_cylinder() {
        let c = coin(0.0);
        let dims = c.dimensions();
        assert!((dims.radius - 0.5).abs() < 1e-12);
        assert!((dims.half_height - thickness_for(0.0)).abs() < 1e-12);

        let props = CoinProperties {
            shape_parameter: 0.0,
            ..CoinProperties::default()
        };
        assert_eq!(dimensions_for(&props), dims);
    }

    #[test]
    fn test_classify_centres() {
        assert_eq!(classify_tilt(0.0), Orientation::Heads);
        assert_eq!(classify_tilt(180.0), Orientation::Tails);
        assert_eq!(classify_tilt(90.0), Orientation::Side);
        assert_eq!(classify_tilt(45.0), Orientation::Undetermined);
        assert_eq!(classify_tilt(135.0), Orientation::Undetermined);
    }

    #[test]
    fn test_classify_band_edges_are_strict() {
        assert_eq!(classify_tilt(9.9), Orientation::Heads);
        assert_eq!(classify_tilt(10.0), Orientation::Undetermined);

        assert_eq!(classify_tilt(170.1), Orientation::Tails);
        assert_eq!(classify_tilt(170.0), Orientation::Undetermined);

        assert_eq!(classify_tilt(80.1), Orientation::Side);
        assert_eq!(classify_tilt(99.9), Orientation::Side);
        assert_eq!(classify_tilt(80.0), Orientation::Undetermined);
        assert_eq!(classify_tilt(100.0), Orientation::Undetermined);
    }

    #[test]
    fn test_rest_transition_fires_once() {
        let mut c = coin(0.0);
        assert!(!c.poll_rest_state(false));
        assert_eq!(c.rest_state(), RestState::Moving);

        assert!(c.poll_rest_state(true));
        assert!(c.is_at_rest());

        // Irreversible and silent afterwards
        assert!(!c.poll_rest_state(true));
        assert!(!c.poll_rest_state(false));
        assert!(c.is_at_rest());
    }

    #[test]
    fn test_determine_orientation_from_axis() {
        let c = coin(0.5);
        assert_eq!(c.determine_orientation(Vec3::UP), Orientation::Heads);
        assert_eq!(c.determine_orientation(-Vec3::UP), Orientation::Tails);
        assert_eq!(
            c.determine_orientation(Vec3::new(1.0, 0.0, 0.0)),
            Orientation::Side
        );
        assert_eq!(
            c.determine_orientation(Vec3::new(1.0, 1.0, 0.0)),
            Orientation::Undetermined
        );
    }
}
