//! Cylinder versus ground-plane contact detection.

use crate::types::{BodyState, CoinDimensions, Vec3};

/// Points closer to the ground than this count as touching (m).
pub const CONTACT_MARGIN: f64 = 2e-3;

/// A single contact between a body and the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// World-space contact point on the body
    pub point: Vec3,
    /// Ground normal
    pub normal: Vec3,
    /// Depth below the ground plane; negative while within the margin
    pub penetration: f64,
}

/// Configuration for contact detection.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Samples per rim circle; rounded up to an even number
    pub samples_per_rim: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            samples_per_rim: 16,
        }
    }
}

/// Ground-plane contact detector.
pub struct ContactDetector {
    pub config: DetectionConfig,
    ground_y: f64,
}

impl ContactDetector {
    pub fn new(ground_y: f64) -> Self {
        Self {
            config: DetectionConfig::default(),
            ground_y,
        }
    }

    pub fn ground_y(&self) -> f64 {
        self.ground_y
    }

    /// Lowest point of the cylinder in world space.
    pub fn lowest_point(state: &BodyState, dims: &CoinDimensions) -> Vec3 {
        let axis = state.up_axis();
        let down = Vec3::new(0.0, -1.0, 0.0);
        let axial = if axis.dot(&down) >= 0.0 {
            dims.half_height
        } else {
            -dims.half_height
        };
        let radial = down - axis * down.dot(&axis);
        state.pos + axis * axial + radial.normalized() * dims.radius
    }

    /// How far the cylinder reaches below the ground (negative when above).
    pub fn penetration(&self, state: &BodyState, dims: &CoinDimensions) -> f64 {
        self.ground_y - Self::lowest_point(state, dims).y
    }

    /// All rim points touching or below the ground.
    ///
    /// Exact lowest points come first, then samples in opposite pairs so
    /// that a sequential solver treats a flat coin symmetrically.
    pub fn detect(&self, state: &BodyState, dims: &CoinDimensions) -> Vec<Contact> {
        let mut contacts = Vec::new();
        let axis = state.up_axis();
        let down = Vec3::new(0.0, -1.0, 0.0);
        let radial = down - axis * down.dot(&axis);

        for side in [1.0, -1.0] {
            let rim_center = state.pos + axis * (side * dims.half_height);
            if radial.magnitude() > 1e-9 {
                self.push_if_touching(&mut contacts, rim_center + radial.normalized() * dims.radius);
            }
        }

        let half = self.config.samples_per_rim.div_ceil(2).max(1);
        let step = std::f64::consts::PI / half as f64;
        for side in [1.0, -1.0] {
            let local_y = side * dims.half_height;
            for i in 0..half {
                let theta = i as f64 * step;
                for phase in [0.0, std::f64::consts::PI] {
                    let (s, c) = (theta + phase).sin_cos();
                    let local = Vec3::new(dims.radius * c, local_y, dims.radius * s);
                    self.push_if_touching(&mut contacts, state.to_world(local));
                }
            }
        }

        contacts
    }

    fn push_if_touching(&self, contacts: &mut Vec<Contact>, point: Vec3) {
        let penetration = self.ground_y - point.y;
        if penetration > -CONTACT_MARGIN {
            contacts.push(Contact {
                point,
                normal: Vec3::new(0.0, 1.0, 0.0),
                penetration,
            });
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
