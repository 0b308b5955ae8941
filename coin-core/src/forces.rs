//! Forces acting on a falling coin.
//!
//! This module implements the `ForceModel` trait for the coin world:
//!
//! - **Gravity**: Constant downward acceleration
//! - **Damping**: Linear and angular velocity decay standing in for air
//!   resistance and rolling resistance

use crate::config::WorldConfig;
use crate::integrator::{ForceModel, MassProperties};
use crate::types::{constants, BodyState, Vec3};

/// Force model for coins in the built-in world.
pub struct CoinForces {
    /// Gravity vector (default: -9.81 in Y)
    pub gravity: Vec3,

    /// Velocity decay rates (1/s)
    pub linear_damping: f64,
    pub angular_damping: f64,

    /// Enable/disable individual forces (useful for testing)
    pub enable_gravity: bool,
    pub enable_damping: bool,
}

impl Default for CoinForces {
    fn default() -> Self {
        Self::from_world(&WorldConfig::default())
    }
}

impl CoinForces {
    pub fn from_world(world: &WorldConfig) -> Self {
        Self {
            gravity: Vec3::new(0.0, -world.gravity, 0.0),
            linear_damping: world.linear_damping,
            angular_damping: world.angular_damping,
            enable_gravity: true,
            enable_damping: true,
        }
    }

    /// Create a force model with only gravity (for testing).
    pub fn gravity_only() -> Self {
        Self {
            enable_damping: false,
            ..Self::default()
        }
    }
}

impl ForceModel for CoinForces {
    fn linear_acceleration(&self, state: &BodyState, _props: &MassProperties) -> Vec3 {
        let mut acc = Vec3::ZERO;

        if self.enable_gravity {
            acc += self.gravity;
        }

        if self.enable_damping && state.vel.magnitude_squared() > constants::EPSILON {
            acc -= state.vel * self.linear_damping;
        }

        acc
    }

    fn angular_acceleration(&self, state: &BodyState, _props: &MassProperties) -> Vec3 {
        if self.enable_damping {
            state.angular_vel * (-self.angular_damping)
        } else {
            Vec3::ZERO
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::SymplecticEuler;
    use crate::types::CoinDimensions;

    fn props() -> MassProperties {
        MassProperties::cylinder(
            0.01,
            CoinDimensions {
                radius: 0.5,
                half_height: 0.1,
            },
        )
    }

    #[test]
    fn test_gravity_only() {
        let forces = CoinForces::gravity_only();
        let state = BodyState::at_rest(Vec3::ZERO);

        let acc = forces.linear_acceleration(&state, &props());

        assert!((acc.x).abs() < constants::EPSILON);
        assert!((acc.y + constants::GRAVITY).abs() < constants::EPSILON);
        assert!((acc.z).abs() < constants::EPSILON);
    }

    #[test]
    fn test_damping_opposes_motion() {
        let forces = CoinForces {
            enable_gravity: false,
            ..CoinForces::default()
        };
        let mut state = BodyState::at_rest(Vec3::ZERO);
        state.vel = Vec3::new(10.0, 0.0, 0.0);
        state.angular_vel = Vec3::new(0.0, 0.0, 5.0);

        let acc = forces.linear_acceleration(&state, &props());
        let alpha = forces.angular_acceleration(&state, &props());

        assert!(acc.x < 0.0, "Damping should oppose motion, got ax={}", acc.x);
        assert!(alpha.z < 0.0, "Damping should oppose spin, got αz={}", alpha.z);
    }

    #[test]
    fn test_spin_decays_over_time() {
        let forces = CoinForces {
            enable_gravity: false,
            ..CoinForces::default()
        };
        let mut state = BodyState::at_rest(Vec3::ZERO);
        state.angular_vel = Vec3::new(20.0, 0.0, 0.0);

        for _ in 0..1000 {
            state = SymplecticEuler::step(&state, &props(), &forces, 0.01);
        }

        assert!(
            state.angular_vel.magnitude() < 20.0 * 0.1,
            "Spin should decay, got {}",
            state.angular_vel.magnitude()
        );
    }

    #[test]
    fn test_from_world_uses_configured_gravity() {
        let world = WorldConfig {
            gravity: 1.62,
            ..WorldConfig::default()
        };
        let forces = CoinForces::from_world(&world);
        assert!((forces.gravity.y + 1.62).abs() < 1e-12);
    }
}
