//! Numerical integration for rigid bodies.
//!
//! Bodies are advanced with semi-implicit (symplectic) Euler, split into a
//! velocity phase and a position phase so that contact impulses can be
//! applied in between:
//!
//! ```text
//! 1. v  += a(x, v) * dt          (integrate_velocity)
//!    ω  += α(x, ω) * dt
//! 2. contact impulses adjust v, ω
//! 3. x  += v * dt                (integrate_position)
//!    q   = exp(ω * dt) * q
//! ```
//!
//! Using the updated velocity for the position update keeps resting contact
//! stable: gravity's velocity gain is cancelled by the contact before the
//! body moves.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::types::{BodyState, CoinDimensions, Vec3};

/// Mass and principal moments of inertia of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub mass: f64,
    /// Principal moments in the body frame (x, y, z)
    pub inertia: Vec3,
}

impl MassProperties {
    /// Solid cylinder whose axis is the body's local Y.
    pub fn cylinder(mass: f64, dims: CoinDimensions) -> Self {
        let r2 = dims.radius * dims.radius;
        let height = 2.0 * dims.half_height;
        let axial = 0.5 * mass * r2;
        let transverse = mass * (3.0 * r2 + height * height) / 12.0;
        Self {
            mass,
            inertia: Vec3::new(transverse, axial, transverse),
        }
    }

    pub fn inverse_mass(&self) -> f64 {
        1.0 / self.mass
    }

    /// World-space inverse inertia tensor for the given orientation.
    pub fn inverse_inertia_world(&self, orientation: &UnitQuaternion<f64>) -> Matrix3<f64> {
        let rotation = orientation.to_rotation_matrix();
        let inv_body = Matrix3::from_diagonal(&Vector3::new(
            1.0 / self.inertia.x,
            1.0 / self.inertia.y,
            1.0 / self.inertia.z,
        ));
        rotation.matrix() * inv_body * rotation.matrix().transpose()
    }
}

/// Trait for computing accelerations on a body.
///
/// Implementations provide the physics model (gravity, damping, ...).
pub trait ForceModel {
    /// Compute linear acceleration given current state.
    fn linear_acceleration(&self, state: &BodyState, props: &MassProperties) -> Vec3;

    /// Compute angular acceleration. Default: none.
    fn angular_acceleration(&self, _state: &BodyState, _props: &MassProperties) -> Vec3 {
        Vec3::ZERO
    }
}

/// Semi-implicit Euler integrator.
pub struct SymplecticEuler;

impl SymplecticEuler {
    /// Velocity phase: apply accelerations over `dt`.
    pub fn integrate_velocity<F: ForceModel>(
        state: &BodyState,
        props: &MassProperties,
        forces: &F,
        dt: f64,
    ) -> BodyState {
        let acceleration = forces.linear_acceleration(state, props);
        let angular_acceleration = forces.angular_acceleration(state, props);

        BodyState {
            vel: state.vel + acceleration * dt,
            angular_vel: state.angular_vel + angular_acceleration * dt,
            ..*state
        }
    }

    /// Position phase: move and rotate with the current velocities.
    pub fn integrate_position(state: &BodyState, dt: f64) -> BodyState {
        let spin = Vector3::from(state.angular_vel) * dt;
        let orientation = UnitQuaternion::from_scaled_axis(spin) * state.orientation;

        BodyState {
            pos: state.pos + state.vel * dt,
            orientation,
            ..*state
        }
    }

    /// Both phases without anything in between.
    pub fn step<F: ForceModel>(
        state: &BodyState,
        props: &MassProperties,
        forces: &F,
        dt: f64,
    ) -> BodyState {
        let moved = Self::integrate_velocity(state, props, forces, dt);
        Self::integrate_position(&moved, dt)
    }
}

// =============================================================================
// Tests
// =============================================================================
