//! Contact resolution against the ground.
//!
//! Each contact is solved with an instantaneous impulse at the contact point:
//!
//! 1. Normal component: cancels the approaching velocity, with bounce
//!    (COR) only above a threshold speed so that resting contact is inelastic
//! 2. Tangential component: Coulomb friction, capped at `μ * j_normal`
//!
//! ## Model Assumptions
//!
//! - **Ground as infinite mass**: the ground never moves.
//! - **Sequential impulses**: contacts are visited one after another for a
//!   few passes; each pass only pushes, never pulls.
//!
//! ```text
//! target = e * max(0, -v_n0)   (e = 0 below the threshold speed)
//! j_n    = (target - v_n) / (1/m + n · ((I⁻¹ (r × n)) × r))
//! ```

use nalgebra::{Matrix3, Vector3};

use super::detection::Contact;
use crate::config::WorldConfig;
use crate::integrator::MassProperties;
use crate::types::{constants, BodyState, Vec3};

/// Surface response parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    pub restitution: f64,
    pub restitution_threshold: f64,
    pub friction: f64,
}

impl ContactMaterial {
    pub fn from_world(world: &WorldConfig) -> Self {
        Self {
            restitution: world.restitution,
            restitution_threshold: world.restitution_threshold,
            friction: world.friction,
        }
    }
}

impl Default for ContactMaterial {
    fn default() -> Self {
        Self::from_world(&WorldConfig::default())
    }
}

/// Impulse-based contact resolver.
pub struct ContactResolver {
    pub material: ContactMaterial,
    pub iterations: usize,
}

impl ContactResolver {
    pub fn new(material: ContactMaterial, iterations: usize) -> Self {
        Self {
            material,
            iterations: iterations.max(1),
        }
    }

    /// Solve all contacts of one body, updating its velocities in place.
    pub fn resolve(&self, state: &mut BodyState, props: &MassProperties, contacts: &[Contact]) {
        if contacts.is_empty() {
            return;
        }

        let inv_inertia = props.inverse_inertia_world(&state.orientation);

        // Bounce targets are fixed from the incoming velocities so that later
        // passes aim at the same separation speed instead of compounding it.
        let targets: Vec<f64> = contacts
            .iter()
            .map(|c| {
                let vn = Self::point_velocity(state, c.point).dot(&c.normal);
                if -vn > self.material.restitution_threshold {
                    -vn * self.material.restitution
                } else {
                    0.0
                }
            })
            .collect();

        for _ in 0..self.iterations {
            for (contact, &target) in contacts.iter().zip(&targets) {
                Self::resolve_contact(
                    state,
                    props,
                    &inv_inertia,
                    contact,
                    target,
                    self.material.friction,
                );
            }
        }
    }

    /// Velocity of a world-space point rigidly attached to the body.
    pub fn point_velocity(state: &BodyState, point: Vec3) -> Vec3 {
        let r = point - state.pos;
        state.vel + state.angular_vel.cross(&r)
    }

    fn resolve_contact(
        state: &mut BodyState,
        props: &MassProperties,
        inv_inertia: &Matrix3<f64>,
        contact: &Contact,
        target_vn: f64,
        friction: f64,
    ) {
        let normal = contact.normal;
        let r = contact.point - state.pos;

        let vn = Self::point_velocity(state, contact.point).dot(&normal);
        if vn >= target_vn {
            return;
        }

        // === Normal impulse ===
        let k_normal = Self::effective_inverse_mass(props, inv_inertia, r, normal);
        let jn = (target_vn - vn) / k_normal;
        Self::apply_impulse(state, props, inv_inertia, r, normal * jn);

        // === Friction impulse ===
        let v_point = Self::point_velocity(state, contact.point);
        let v_tangent = v_point - normal * v_point.dot(&normal);
        let tangent_speed = v_tangent.magnitude();
        if tangent_speed < constants::EPSILON {
            return;
        }
        let tangent = v_tangent / tangent_speed;
        let k_tangent = Self::effective_inverse_mass(props, inv_inertia, r, tangent);
        let jt = (tangent_speed / k_tangent).min(friction * jn);
        Self::apply_impulse(state, props, inv_inertia, r, tangent * (-jt));
    }

    fn effective_inverse_mass(
        props: &MassProperties,
        inv_inertia: &Matrix3<f64>,
        r: Vec3,
        direction: Vec3,
    ) -> f64 {
        let r_cross_d = Vector3::from(r.cross(&direction));
        let angular: Vec3 = (inv_inertia * r_cross_d).into();
        props.inverse_mass() + direction.dot(&angular.cross(&r))
    }

    fn apply_impulse(
        state: &mut BodyState,
        props: &MassProperties,
        inv_inertia: &Matrix3<f64>,
        r: Vec3,
        impulse: Vec3,
    ) {
        state.vel += impulse * props.inverse_mass();
        let delta_w: Vec3 = (inv_inertia * Vector3::from(r.cross(&impulse))).into();
        state.angular_vel += delta_w;
    }
}

impl Default for ContactResolver {
    fn default() -> Self {
        Self::new(ContactMaterial::default(), WorldConfig::default().solver_iterations)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ContactDetector;
    use crate::types::CoinDimensions;

    fn dims() -> CoinDimensions {
        CoinDimensions {
            radius: 0.5,
            half_height: 0.1,
        }
    }

    fn props() -> MassProperties {
        MassProperties::cylinder(0.01, dims())
    }

    fn resting_flat(vel: Vec3) -> (BodyState, Vec<Contact>) {
        let mut state = BodyState::at_rest(Vec3::new(0.0, 0.1, 0.0));
        state.vel = vel;
        let contacts = ContactDetector::new(0.0).detect(&state, &dims());
        (state, contacts)
    }

    #[test]
    fn test_fast_impact_bounces() {
        let resolver = ContactResolver::default();
        let (mut state, contacts) = resting_flat(Vec3::new(0.0, -5.0, 0.0));

        resolver.resolve(&mut state, &props(), &contacts);

        assert!(state.vel.y > 0.0, "Should bounce, got vy={}", state.vel.y);
        assert!(state.vel.y < 5.0, "Bounce must lose energy, got vy={}", state.vel.y);
    }

    #[test]
    fn test_slow_impact_is_inelastic() {
        let resolver = ContactResolver::default();
        let (mut state, contacts) = resting_flat(Vec3::new(0.0, -0.04, 0.0));

        resolver.resolve(&mut state, &props(), &contacts);

        assert!(state.vel.y.abs() < 5e-3, "Should stop, got vy={}", state.vel.y);
        assert!(
            state.angular_vel.magnitude() < 5e-2,
            "Flat landing should not spin the coin, got {:?}",
            state.angular_vel
        );
    }

    #[test]
    fn test_friction_slows_sliding() {
        let resolver = ContactResolver::default();
        let (mut state, contacts) = resting_flat(Vec3::new(1.0, -0.5, 0.0));

        resolver.resolve(&mut state, &props(), &contacts);

        assert!(state.vel.x < 1.0, "Friction should slow sliding");
        assert!(state.vel.x >= 0.0, "Friction must not reverse sliding");
    }

    #[test]
    fn test_separating_contact_untouched() {
        let resolver = ContactResolver::default();
        let (mut state, contacts) = resting_flat(Vec3::new(0.0, 2.0, 0.0));
        let before = state;

        resolver.resolve(&mut state, &props(), &contacts);

        assert_eq!(state, before);
    }
}
