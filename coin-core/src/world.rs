//! Built-in rigid-body world.
//!
//! Cylinders fall under gravity onto an infinite ground plane. There are no
//! body-body collisions; grid spacing keeps coins apart.
//!
//! Each substep runs:
//!
//! ```text
//! detect contacts → integrate velocity → resolve contacts
//!                 → integrate position → push out of ground → sleep check
//! ```
//!
//! A body falls asleep after staying below both speed thresholds for the
//! configured delay. Sleeping bodies are frozen; nothing in this world wakes
//! them again.

use std::collections::HashMap;

use log::trace;

use crate::collision::{ContactDetector, ContactMaterial, ContactResolver};
use crate::config::WorldConfig;
use crate::forces::CoinForces;
use crate::integrator::{MassProperties, SymplecticEuler};
use crate::physics::{BodyDesc, BodyHandle, PhysicsHost};
use crate::types::{BodyState, CoinDimensions, Vec3};

#[derive(Debug, Clone)]
struct RigidBody {
    state: BodyState,
    props: MassProperties,
    dims: CoinDimensions,
    sleeping: bool,
    still_time: f64,
}

/// Ground plane plus freely falling coin bodies.
pub struct SimpleWorld {
    config: WorldConfig,
    forces: CoinForces,
    detector: ContactDetector,
    resolver: ContactResolver,
    bodies: HashMap<BodyHandle, RigidBody>,
    next_handle: u64,
    time: f64,
}

impl SimpleWorld {
    /// Create a world whose ground plane passes through `ground`.
    pub fn new(config: WorldConfig, ground: Vec3) -> Self {
        Self {
            forces: CoinForces::from_world(&config),
            detector: ContactDetector::new(ground.y),
            resolver: ContactResolver::new(
                ContactMaterial::from_world(&config),
                config.solver_iterations,
            ),
            config,
            bodies: HashMap::new(),
            next_handle: 0,
            time: 0.0,
        }
    }

    /// Total simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ground_y(&self) -> f64 {
        self.detector.ground_y()
    }

    pub fn body_state(&self, handle: BodyHandle) -> Option<&BodyState> {
        self.bodies.get(&handle).map(|b| &b.state)
    }

    fn step_body(&self, body: &mut RigidBody, dt: f64) {
        if body.sleeping {
            return;
        }

        let contacts = self.detector.detect(&body.state, &body.dims);

        let mut state =
            SymplecticEuler::integrate_velocity(&body.state, &body.props, &self.forces, dt);
        self.resolver.resolve(&mut state, &body.props, &contacts);
        state = SymplecticEuler::integrate_position(&state, dt);

        let penetration = self.detector.penetration(&state, &body.dims);
        if penetration > 0.0 {
            state.pos.y += penetration;
        }

        body.state = state;
        self.update_sleep(body, dt);
    }

    fn update_sleep(&self, body: &mut RigidBody, dt: f64) {
        let slow = body.state.vel.magnitude() < self.config.sleep_linear_threshold
            && body.state.angular_vel.magnitude() < self.config.sleep_angular_threshold;

        if !slow {
            body.still_time = 0.0;
            return;
        }

        body.still_time += dt;
        if body.still_time >= self.config.sleep_delay_secs {
            body.sleeping = true;
            body.state.vel = Vec3::ZERO;
            body.state.angular_vel = Vec3::ZERO;
        }
    }
}

impl PhysicsHost for SimpleWorld {
    fn spawn(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(
            handle,
            RigidBody {
                state: desc.state,
                props: MassProperties::cylinder(desc.mass, desc.dimensions),
                dims: desc.dimensions,
                sleeping: false,
                still_time: 0.0,
            },
        );
        handle
    }

    fn despawn(&mut self, handle: BodyHandle) {
        self.bodies.remove(&handle);
    }

    fn resize(&mut self, handle: BodyHandle, dimensions: CoinDimensions) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.props = MassProperties::cylinder(body.props.mass, dimensions);
            body.dims = dimensions;
        }
    }

    fn step(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        let substeps = (dt / self.config.max_substep_secs).ceil().max(1.0) as usize;
        let h = dt / substeps as f64;

        let mut bodies = std::mem::take(&mut self.bodies);
        for _ in 0..substeps {
            for body in bodies.values_mut() {
                self.step_body(body, h);
            }
        }
        self.bodies = bodies;
        self.time += dt;

        trace!(
            "world step: dt={} substeps={} bodies={}",
            dt,
            substeps,
            self.bodies.len()
        );
    }

    fn is_sleeping(&self, handle: BodyHandle) -> bool {
        self.bodies.get(&handle).is_some_and(|b| b.sleeping)
    }

    fn up_axis(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&handle).map(|b| b.state.up_axis())
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::classify_tilt;
    use crate::types::Orientation;
    use nalgebra::UnitQuaternion;

    fn dims() -> CoinDimensions {
        CoinDimensions {
            radius: 0.5,
            half_height: 0.144,
        }
    }

    fn drop(world: &mut SimpleWorld, state: BodyState) -> BodyHandle {
        world.spawn(BodyDesc {
            state,
            dimensions: dims(),
            mass: 0.01,
        })
    }

    /// Step until the body sleeps or `max_secs` pass; returns the time taken.
    fn settle(world: &mut SimpleWorld, handle: BodyHandle, max_secs: f64) -> Option<f64> {
        let dt = 1.0 / 60.0;
        let mut t = 0.0;
        while t < max_secs {
            world.step(dt);
            t += dt;
            if world.is_sleeping(handle) {
                return Some(t);
            }
        }
        None
    }

    fn orientation_of(world: &SimpleWorld, handle: BodyHandle) -> Orientation {
        let up = world.up_axis(handle).unwrap();
        classify_tilt(Vec3::UP.angle_to_deg(&up))
    }

    #[test]
    fn test_flat_drop_lands_heads() {
        let mut world = SimpleWorld::new(WorldConfig::default(), Vec3::ZERO);
        let coin = drop(&mut world, BodyState::at_rest(Vec3::new(0.0, 1.0, 0.0)));

        let settled = settle(&mut world, coin, 20.0);

        assert!(settled.is_some(), "Flat coin should fall asleep");
        assert_eq!(orientation_of(&world, coin), Orientation::Heads);

        let state = world.body_state(coin).unwrap();
        assert!(
            (state.pos.y - dims().half_height).abs() < 0.02,
            "Coin should rest on the ground, got y={}",
            state.pos.y
        );
    }

    #[test]
    fn test_upside_down_drop_lands_tails() {
        let mut world = SimpleWorld::new(WorldConfig::default(), Vec3::ZERO);
        let mut state = BodyState::at_rest(Vec3::new(0.0, 1.0, 0.0));
        state.orientation = UnitQuaternion::from_euler_angles(std::f64::consts::PI, 0.0, 0.0);
        let coin = drop(&mut world, state);

        assert!(settle(&mut world, coin, 20.0).is_some());
        assert_eq!(orientation_of(&world, coin), Orientation::Tails);
    }

    #[test]
    fn test_tilted_coin_topples_flat() {
        let mut world = SimpleWorld::new(WorldConfig::default(), Vec3::ZERO);
        let mut state = BodyState::at_rest(Vec3::new(0.0, 1.0, 0.0));
        state.orientation = UnitQuaternion::from_euler_angles(1.0, 0.0, 0.0);
        let coin = drop(&mut world, state);

        assert!(settle(&mut world, coin, 30.0).is_some());
        let up = world.up_axis(coin).unwrap();
        assert!(
            up.y.abs() > 0.9,
            "Tilted coin should end up lying on a face, up axis {:?}",
            up
        );
    }

    #[test]
    fn test_coin_never_sinks_through_ground() {
        let mut world = SimpleWorld::new(WorldConfig::default(), Vec3::new(0.0, 2.0, 0.0));
        let mut state = BodyState::at_rest(Vec3::new(0.0, 12.0, 0.0));
        state.vel = Vec3::new(3.0, 0.0, -2.0);
        state.angular_vel = Vec3::new(4.0, 1.0, 7.0);
        let coin = drop(&mut world, state);

        for _ in 0..600 {
            world.step(1.0 / 60.0);
            let s = *world.body_state(coin).unwrap();
            let lowest = ContactDetector::lowest_point(&s, &dims());
            assert!(lowest.y > 2.0 - 1e-6, "Coin sank to y={}", lowest.y);
        }
    }

    #[test]
    fn test_sleeping_body_stays_put() {
        let mut world = SimpleWorld::new(WorldConfig::default(), Vec3::ZERO);
        let coin = drop(&mut world, BodyState::at_rest(Vec3::new(0.0, 0.5, 0.0)));
        assert!(settle(&mut world, coin, 20.0).is_some());

        let before = *world.body_state(coin).unwrap();
        for _ in 0..120 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(*world.body_state(coin).unwrap(), before);
        assert!(world.is_sleeping(coin));
    }

    #[test]
    fn test_long_step_is_subdivided() {
        let mut world = SimpleWorld::new(WorldConfig::default(), Vec3::ZERO);
        let coin = drop(&mut world, BodyState::at_rest(Vec3::new(0.0, 5.0, 0.0)));

        // A single 2 s step must not tunnel through the ground
        world.step(2.0);

        let state = world.body_state(coin).unwrap();
        assert!(state.pos.y > 0.0);
        assert!((world.time() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_despawn_and_resize() {
        let mut world = SimpleWorld::new(WorldConfig::default(), Vec3::ZERO);
        let a = drop(&mut world, BodyState::at_rest(Vec3::new(0.0, 1.0, 0.0)));
        let b = drop(&mut world, BodyState::at_rest(Vec3::new(5.0, 1.0, 0.0)));
        assert_ne!(a, b);
        assert_eq!(world.body_count(), 2);

        world.resize(
            b,
            CoinDimensions {
                radius: 0.5,
                half_height: 0.09,
            },
        );
        world.despawn(a);

        assert_eq!(world.body_count(), 1);
        assert!(!world.is_sleeping(a));
        assert!(world.up_axis(a).is_none());
        assert!(world.up_axis(b).is_some());
    }
}
