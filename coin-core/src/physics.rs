//! The physics host seen by the experiment.
//!
//! The experiment never integrates motion itself. It spawns bodies, steps the
//! host once per tick, and reads back two things per body: whether the host
//! considers it asleep, and which way its local up axis points.
//!
//! Two hosts ship with the crate:
//! - [`SimpleWorld`](crate::world::SimpleWorld): cylinders falling onto a ground plane
//! - [`ScriptedHost`]: bodies that fall asleep at scripted times with scripted
//!   orientations, for driving the lifecycle deterministically

use std::collections::{HashMap, VecDeque};

use crate::types::{BodyState, CoinDimensions, Vec3};

/// Opaque handle to a body owned by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

/// Everything a host needs to create a coin body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub state: BodyState,
    pub dimensions: CoinDimensions,
    pub mass: f64,
}

/// Contract between the experiment and a rigid-body engine.
pub trait PhysicsHost {
    /// Create a body and return its handle.
    fn spawn(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Destroy a body. Unknown handles are ignored.
    fn despawn(&mut self, handle: BodyHandle);

    /// Change a body's collision dimensions.
    fn resize(&mut self, handle: BodyHandle, dimensions: CoinDimensions);

    /// Advance every body by `dt` seconds.
    fn step(&mut self, dt: f64);

    /// Whether the host considers the body at rest. False for unknown handles.
    fn is_sleeping(&self, handle: BodyHandle) -> bool;

    /// Local +Y of the body in world space, if the body exists.
    fn up_axis(&self, handle: BodyHandle) -> Option<Vec3>;

    /// Number of live bodies.
    fn body_count(&self) -> usize;
}

// =============================================================================
// Scripted host
// =============================================================================

/// How a scripted body behaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedOutcome {
    /// Body age at which it falls asleep; `None` never sleeps
    pub settle_after_secs: Option<f64>,
    /// Up axis reported for the body
    pub up_axis: Vec3,
}

impl ScriptedOutcome {
    pub fn settles(after_secs: f64, up_axis: Vec3) -> Self {
        Self {
            settle_after_secs: Some(after_secs),
            up_axis,
        }
    }

    pub fn never_settles() -> Self {
        Self {
            settle_after_secs: None,
            up_axis: Vec3::UP,
        }
    }
}

#[derive(Debug, Clone)]
struct ScriptedBody {
    outcome: ScriptedOutcome,
    age: f64,
    dimensions: CoinDimensions,
}

/// A host whose bodies follow a script instead of physics.
///
/// Spawned bodies take outcomes from the queue in spawn order; once the queue
/// is empty every further body gets the fallback outcome.
#[derive(Debug, Clone)]
pub struct ScriptedHost {
    queue: VecDeque<ScriptedOutcome>,
    fallback: ScriptedOutcome,
    bodies: HashMap<BodyHandle, ScriptedBody>,
    next_handle: u64,
    spawn_log: Vec<BodyDesc>,
    resize_count: usize,
}

impl ScriptedHost {
    pub fn new(fallback: ScriptedOutcome) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback,
            bodies: HashMap::new(),
            next_handle: 0,
            spawn_log: Vec::new(),
            resize_count: 0,
        }
    }

    /// Every body settles on the first step, heads up.
    pub fn settling_heads() -> Self {
        Self::new(ScriptedOutcome::settles(0.0, Vec3::UP))
    }

    /// Queue outcomes for the next bodies to be spawned.
    pub fn push_outcomes<I: IntoIterator<Item = ScriptedOutcome>>(&mut self, outcomes: I) {
        self.queue.extend(outcomes);
    }

    /// Every body ever spawned, in spawn order.
    pub fn spawn_log(&self) -> &[BodyDesc] {
        &self.spawn_log
    }

    pub fn resize_count(&self) -> usize {
        self.resize_count
    }

    pub fn dimensions(&self, handle: BodyHandle) -> Option<CoinDimensions> {
        self.bodies.get(&handle).map(|b| b.dimensions)
    }
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::settling_heads()
    }
}

impl PhysicsHost for ScriptedHost {
    fn spawn(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        let outcome = self.queue.pop_front().unwrap_or(self.fallback);
        self.bodies.insert(
            handle,
            ScriptedBody {
                outcome,
                age: 0.0,
                dimensions: desc.dimensions,
            },
        );
        self.spawn_log.push(desc);
        handle
    }

    fn despawn(&mut self, handle: BodyHandle) {
        self.bodies.remove(&handle);
    }

    fn resize(&mut self, handle: BodyHandle, dimensions: CoinDimensions) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.dimensions = dimensions;
            self.resize_count += 1;
        }
    }

    fn step(&mut self, dt: f64) {
        for body in self.bodies.values_mut() {
            body.age += dt;
        }
    }

    fn is_sleeping(&self, handle: BodyHandle) -> bool {
        self.bodies.get(&handle).is_some_and(|b| {
            b.outcome
                .settle_after_secs
                .is_some_and(|after| b.age >= after)
        })
    }

    fn up_axis(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&handle).map(|b| b.outcome.up_axis)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
