//! # Coin Core
//!
//! Monte Carlo estimation of how often a dropped coin lands heads, tails or
//! on its side, as a function of its thickness.
//!
//! ## Architecture
//!
//! - `types`: Core data structures (Vec3, body state, coin properties, orientations)
//! - `coin`: A single coin: shape, rest state, orientation classification
//! - `stats`: Per-trial counts and the cumulative tally
//! - `config`: YAML experiment configuration loader
//! - `physics`: The host contract plus a scripted host for tests
//! - `integrator`: Numerical integration (semi-implicit Euler with rotation)
//! - `forces`: Gravity and damping
//! - `collision`: Ground contact detection and impulse resolution
//! - `world`: Built-in rigid-body world implementing the host contract
//! - `experiment`: Trial lifecycle orchestrator

pub mod coin;
pub mod collision;
pub mod config;
pub mod experiment;
pub mod forces;
pub mod integrator;
pub mod physics;
pub mod stats;
pub mod types;
pub mod world;

pub use config::{ConfigError, ConfigLoader, ExperimentConfig, WorldConfig};
pub use experiment::{ExperimentError, ExperimentManager, TrialState};
pub use physics::{PhysicsHost, ScriptedHost, ScriptedOutcome};
pub use stats::{OrientationCounts, Probabilities, Tally, TrialReport};
pub use types::Orientation;
pub use world::SimpleWorld;
