//! Experiment manager: the trial lifecycle.
//!
//! ```text
//!            start_trial()                 all coins asleep
//!   ┌──────┐ ───────────────► ┌─────────┐ ──────────────────┐
//!   │ Idle │                  │ Running │                   │
//!   └──────┘ ◄─────────────── └─────────┘ ◄── tick(dt) ─────┘
//!      ▲      finish_trial()     │  elapsed ≥ timeout
//!      └── automate: start again ┘  (moving coins excluded)
//! ```
//!
//! At most one trial runs at a time. A start request while a trial is
//! unfinished is refused and logged, never queued.
//!
//! Coins that are still moving when the timeout hits are dropped from the
//! statistics entirely; they are not counted as undetermined.

use std::collections::HashSet;
use std::f64::consts::TAU;

use log::{debug, info, warn};
use nalgebra::UnitQuaternion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::coin::{dimensions_for, lerp, Coin, CoinId};
use crate::config::{ConfigError, ExperimentConfig};
use crate::physics::{BodyDesc, PhysicsHost};
use crate::stats::{OrientationCounts, Tally, TrialReport};
use crate::types::{BodyState, Orientation, Vec3};
use crate::world::SimpleWorld;

/// Errors surfaced by the experiment manager.
#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("previous trial has not finished yet ({active} coins still moving)")]
    TrialInProgress { active: usize },

    #[error("time step must be a positive finite number of seconds, got {0}")]
    InvalidTimeStep(f64),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Lifecycle state of the current trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrialState {
    #[default]
    Idle,
    Running,
}

/// Completion hook, fired once per finished trial.
pub type FinishedHook = Box<dyn FnMut(&TrialReport, &Tally) + Send>;

/// Owns the coins of one trial at a time and the cumulative statistics.
pub struct ExperimentManager<H: PhysicsHost> {
    config: ExperimentConfig,
    host: H,
    rng: StdRng,

    coins: Vec<Coin>,
    active: HashSet<CoinId>,
    state: TrialState,
    elapsed: f64,

    trials_completed: u64,
    tally: Tally,
    last_report: Option<TrialReport>,
    on_finished: Option<FinishedHook>,
}

impl ExperimentManager<SimpleWorld> {
    /// Manager backed by the built-in rigid-body world.
    pub fn simulated(config: ExperimentConfig) -> Result<Self, ExperimentError> {
        config.validate()?;
        let world = SimpleWorld::new(config.world.clone(), config.ground);
        Self::new(config, world)
    }
}

impl<H: PhysicsHost> ExperimentManager<H> {
    /// Validate the configuration and take ownership of the host.
    pub fn new(config: ExperimentConfig, host: H) -> Result<Self, ExperimentError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            host,
            rng,
            coins: Vec::new(),
            active: HashSet::new(),
            state: TrialState::Idle,
            elapsed: 0.0,
            trials_completed: 0,
            tally: Tally::new(),
            last_report: None,
            on_finished: None,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TrialState::Running
    }

    /// True if no trial is in progress or every coin of it has settled.
    pub fn is_finished(&self) -> bool {
        self.state == TrialState::Idle || self.active.is_empty()
    }

    /// Coins of the current (or most recent) trial.
    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    /// Number of coins still moving.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: CoinId) -> bool {
        self.active.contains(&id)
    }

    /// Simulated seconds since the current trial started.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn trials_completed(&self) -> u64 {
        self.trials_completed
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn last_report(&self) -> Option<&TrialReport> {
        self.last_report.as_ref()
    }

    pub fn automate(&self) -> bool {
        self.config.automate
    }

    pub fn set_automate(&mut self, automate: bool) {
        self.config.automate = automate;
    }

    /// Change the coin shape for the live coins and every later trial.
    ///
    /// Values outside `[0, 1]` are clamped; non-finite values are rejected.
    pub fn set_shape_parameter(&mut self, shape_parameter: f64) -> Result<(), ExperimentError> {
        if !shape_parameter.is_finite() {
            return Err(ConfigError::Invalid {
                field: "coin.shape_parameter",
                reason: format!("must be finite, got {}", shape_parameter),
            }
            .into());
        }

        self.config.coin.shape_parameter = shape_parameter.clamp(0.0, 1.0);
        for coin in &mut self.coins {
            coin.set_shape_parameter(shape_parameter);
        }
        Ok(())
    }

    pub fn set_on_finished<F>(&mut self, hook: F)
    where
        F: FnMut(&TrialReport, &Tally) + Send + 'static,
    {
        self.on_finished = Some(Box::new(hook));
    }

    pub fn clear_on_finished(&mut self) {
        self.on_finished = None;
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Begin a new trial, replacing the coins of the previous one.
    ///
    /// Refused while the previous trial is unfinished; nothing changes then.
    pub fn start_trial(&mut self) -> Result<(), ExperimentError> {
        if !self.is_finished() {
            warn!(
                "Previous trial has not yet finished ({} coins still moving)",
                self.active.len()
            );
            return Err(ExperimentError::TrialInProgress {
                active: self.active.len(),
            });
        }

        self.clean_up();
        self.spawn_grid();
        self.elapsed = 0.0;
        self.state = TrialState::Running;

        info!(
            "Trial {} started with {} coins",
            self.trials_completed,
            self.coins.len()
        );
        Ok(())
    }

    /// Advance one simulation step.
    ///
    /// Returns the report of a trial that finished during this tick.
    /// A `dt` that is not a positive finite number is ignored.
    pub fn tick(&mut self, dt: f64) -> Option<TrialReport> {
        if !(dt.is_finite() && dt > 0.0) {
            warn!("Ignoring tick with invalid dt {}", dt);
            return None;
        }
        self.host.step(dt);

        for coin in &mut self.coins {
            if coin.update_shape() {
                self.host.resize(coin.body(), coin.dimensions());
            }
        }

        if self.state != TrialState::Running {
            return None;
        }
        self.elapsed += dt;

        let mut settled = Vec::new();
        for coin in &mut self.coins {
            if coin.poll_rest_state(self.host.is_sleeping(coin.body())) {
                settled.push(coin.id());
            }
        }

        let mut report = None;
        for id in settled {
            if let Some(finished) = self.coin_settled(id) {
                report = Some(finished);
            }
        }

        if report.is_none()
            && self.state == TrialState::Running
            && self.elapsed >= self.config.timeout_secs
        {
            report = Some(self.time_out());
        }

        report
    }

    /// Start a trial and tick until it finishes.
    ///
    /// Returns `Ok(None)` if `max_ticks` pass first; the trial is then left
    /// running.
    pub fn run_trial(
        &mut self,
        dt: f64,
        max_ticks: usize,
    ) -> Result<Option<TrialReport>, ExperimentError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ExperimentError::InvalidTimeStep(dt));
        }
        self.start_trial()?;
        for _ in 0..max_ticks {
            if let Some(report) = self.tick(dt) {
                return Ok(Some(report));
            }
        }
        Ok(None)
    }

    fn clean_up(&mut self) {
        for coin in self.coins.drain(..) {
            self.host.despawn(coin.body());
        }
        self.active.clear();
    }

    fn spawn_grid(&mut self) {
        let n = self.config.grid_size as usize;
        let scale = self.config.grid_scale;
        let center_offset = Vec3::new(1.0, 0.0, 1.0) * (scale * n as f64 * 0.5);
        let dimensions = dimensions_for(&self.config.coin);

        for index in 0..n * n {
            let row = index % n;
            let column = index / n;
            let horizontal_offset = Vec3::new(row as f64, 0.0, column as f64) * scale;
            let height = lerp(
                self.config.height_min,
                self.config.height_max,
                self.rng.gen::<f64>(),
            );

            let orientation = if self.config.random_rotation {
                UnitQuaternion::from_euler_angles(
                    self.rng.gen::<f64>() * TAU,
                    self.rng.gen::<f64>() * TAU,
                    self.rng.gen::<f64>() * TAU,
                )
            } else {
                UnitQuaternion::identity()
            };

            let direction = random_unit_vector(&mut self.rng);
            let speed = self.config.max_horizontal_velocity * self.rng.gen::<f64>();
            let velocity = (direction * speed).horizontal();

            let position =
                self.config.ground + Vec3::UP * height + horizontal_offset - center_offset;

            let body = self.host.spawn(BodyDesc {
                state: BodyState::new(position, velocity, orientation, Vec3::ZERO),
                dimensions,
                mass: self.config.coin.mass,
            });
            self.register_coin(Coin::new(index, body, &self.config.coin));
        }
    }

    fn register_coin(&mut self, coin: Coin) {
        let id = coin.id();
        assert!(self.active.insert(id), "coin {} registered twice", id);
        self.coins.push(coin);
    }

    /// A coin reported its Moving → AtRest transition.
    fn coin_settled(&mut self, id: CoinId) -> Option<TrialReport> {
        assert!(
            self.active.remove(&id),
            "coin {} settled but is not tracked as moving",
            id
        );
        debug!("Coin {} settled, {} still moving", id, self.active.len());

        if self.active.is_empty() {
            Some(self.finish_trial(false, 0))
        } else {
            None
        }
    }

    fn time_out(&mut self) -> TrialReport {
        let excluded = self.active.len();
        warn!(
            "Trial {} timed out after {:.2}s, excluding {} moving coins",
            self.trials_completed, self.elapsed, excluded
        );
        self.active.clear();
        self.finish_trial(true, excluded)
    }

    fn finish_trial(&mut self, timed_out: bool, excluded: usize) -> TrialReport {
        self.state = TrialState::Idle;

        let mut counts = OrientationCounts::default();
        for coin in self.coins.iter().filter(|c| c.is_at_rest()) {
            let orientation = match self.host.up_axis(coin.body()) {
                Some(up) => coin.determine_orientation(up),
                None => {
                    warn!("Coin {} has no body to read orientation from", coin.id());
                    Orientation::Undetermined
                }
            };
            counts.record(orientation);
        }
        self.tally.accumulate(&counts);

        let report = TrialReport {
            trial: self.trials_completed,
            coins_spawned: self.coins.len(),
            coins_settled: self.coins.len() - excluded,
            coins_excluded: excluded,
            counts,
            timed_out,
            elapsed_secs: self.elapsed,
        };
        self.trials_completed += 1;

        let p = self.tally.probabilities();
        info!(
            "Trial {} finished: {} heads, {} tails, {} side, {} undetermined \
             (cumulative n={}, P(heads)={:.4}, P(tails)={:.4}, P(side)={:.4})",
            report.trial,
            counts.heads,
            counts.tails,
            counts.side,
            counts.undetermined,
            self.tally.total(),
            p.heads,
            p.tails,
            p.side
        );

        if let Some(hook) = self.on_finished.as_mut() {
            hook(&report, &self.tally);
        }
        self.last_report = Some(report.clone());

        if self.config.automate {
            if let Err(e) = self.start_trial() {
                warn!("Automated restart failed: {}", e);
            }
        }

        report
    }
}

/// Uniformly distributed direction on the unit sphere.
fn random_unit_vector<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let m2 = v.magnitude_squared();
        if m2 > 1e-6 && m2 <= 1.0 {
            return v / m2.sqrt();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
