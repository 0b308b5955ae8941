//! Python bindings for the coin-core drop experiment.
//!
//! Provides a simple Python API:
//!
//! ```python
//! from coin_sim import Experiment
//!
//! exp = Experiment("configs/default.yaml")
//! exp.on_finished(lambda report, tally: print(report["heads"], tally["p_heads"]))
//!
//! for _ in range(20):
//!     exp.run_trial(1 / 60, 3600)
//!
//! print(exp.probabilities())
//! ```

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use coin_core::config::{ConfigError, ExperimentConfig};
use coin_core::experiment::{ExperimentError, ExperimentManager};
use coin_core::stats::{Tally, TrialReport};
use coin_core::types::Orientation;
use coin_core::world::SimpleWorld;

/// Default tick length for `run_trial` (s).
const DEFAULT_DT: f64 = 1.0 / 60.0;

fn config_err(e: ConfigError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn experiment_err(e: ExperimentError) -> PyErr {
    match e {
        ExperimentError::Config(e) => config_err(e),
        e @ ExperimentError::InvalidTimeStep(_) => PyValueError::new_err(e.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

fn parse_orientation(name: &str) -> PyResult<Orientation> {
    Orientation::ALL
        .into_iter()
        .find(|o| o.as_str() == name)
        .ok_or_else(|| {
            PyValueError::new_err(format!(
                "unknown orientation '{}', expected heads, tails, side or undetermined",
                name
            ))
        })
}

fn report_dict<'py>(py: Python<'py>, report: &TrialReport) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("trial", report.trial)?;
    dict.set_item("coins_spawned", report.coins_spawned)?;
    dict.set_item("coins_settled", report.coins_settled)?;
    dict.set_item("coins_excluded", report.coins_excluded)?;
    dict.set_item("timed_out", report.timed_out)?;
    dict.set_item("elapsed", report.elapsed_secs)?;
    for o in Orientation::ALL {
        dict.set_item(o.as_str(), report.counts.get(o))?;
    }
    Ok(dict)
}

fn tally_dict<'py>(py: Python<'py>, tally: &Tally) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("total", tally.total())?;
    for o in Orientation::ALL {
        dict.set_item(o.as_str(), tally.count(o))?;
        dict.set_item(format!("p_{}", o.as_str()), tally.probability(o))?;
    }
    Ok(dict)
}

/// Coin drop experiment backed by the built-in rigid-body world.
///
/// Trials are driven by calling `tick(dt)` (or `run_trial`) from Python.
#[pyclass(unsendable)]
pub struct Experiment {
    manager: ExperimentManager<SimpleWorld>,
}

#[pymethods]
impl Experiment {
    /// Create an experiment from a YAML file, a YAML string, or defaults.
    #[new]
    #[pyo3(signature = (config_path=None, *, yaml=None, seed=None))]
    fn new(config_path: Option<&str>, yaml: Option<&str>, seed: Option<u64>) -> PyResult<Self> {
        let mut config = match (config_path, yaml) {
            (Some(_), Some(_)) => {
                return Err(PyValueError::new_err(
                    "pass either config_path or yaml, not both",
                ))
            }
            (Some(path), None) => ExperimentConfig::load(path).map_err(config_err)?,
            (None, Some(text)) => ExperimentConfig::from_yaml_str(text).map_err(config_err)?,
            (None, None) => ExperimentConfig::default(),
        };
        if seed.is_some() {
            config.seed = seed;
        }

        let manager = ExperimentManager::simulated(config).map_err(experiment_err)?;
        Ok(Self { manager })
    }

    /// Start a trial. Returns False if the previous one is still running.
    fn start_trial(&mut self) -> bool {
        self.manager.start_trial().is_ok()
    }

    /// Advance one step; returns the trial report if a trial just finished.
    fn tick(&mut self, py: Python<'_>, dt: f64) -> PyResult<Option<PyObject>> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(experiment_err(ExperimentError::InvalidTimeStep(dt)));
        }
        match self.manager.tick(dt) {
            Some(report) => Ok(Some(report_dict(py, &report)?.into_any().unbind())),
            None => Ok(None),
        }
    }

    /// Start a trial and tick until it finishes or `max_ticks` pass.
    #[pyo3(signature = (dt=DEFAULT_DT, max_ticks=36_000))]
    fn run_trial(&mut self, py: Python<'_>, dt: f64, max_ticks: usize) -> PyResult<Option<PyObject>> {
        match self.manager.run_trial(dt, max_ticks).map_err(experiment_err)? {
            Some(report) => Ok(Some(report_dict(py, &report)?.into_any().unbind())),
            None => Ok(None),
        }
    }

    /// True if no trial is in progress or every coin of it has settled.
    fn is_finished(&self) -> bool {
        self.manager.is_finished()
    }

    #[getter]
    fn is_running(&self) -> bool {
        self.manager.is_running()
    }

    #[getter]
    fn trials_completed(&self) -> u64 {
        self.manager.trials_completed()
    }

    #[getter]
    fn active_count(&self) -> usize {
        self.manager.active_count()
    }

    /// Simulated seconds since the current trial started.
    #[getter]
    fn elapsed(&self) -> f64 {
        self.manager.elapsed()
    }

    #[getter]
    fn total(&self) -> u64 {
        self.manager.tally().total()
    }

    #[getter]
    fn heads(&self) -> u64 {
        self.manager.tally().count(Orientation::Heads)
    }

    #[getter]
    fn tails(&self) -> u64 {
        self.manager.tally().count(Orientation::Tails)
    }

    #[getter]
    fn side(&self) -> u64 {
        self.manager.tally().count(Orientation::Side)
    }

    #[getter]
    fn undetermined(&self) -> u64 {
        self.manager.tally().count(Orientation::Undetermined)
    }

    /// Empirical probability for "heads", "tails", "side" or "undetermined".
    fn probability(&self, orientation: &str) -> PyResult<f64> {
        Ok(self.manager.tally().probability(parse_orientation(orientation)?))
    }

    /// All counters and probabilities as a dict.
    fn probabilities(&self, py: Python<'_>) -> PyResult<PyObject> {
        Ok(tally_dict(py, self.manager.tally())?.into_any().unbind())
    }

    #[getter]
    fn automate(&self) -> bool {
        self.manager.automate()
    }

    #[setter]
    fn set_automate(&mut self, automate: bool) {
        self.manager.set_automate(automate);
    }

    #[getter]
    fn shape_parameter(&self) -> f64 {
        self.manager.config().coin.shape_parameter
    }

    /// Takes effect on live coins at the next tick.
    #[setter]
    fn set_shape_parameter(&mut self, shape_parameter: f64) -> PyResult<()> {
        self.manager
            .set_shape_parameter(shape_parameter)
            .map_err(experiment_err)
    }

    /// Register `callback(report, tally)` for finished trials; None clears it.
    #[pyo3(signature = (callback=None))]
    fn on_finished(&mut self, callback: Option<PyObject>) {
        let Some(callback) = callback else {
            self.manager.clear_on_finished();
            return;
        };

        self.manager.set_on_finished(move |report, tally| {
            Python::with_gil(|py| {
                let result = report_dict(py, report).and_then(|r| {
                    let t = tally_dict(py, tally)?;
                    callback.bind(py).call1((r, t))
                });
                if let Err(e) = result {
                    log::warn!("on_finished callback raised: {}", e);
                    e.print(py);
                }
            });
        });
    }

    /// Current state as a dict for easy inspection.
    fn state_dict(&self) -> PyResult<PyObject> {
        Python::with_gil(|py| {
            let dict = tally_dict(py, self.manager.tally())?;
            dict.set_item("running", self.manager.is_running())?;
            dict.set_item("finished", self.manager.is_finished())?;
            dict.set_item("trials_completed", self.manager.trials_completed())?;
            dict.set_item("active", self.manager.active_count())?;
            dict.set_item("elapsed", self.manager.elapsed())?;
            dict.set_item("coins_per_trial", self.manager.config().coins_per_trial())?;
            Ok(dict.into_any().unbind())
        })
    }

    fn __repr__(&self) -> String {
        let tally = self.manager.tally();
        format!(
            "Experiment(trials={}, total={}, heads={}, tails={}, side={})",
            self.manager.trials_completed(),
            tally.total(),
            tally.count(Orientation::Heads),
            tally.count(Orientation::Tails),
            tally.count(Orientation::Side)
        )
    }
}

/// Python module definition.
#[pymodule]
fn coin_sim(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // A host application may already have installed a logger
    let _ = env_logger::Builder::from_default_env().try_init();
    m.add_class::<Experiment>()?;
    Ok(())
}
