//! Experiment configuration.
//!
//! Everything a trial needs is described by [`ExperimentConfig`], which can
//! be built in code or loaded from YAML so that experiments can be varied
//! without recompiling.
//!
//! ## Directory Structure
//!
//! ```text
//! configs/
//! ├── default.yaml
//! ├── thin_coins.yaml
//! └── ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{constants, CoinProperties, Vec3};

/// Error type for configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Config not found: {0}")]
    NotFound(String),

    #[error("Invalid config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// =============================================================================
// World
// =============================================================================

/// Physical parameters of the built-in rigid-body world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravitational acceleration magnitude (m/s²), pulling along -Y
    pub gravity: f64,
    /// Coefficient of restitution against the ground
    pub restitution: f64,
    /// Normal speeds below this bounce with zero restitution (m/s)
    pub restitution_threshold: f64,
    /// Coulomb friction coefficient against the ground
    pub friction: f64,
    /// Linear velocity decay rate (1/s)
    pub linear_damping: f64,
    /// Angular velocity decay rate (1/s)
    pub angular_damping: f64,
    /// Bodies slower than this may fall asleep (m/s)
    pub sleep_linear_threshold: f64,
    /// Bodies spinning slower than this may fall asleep (rad/s)
    pub sleep_angular_threshold: f64,
    /// How long a body must stay below both thresholds (s)
    pub sleep_delay_secs: f64,
    /// Largest internal integration step (s); longer ticks are subdivided
    pub max_substep_secs: f64,
    /// Contact solver passes per substep
    pub solver_iterations: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: constants::GRAVITY,
            restitution: 0.3,
            restitution_threshold: 1.0,
            friction: 0.6,
            linear_damping: 0.1,
            angular_damping: 0.3,
            sleep_linear_threshold: 0.05,
            sleep_angular_threshold: 0.1,
            sleep_delay_secs: 0.5,
            max_substep_secs: 1.0 / 240.0,
            solver_iterations: 6,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite_non_negative("world.gravity", self.gravity)?;
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(invalid("world.restitution", "must be within [0, 1]"));
        }
        finite_non_negative("world.restitution_threshold", self.restitution_threshold)?;
        finite_non_negative("world.friction", self.friction)?;
        finite_non_negative("world.linear_damping", self.linear_damping)?;
        finite_non_negative("world.angular_damping", self.angular_damping)?;
        finite_positive("world.sleep_linear_threshold", self.sleep_linear_threshold)?;
        finite_positive("world.sleep_angular_threshold", self.sleep_angular_threshold)?;
        finite_non_negative("world.sleep_delay_secs", self.sleep_delay_secs)?;
        finite_positive("world.max_substep_secs", self.max_substep_secs)?;
        if self.solver_iterations == 0 {
            return Err(invalid("world.solver_iterations", "must be at least 1"));
        }
        Ok(())
    }
}

// =============================================================================
// Experiment
// =============================================================================

/// Full description of an experiment: grid, randomisation, lifecycle policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Coins per grid side; each trial drops `grid_size²` coins
    pub grid_size: u32,
    /// Distance between neighbouring grid cells (m)
    pub grid_scale: f64,

    /// Randomise the initial rotation about all three axes
    pub random_rotation: bool,
    /// Upper bound of the random horizontal launch speed (m/s)
    pub max_horizontal_velocity: f64,
    /// Drop height range above the ground (m)
    pub height_min: f64,
    pub height_max: f64,

    /// Seconds after which coins still moving are excluded
    pub timeout_secs: f64,
    /// Start the next trial as soon as one finishes
    pub automate: bool,
    /// Fixed RNG seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,

    /// Coin every trial spawns
    pub coin: CoinProperties,
    /// Ground reference point; the grid is centred over it
    pub ground: Vec3,
    /// Built-in physics parameters
    pub world: WorldConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            grid_size: 10,
            grid_scale: 10.0,
            random_rotation: true,
            max_horizontal_velocity: 5.0,
            height_min: 5.0,
            height_max: 10.0,
            timeout_secs: 10.0,
            automate: false,
            seed: None,
            coin: CoinProperties::default(),
            ground: Vec3::ZERO,
            world: WorldConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Parse a configuration from YAML. Missing fields take their defaults.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ExperimentConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Number of coins dropped per trial.
    pub fn coins_per_trial(&self) -> usize {
        let n = self.grid_size as usize;
        n * n
    }

    /// Check every precondition the experiment relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(invalid("grid_size", "must be at least 1"));
        }
        finite_positive("grid_scale", self.grid_scale)?;
        finite_non_negative("max_horizontal_velocity", self.max_horizontal_velocity)?;
        finite_non_negative("height_min", self.height_min)?;
        finite_non_negative("height_max", self.height_max)?;
        if self.height_min > self.height_max {
            return Err(invalid(
                "height_min",
                format!(
                    "({}) must not exceed height_max ({})",
                    self.height_min, self.height_max
                ),
            ));
        }
        finite_positive("timeout_secs", self.timeout_secs)?;
        finite_positive("coin.radius", self.coin.radius)?;
        finite_positive("coin.mass", self.coin.mass)?;
        if !self.coin.shape_parameter.is_finite() {
            return Err(invalid("coin.shape_parameter", "must be finite"));
        }
        if !(self.ground.x.is_finite() && self.ground.y.is_finite() && self.ground.z.is_finite())
        {
            return Err(invalid("ground", "must be finite"));
        }
        self.world.validate()
    }
}

fn finite_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {}", value)))
    }
}

fn finite_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be non-negative, got {}", value)))
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Loads named experiment configurations from a directory of YAML files.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Load a configuration by name (without .yaml extension).
    ///
    /// # Example
    /// ```ignore
    /// let loader = ConfigLoader::new("configs");
    /// let config = loader.load("default")?;
    /// ```
    pub fn load(&self, name: &str) -> Result<ExperimentConfig, ConfigError> {
        let path = self.base_path.join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(ConfigError::NotFound(name.to_string()));
        }
        ExperimentConfig::load(path)
    }

    /// List all available configurations, sorted by name.
    pub fn list(&self) -> Result<Vec<String>, ConfigError> {
        if !self.base_path.exists() {
            return Ok(vec![]);
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if name.ends_with(".yaml") {
                names.push(name.trim_end_matches(".yaml").to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn get_configs_path() -> PathBuf {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(manifest_dir).join("..").join("configs")
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.coins_per_trial(), 100);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = ExperimentConfig::from_yaml_str("grid_size: 3\nautomate: true\n").unwrap();
        assert_eq!(config.grid_size, 3);
        assert!(config.automate);
        assert_eq!(config.timeout_secs, ExperimentConfig::default().timeout_secs);
        assert_eq!(config.world, WorldConfig::default());
    }

    #[test]
    fn test_yaml_round_trip_preserves_config() {
        let config = ExperimentConfig {
            seed: Some(42),
            grid_size: 4,
            ..ExperimentConfig::default()
        };
        let yaml = config.to_yaml_string().unwrap();
        let parsed = ExperimentConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_empty_grid() {
        let result = ExperimentConfig::from_yaml_str("grid_size: 0\n");
        match result {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "grid_size"),
            other => panic!("Expected Invalid error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_inverted_height_range() {
        let config = ExperimentConfig {
            height_min: 20.0,
            height_max: 5.0,
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "height_min",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_non_positive_timeout() {
        let config = ExperimentConfig {
            timeout_secs: 0.0,
            ..ExperimentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_world() {
        let config = ExperimentConfig {
            world: WorldConfig {
                restitution: 1.5,
                ..WorldConfig::default()
            },
            ..ExperimentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = ExperimentConfig::from_yaml_str("grid_size: [not, a, number]\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_shipped_default() {
        let loader = ConfigLoader::new(get_configs_path());
        let result = loader.load("default");

        assert!(result.is_ok(), "Should load default: {:?}", result.err());
        let config = result.unwrap();
        assert!(config.grid_size >= 1);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let loader = ConfigLoader::new(get_configs_path());
        match loader.load("nonexistent_config_xyz") {
            Err(ConfigError::NotFound(name)) => assert_eq!(name, "nonexistent_config_xyz"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_list_configs() {
        let loader = ConfigLoader::new(get_configs_path());
        let names = loader.list().unwrap();
        assert!(names.contains(&"default".to_string()));
        assert!(names.contains(&"thin_coins".to_string()));
    }
}
