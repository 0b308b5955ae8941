//! End-to-end trials in the built-in rigid-body world.

use std::path::PathBuf;

use coin_core::config::{ConfigLoader, ExperimentConfig};
use coin_core::experiment::{ExperimentManager, TrialState};
use coin_core::physics::PhysicsHost;
use coin_core::types::Orientation;

const DT: f64 = 1.0 / 60.0;

fn configs_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("configs")
}

fn small_config(seed: u64) -> ExperimentConfig {
    ExperimentConfig {
        grid_size: 2,
        grid_scale: 4.0,
        height_min: 1.0,
        height_max: 2.0,
        max_horizontal_velocity: 1.0,
        timeout_secs: 20.0,
        seed: Some(seed),
        ..ExperimentConfig::default()
    }
}

#[test]
fn test_small_grid_trial_finishes() {
    let mut manager = ExperimentManager::simulated(small_config(11)).unwrap();

    let report = manager
        .run_trial(DT, 3_000)
        .unwrap()
        .expect("trial should finish before max_ticks");

    assert_eq!(manager.state(), TrialState::Idle);
    assert_eq!(report.coins_spawned, 4);
    assert_eq!(report.coins_settled + report.coins_excluded, 4);
    assert_eq!(report.counts.sum(), report.coins_settled as u64);
    assert_eq!(manager.tally().total(), report.coins_settled as u64);
    assert!(report.elapsed_secs <= 20.0 + DT);
}

#[test]
fn test_flat_unrotated_coins_land_heads() {
    let config = ExperimentConfig {
        random_rotation: false,
        max_horizontal_velocity: 0.0,
        ..small_config(3)
    };
    let mut manager = ExperimentManager::simulated(config).unwrap();

    let report = manager.run_trial(DT, 3_000).unwrap().unwrap();

    assert!(!report.timed_out);
    assert_eq!(report.counts.heads, 4);
    assert_eq!(manager.tally().probability(Orientation::Heads), 1.0);
}

#[test]
fn test_same_seed_same_outcome() {
    let run = || {
        let mut manager = ExperimentManager::simulated(small_config(5)).unwrap();
        manager.run_trial(DT, 3_000).unwrap().unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_tally_accumulates_over_trials() {
    let mut manager = ExperimentManager::simulated(small_config(8)).unwrap();

    let mut total = 0;
    for trial in 0..3 {
        let report = manager.run_trial(DT, 3_000).unwrap().unwrap();
        assert_eq!(report.trial, trial);
        total += report.coins_settled as u64;
        assert_eq!(manager.tally().total(), total);
        assert_eq!(manager.tally().counts().sum(), total);
    }
    // Old coins are despawned before new ones are dropped
    assert_eq!(manager.host().body_count(), 4);
}

#[test]
fn test_shipped_configs_build_experiments() {
    let loader = ConfigLoader::new(configs_path());
    let names = loader.list().unwrap();
    assert!(names.contains(&"default".to_string()));

    for name in names {
        let config = loader.load(&name).unwrap();
        let manager = ExperimentManager::simulated(config);
        assert!(manager.is_ok(), "config '{}' should be usable", name);
    }
}
