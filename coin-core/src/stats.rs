//! Orientation statistics.
//!
//! A [`Tally`] accumulates classified coins across trials and never goes
//! down; a [`TrialReport`] describes a single finished trial.

use serde::{Deserialize, Serialize};

use crate::types::Orientation;

/// Per-orientation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientationCounts {
    pub heads: u64,
    pub tails: u64,
    pub side: u64,
    pub undetermined: u64,
}

impl OrientationCounts {
    pub fn record(&mut self, orientation: Orientation) {
        *self.slot_mut(orientation) += 1;
    }

    pub fn get(&self, orientation: Orientation) -> u64 {
        match orientation {
            Orientation::Heads => self.heads,
            Orientation::Tails => self.tails,
            Orientation::Side => self.side,
            Orientation::Undetermined => self.undetermined,
        }
    }

    pub fn sum(&self) -> u64 {
        self.heads + self.tails + self.side + self.undetermined
    }

    fn slot_mut(&mut self, orientation: Orientation) -> &mut u64 {
        match orientation {
            Orientation::Heads => &mut self.heads,
            Orientation::Tails => &mut self.tails,
            Orientation::Side => &mut self.side,
            Orientation::Undetermined => &mut self.undetermined,
        }
    }
}

impl std::ops::AddAssign for OrientationCounts {
    fn add_assign(&mut self, other: Self) {
        self.heads += other.heads;
        self.tails += other.tails;
        self.side += other.side;
        self.undetermined += other.undetermined;
    }
}

/// Empirical probability estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub heads: f64,
    pub tails: f64,
    pub side: f64,
    pub undetermined: f64,
}

/// Cumulative tally over every completed trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    total: u64,
    counts: OrientationCounts,
    probabilities: Probabilities,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one trial's counts and refresh the probability estimates.
    pub fn accumulate(&mut self, counts: &OrientationCounts) {
        self.total += counts.sum();
        self.counts += *counts;
        self.update_probabilities();
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn counts(&self) -> &OrientationCounts {
        &self.counts
    }

    pub fn count(&self, orientation: Orientation) -> u64 {
        self.counts.get(orientation)
    }

    /// `count / total`, or 0 when nothing has been counted yet.
    pub fn probability(&self, orientation: Orientation) -> f64 {
        ratio(self.counts.get(orientation), self.total)
    }

    pub fn probabilities(&self) -> Probabilities {
        self.probabilities
    }

    fn update_probabilities(&mut self) {
        self.probabilities = Probabilities {
            heads: self.probability(Orientation::Heads),
            tails: self.probability(Orientation::Tails),
            side: self.probability(Orientation::Side),
            undetermined: self.probability(Orientation::Undetermined),
        };
    }
}

fn ratio(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Summary of one finished trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    /// Zero-based index of the trial since the manager was created.
    pub trial: u64,
    pub coins_spawned: usize,
    /// Coins that came to rest and were classified.
    pub coins_settled: usize,
    /// Coins still moving at the timeout; excluded from every count.
    pub coins_excluded: usize,
    pub counts: OrientationCounts,
    pub timed_out: bool,
    /// Simulated seconds between start and finish.
    pub elapsed_secs: f64,
}

// =============================================================================
// Tests
// =============================================================================
