//! Gaussian skill belief and per-candidate battle statistics.

use serde::{Deserialize, Serialize};

/// Prior mean of a freshly referenced candidate.
pub const DEFAULT_MU: f64 = 25.0;

/// Prior standard deviation of a freshly referenced candidate.
pub const DEFAULT_SIGMA: f64 = 25.0 / 3.0;

/// Sigma at which displayed confidence reaches 0%.
const CONFIDENCE_SIGMA_SCALE: f64 = 8.33;

/// A Gaussian belief `(mu, sigma)` over a candidate's preference strength.
///
/// Ratings have no setters. New values come out of
/// [`trueskill::update`](crate::trueskill::update).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    mu: f64,
    sigma: f64,
}

impl Default for Rating {
    fn default() -> Self {
        Self {
            mu: DEFAULT_MU,
            sigma: DEFAULT_SIGMA,
        }
    }
}

impl Rating {
    /// Creates a rating from explicit parameters.
    #[inline]
    pub const fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// Returns the mean.
    #[inline]
    pub const fn mu(&self) -> f64 {
        self.mu
    }

    /// Returns the standard deviation.
    #[inline]
    pub const fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Pessimistic point estimate `mu - 3 * sigma`, used for sorting.
    #[inline]
    pub fn conservative_score(&self) -> f64 {
        self.mu - 3.0 * self.sigma
    }

    /// Confidence in percent, `100 * (1 - sigma / 8.33)` clamped to `[0, 100]`.
    pub fn confidence(&self) -> f64 {
        (100.0 * (1.0 - self.sigma / CONFIDENCE_SIGMA_SCALE)).clamp(0.0, 100.0)
    }
}

/// Battle counters for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleStat {
    /// Outcomes this candidate took part in.
    pub battle_count: u32,
    /// Outcomes won.
    pub wins: u32,
    /// Outcomes lost.
    pub losses: u32,
}

impl BattleStat {
    pub(crate) fn record_win(&mut self) {
        self.battle_count += 1;
        self.wins += 1;
    }

    pub(crate) fn record_loss(&mut self) {
        self.battle_count += 1;
        self.losses += 1;
    }

    /// Fraction of outcomes won, 0.0 when none were played.
    pub fn win_rate(&self) -> f64 {
        if self.battle_count == 0 {
            0.0
        } else {
            self.wins as f64 / self.battle_count as f64
        }
    }
}
