//! Two-player TrueSkill update without draws.
//!
//! Each outcome moves both means toward consistency with the observed result.
//! The size of the move scales with the current uncertainty and is damped by
//! the performance variance `beta`. The dynamics term `tau` is added to both
//! variances before the update so sigma settles at a positive floor instead of
//! collapsing to zero.

use crate::rating::{Rating, DEFAULT_MU, DEFAULT_SIGMA};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};

/// Below this cdf value `pdf / cdf` is replaced by its asymptote `-t`.
const CDF_UNDERFLOW: f64 = 1e-300;

/// Model constants for the update rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingParams {
    /// Prior mean.
    pub mu: f64,
    /// Prior standard deviation.
    pub sigma: f64,
    /// Performance standard deviation.
    pub beta: f64,
    /// Dynamics standard deviation added before every update.
    pub tau: f64,
}

impl Default for RatingParams {
    fn default() -> Self {
        Self {
            mu: DEFAULT_MU,
            sigma: DEFAULT_SIGMA,
            beta: DEFAULT_SIGMA / 2.0,
            tau: DEFAULT_SIGMA / 100.0,
        }
    }
}

impl RatingParams {
    /// Returns the prior rating for a candidate seen for the first time.
    #[inline]
    pub fn prior(&self) -> Rating {
        Rating::new(self.mu, self.sigma)
    }
}

fn standard_pdf(t: f64) -> f64 {
    (-0.5 * t * t).exp() / (2.0 * PI).sqrt()
}

fn standard_cdf(t: f64) -> f64 {
    0.5 * erfc(-t / SQRT_2)
}

/// Mean and variance correction factors for a win with margin `t`.
fn v_and_w(t: f64) -> (f64, f64) {
    let cdf = standard_cdf(t);
    if cdf < CDF_UNDERFLOW {
        return (-t, 1.0);
    }
    let v = standard_pdf(t) / cdf;
    (v, v * (v + t))
}

/// Applies one outcome: `winner` beat `loser`.
///
/// Returns `(new_winner, new_loser)`. Neither sigma ever exceeds its value
/// before the update.
pub fn update(winner: Rating, loser: Rating, params: &RatingParams) -> (Rating, Rating) {
    let tau2 = params.tau * params.tau;
    let winner_var = winner.sigma() * winner.sigma() + tau2;
    let loser_var = loser.sigma() * loser.sigma() + tau2;

    let c2 = 2.0 * params.beta * params.beta + winner_var + loser_var;
    let c = c2.sqrt();
    let t = (winner.mu() - loser.mu()) / c;
    let (v, w) = v_and_w(t);

    let winner_mu = winner.mu() + winner_var / c * v;
    let loser_mu = loser.mu() - loser_var / c * v;

    let winner_sigma = shrink(winner_var, c2, w).min(winner.sigma());
    let loser_sigma = shrink(loser_var, c2, w).min(loser.sigma());

    (
        Rating::new(winner_mu, winner_sigma),
        Rating::new(loser_mu, loser_sigma),
    )
}

fn shrink(var: f64, c2: f64, w: f64) -> f64 {
    (var * (1.0 - var / c2 * w)).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_priors_move_symmetrically() {
        let params = RatingParams::default();
        let (w, l) = update(Rating::default(), Rating::default(), &params);
        assert!(w.mu() > 25.0);
        assert!(l.mu() < 25.0);
        assert!((w.mu() - 25.0 - (25.0 - l.mu())).abs() < 1e-9);
        assert!((w.sigma() - l.sigma()).abs() < 1e-12);
    }

    #[test]
    fn test_known_values_for_default_priors() {
        // No draw margin: t = 0, v = 0.7979, c = 13.177.
        let params = RatingParams::default();
        let (w, l) = update(Rating::default(), Rating::default(), &params);
        assert!((w.mu() - 29.205).abs() < 0.01, "winner mu {}", w.mu());
        assert!((l.mu() - 20.795).abs() < 0.01, "loser mu {}", l.mu());
        assert!((w.sigma() - 7.195).abs() < 0.01, "winner sigma {}", w.sigma());
        assert!((l.sigma() - 7.195).abs() < 0.01, "loser sigma {}", l.sigma());
    }

    #[test]
    fn test_upset_moves_more_than_expected_win() {
        let params = RatingParams::default();
        let strong = Rating::new(35.0, 3.0);
        let weak = Rating::new(15.0, 3.0);

        let (expected_w, _) = update(strong, weak, &params);
        let (upset_w, _) = update(weak, strong, &params);

        assert!(upset_w.mu() - weak.mu() > expected_w.mu() - strong.mu());
    }

    #[test]
    fn test_larger_sigma_larger_move() {
        let params = RatingParams::default();
        let opponent = Rating::new(25.0, 4.0);
        let (certain, _) = update(Rating::new(25.0, 2.0), opponent, &params);
        let (uncertain, _) = update(Rating::new(25.0, 8.0), opponent, &params);
        assert!(uncertain.mu() - 25.0 > certain.mu() - 25.0);
    }

    #[test]
    fn test_extreme_underdog_stays_finite() {
        let params = RatingParams::default();
        let (w, l) = update(Rating::new(-500.0, 0.5), Rating::new(500.0, 0.5), &params);
        assert!(w.mu().is_finite() && l.mu().is_finite());
        assert!(w.sigma().is_finite() && l.sigma().is_finite());
        assert!(w.mu() > -500.0);
    }

    #[test]
    fn test_sigma_converges_to_positive_floor() {
        let params = RatingParams::default();
        let mut a = Rating::default();
        let mut b = Rating::default();
        for i in 0..2_000 {
            let (x, y) = if i % 2 == 0 {
                update(a, b, &params)
            } else {
                let (y, x) = update(b, a, &params);
                (x, y)
            };
            a = x;
            b = y;
        }
        assert!(a.sigma() > 0.0);
        assert!(b.sigma() > 0.0);
        assert!(a.sigma() < 2.0);
    }

    proptest! {
        #[test]
        fn sigma_never_grows(
            wm in -50.0f64..100.0,
            ws in 0.01f64..15.0,
            lm in -50.0f64..100.0,
            ls in 0.01f64..15.0,
        ) {
            let params = RatingParams::default();
            let (w, l) = update(Rating::new(wm, ws), Rating::new(lm, ls), &params);
            prop_assert!(w.sigma() <= ws);
            prop_assert!(l.sigma() <= ls);
            prop_assert!(w.sigma() > 0.0);
            prop_assert!(l.sigma() > 0.0);
        }

        #[test]
        fn winner_mean_never_drops(
            wm in -50.0f64..100.0,
            ws in 0.01f64..15.0,
            lm in -50.0f64..100.0,
            ls in 0.01f64..15.0,
        ) {
            let params = RatingParams::default();
            let (w, l) = update(Rating::new(wm, ws), Rating::new(lm, ls), &params);
            prop_assert!(w.mu() >= wm);
            prop_assert!(l.mu() <= lm);
        }
    }
}
