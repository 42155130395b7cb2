//! Deliberate loss injection.
//!
//! Real networks drop datagrams rarely and unpredictably.  To exercise the
//! retransmission path on demand, both engines consult a [`LossModel`] at the
//! points where the protocol allows a unit to vanish:
//!
//! | Role     | Decision point                                            |
//! |----------|-----------------------------------------------------------|
//! | Sender   | A matching ACK arrived; pretend it never did.             |
//! | Receiver | A DATA frame was processed; suppress its ACK.             |
//!
//! [`LossSimulator`] is the production model: each call is an independent
//! Bernoulli trial against a single PRNG that is seeded once when the
//! simulator is built.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Decides, unit by unit, whether to simulate a loss.
pub trait LossModel {
    /// `true` means "drop this unit".
    fn should_drop(&mut self) -> bool;
}

/// Bernoulli loss with a fixed probability.
#[derive(Debug, Clone)]
pub struct LossSimulator {
    probability: f64,
    rng: StdRng,
}

impl LossSimulator {
    /// Build a simulator dropping with `probability`, seeded from the
    /// thread-local RNG.
    ///
    /// `probability` must be finite and within `[0.0, 1.0]`.
    pub fn new(probability: f64) -> Result<Self, SimulatorError> {
        validate_probability(probability)?;
        Ok(Self {
            probability,
            rng: StdRng::from_rng(&mut rand::rng()),
        })
    }

    /// Build a simulator with a fixed seed, for reproducible runs.
    pub fn seeded(probability: f64, seed: u64) -> Result<Self, SimulatorError> {
        validate_probability(probability)?;
        Ok(Self {
            probability,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl LossModel for LossSimulator {
    fn should_drop(&mut self) -> bool {
        // Uniform in [0, 1): p = 0 never drops, p = 1 always drops.
        self.rng.random::<f64>() < self.probability
    }
}

/// Check that `p` is a usable drop probability.
pub fn validate_probability(p: f64) -> Result<(), SimulatorError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimulatorError::InvalidProbability(p))
    }
}

/// Errors raised while configuring a simulator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulatorError {
    #[error("loss probability {0} is not within [0, 1]")]
    InvalidProbability(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIALS: usize = 100_000;

    fn drop_rate(p: f64, seed: u64) -> f64 {
        let mut sim = LossSimulator::seeded(p, seed).unwrap();
        let drops = (0..TRIALS).filter(|_| sim.should_drop()).count();
        drops as f64 / TRIALS as f64
    }

    #[test]
    fn zero_probability_never_drops() {
        assert_eq!(drop_rate(0.0, 1), 0.0);
    }

    #[test]
    fn unit_probability_always_drops() {
        assert_eq!(drop_rate(1.0, 2), 1.0);
    }

    #[test]
    fn empirical_rate_converges_to_probability() {
        for (i, p) in [0.05, 0.25, 0.5, 0.8].into_iter().enumerate() {
            let rate = drop_rate(p, 42 + i as u64);
            // Five standard deviations of a binomial proportion.
            let tolerance = 5.0 * (p * (1.0 - p) / TRIALS as f64).sqrt();
            assert!(
                (rate - p).abs() < tolerance,
                "p={p}: observed {rate}, tolerance {tolerance}"
            );
        }
    }

    #[test]
    fn out_of_range_probability_rejected() {
        for p in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            assert!(LossSimulator::new(p).is_err(), "{p} should be rejected");
        }
    }

    #[test]
    fn boundary_probabilities_accepted() {
        assert_eq!(LossSimulator::new(0.0).unwrap().probability(), 0.0);
        assert_eq!(LossSimulator::new(1.0).unwrap().probability(), 1.0);
    }
}
