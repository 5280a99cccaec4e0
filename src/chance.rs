//! Injectable coin flips for the probabilistic stand-ins (simulated feedback,
//! scheduled reviews, pre-check preemption, alerts).

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Decides whether an event with probability `p` happens.
pub trait Chance {
  fn happens(&mut self, p: f64) -> bool;
}

/// Draws from a random number generator.
#[derive(Debug, Clone)]
pub struct RandomChance<R = StdRng> {
  rng: R,
}

impl RandomChance<StdRng> {
  pub fn from_entropy() -> Self {
    Self {
      rng: StdRng::from_entropy(),
    }
  }

  pub fn seeded(seed: u64) -> Self {
    Self {
      rng: StdRng::seed_from_u64(seed),
    }
  }
}

impl<R: RngCore> RandomChance<R> {
  pub fn new(rng: R) -> Self {
    Self { rng }
  }
}

impl<R: RngCore> Chance for RandomChance<R> {
  fn happens(&mut self, p: f64) -> bool {
    if p <= 0.0 {
      return false;
    }
    if p >= 1.0 {
      return true;
    }
    self.rng.gen_bool(p)
  }
}

/// Always or never, regardless of `p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChance(pub bool);

impl FixedChance {
  pub const ALWAYS: FixedChance = FixedChance(true);
  pub const NEVER: FixedChance = FixedChance(false);
}

impl Chance for FixedChance {
  fn happens(&mut self, _p: f64) -> bool {
    self.0
  }
}
