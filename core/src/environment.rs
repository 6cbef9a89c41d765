//! Environment traits: dependency injection for reducers.
//!
//! All external, non-deterministic inputs to a reducer are abstracted behind
//! traits and injected via the Environment parameter: time through [`Clock`],
//! randomness through [`Sampler`]. Production implementations wrap the system
//! clock and thread-local RNG; tests inject fixed or seeded doubles so every
//! transition is reproducible.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Uniform random sampling without replacement.
///
/// `sample(population, amount)` returns `amount` distinct indices in
/// `0..population`, each subset of that size equally likely. This is the
/// fairness contract of the lottery draw: implementations must be unbiased
/// (a partial Fisher–Yates shuffle or equivalent), never "take the first
/// `amount` after a sort".
///
/// If `amount > population`, the whole population is returned.
pub trait Sampler: Send + Sync {
    /// Draw `amount` distinct indices uniformly from `0..population`.
    fn sample(&self, population: usize, amount: usize) -> Vec<usize>;
}

/// Production sampler backed by the thread-local RNG.
///
/// Uses `rand::seq::index::sample`, which picks `amount` distinct indices
/// uniformly without replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSampler;

impl Sampler for ThreadRngSampler {
    fn sample(&self, population: usize, amount: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut rand::thread_rng(), population, amount.min(population))
            .into_vec()
    }
}
