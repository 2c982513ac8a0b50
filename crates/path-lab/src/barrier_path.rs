//! Moving barrier schedules
//!
//! Levels random-walk from their initial value. Upper levels drift down on
//! average, lower levels drift up, so the corridor narrows over time. The walk
//! is seeded, which keeps the schedule identical across sessions of a product.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_BARRIER_SEED: u64 = 42;

/// Per-date increment range of an upper level
pub const UPPER_STEP: (f64, f64) = (-2.0, 1.0);
/// Per-date increment range of a lower level
pub const LOWER_STEP: (f64, f64) = (-1.0, 2.0);

/// Walk `nb_dates` steps from `initial`, returning `nb_dates + 1` levels.
pub fn random_walk<R: Rng + ?Sized>(
    initial: f64,
    step: (f64, f64),
    nb_dates: usize,
    rng: &mut R,
) -> Vec<f64> {
    let mut levels = Vec::with_capacity(nb_dates + 1);
    levels.push(initial);
    let mut level = initial;
    for _ in 0..nb_dates {
        level += rng.gen_range(step.0..step.1);
        levels.push(level);
    }
    levels
}

pub fn moving_upper(initial: f64, nb_dates: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_walk(initial, UPPER_STEP, nb_dates, &mut rng)
}

/// Lower and upper schedules drawn from one seeded stream, lower first.
pub fn moving_corridor(
    lower: f64,
    upper: f64,
    nb_dates: usize,
    seed: u64,
) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let lower = random_walk(lower, LOWER_STEP, nb_dates, &mut rng);
    let upper = random_walk(upper, UPPER_STEP, nb_dates, &mut rng);
    (lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_is_deterministic_per_seed() {
        assert_eq!(moving_upper(125.0, 12, 42), moving_upper(125.0, 12, 42));
        assert_ne!(moving_upper(125.0, 12, 42), moving_upper(125.0, 12, 7));
    }

    #[test]
    fn test_walk_respects_step_bounds() {
        let levels = moving_upper(125.0, 12, DEFAULT_BARRIER_SEED);
        assert_eq!(levels.len(), 13);
        assert_eq!(levels[0], 125.0);
        for pair in levels.windows(2) {
            let delta = pair[1] - pair[0];
            assert!(delta >= UPPER_STEP.0 - 1e-9 && delta <= UPPER_STEP.1 + 1e-9);
        }
    }

    #[test]
    fn test_corridor_levels() {
        let (lower, upper) = moving_corridor(85.0, 115.0, 12, DEFAULT_BARRIER_SEED);
        assert_eq!(lower.len(), 13);
        assert_eq!(upper.len(), 13);
        assert_eq!((lower[0], upper[0]), (85.0, 115.0));
        for pair in lower.windows(2) {
            let delta = pair[1] - pair[0];
            assert!(delta >= LOWER_STEP.0 - 1e-9 && delta <= LOWER_STEP.1 + 1e-9);
        }
    }
}
