//! Knockout detection
//!
//! Stateless: each call looks at one date only. The session evaluates dates in
//! order, so the first date that reports a hit is the knockout date.

use duel_core::{Aggregation, BarrierSpec, SessionBundle};

/// Whether the barrier is hit by `prices` (one entry per asset) at `step`.
///
/// Upper levels are compared with `>=` against the highest observed price,
/// lower levels with `<=` against the lowest. Under basket aggregation the
/// arithmetic mean replaces both.
pub fn evaluate(prices: &[f64], spec: &BarrierSpec, step: usize) -> bool {
    if prices.is_empty() || spec.is_none() {
        return false;
    }

    let levels = spec.levels_at(step);
    let (low, high) = observed_range(prices, spec.aggregation);

    let upper_hit = levels.upper.map_or(false, |upper| high >= upper);
    let lower_hit = levels.lower.map_or(false, |lower| low <= lower);
    upper_hit || lower_hit
}

/// First date in `1..=through` at which the barrier is hit.
pub fn first_knockout(bundle: &SessionBundle, through: usize) -> Option<usize> {
    let last = through.min(bundle.horizon());
    (1..=last).find(|&step| evaluate(&bundle.prices_at(step), &bundle.barrier, step))
}

fn observed_range(prices: &[f64], aggregation: Aggregation) -> (f64, f64) {
    match aggregation {
        Aggregation::PerAsset => prices.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(low, high), &p| (low.min(p), high.max(p)),
        ),
        Aggregation::BasketAverage => {
            let mean = prices.iter().sum::<f64>() / prices.len() as f64;
            (mean, mean)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_barrier_hits_on_any_asset() {
        let spec = BarrierSpec::up(120.0);
        assert!(!evaluate(&[100.0, 119.9, 80.0], &spec, 3));
        assert!(evaluate(&[100.0, 120.0, 80.0], &spec, 3));
    }

    #[test]
    fn test_down_barrier_uses_minimum() {
        let spec = BarrierSpec::down(85.0);
        assert!(evaluate(&[110.0, 84.0], &spec, 1));
        assert!(evaluate(&[110.0, 85.0], &spec, 1));
        assert!(!evaluate(&[110.0, 85.1], &spec, 1));
    }

    #[test]
    fn test_double_barrier() {
        let spec = BarrierSpec::double(85.0, 130.0);
        assert!(!evaluate(&[90.0, 125.0], &spec, 2));
        assert!(evaluate(&[90.0, 131.0], &spec, 2));
        assert!(evaluate(&[80.0, 100.0], &spec, 2));
    }

    #[test]
    fn test_moving_barrier_uses_level_at_step() {
        let spec = BarrierSpec::moving_up(vec![125.0, 123.0, 121.0, 119.0]);
        assert!(!evaluate(&[120.0], &spec, 1));
        assert!(evaluate(&[120.0], &spec, 3));
    }

    #[test]
    fn test_basket_average_smooths_single_breach() {
        let spec = BarrierSpec::double(85.0, 115.0).with_aggregation(Aggregation::BasketAverage);
        // One asset beyond the upper level, but the mean stays inside.
        assert!(!evaluate(&[120.0, 100.0, 95.0], &spec, 1));
        assert!(evaluate(&[120.0, 118.0, 116.0], &spec, 1));

        let moving = BarrierSpec::moving_double(vec![85.0, 99.0], vec![115.0, 130.0])
            .with_aggregation(Aggregation::BasketAverage);
        assert!(evaluate(&[100.0, 96.0], &moving, 1));
    }

    #[test]
    fn test_no_barrier_or_no_prices_never_hits() {
        assert!(!evaluate(&[1e9], &BarrierSpec::none(), 1));
        assert!(!evaluate(&[], &BarrierSpec::up(1.0), 1));
    }
}
