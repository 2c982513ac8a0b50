//! Machine exercise policies
//!
//! The machine's date is fixed before the session starts. A policy sees the
//! whole path, including dates the human has not reached yet.

use duel_core::SessionBundle;
use duel_engine::first_knockout;

pub trait ExercisePolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Exercise date in `1..=N` for `bundle`. The bundle's own
    /// `machine_exercise_date` is ignored.
    fn exercise_date(&self, bundle: &SessionBundle) -> usize;
}

/// Exercise at the first live date whose payoff reaches `threshold`,
/// otherwise hold to maturity.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPolicy {
    pub threshold: f64,
}

impl ThresholdPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl ExercisePolicy for ThresholdPolicy {
    fn name(&self) -> &str {
        "threshold"
    }

    fn exercise_date(&self, bundle: &SessionBundle) -> usize {
        let horizon = bundle.horizon();
        let knockout = first_knockout(bundle, horizon);
        let last_live = knockout.map_or(horizon, |k| k.saturating_sub(1));

        (1..=last_live.min(horizon.saturating_sub(1)))
            .find(|&date| bundle.payoffs[date] >= self.threshold)
            .unwrap_or(horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::{BarrierInfo, BarrierSpec, ContractKind, ContractMetadata, Difficulty};

    fn bundle(prices: Vec<f64>, payoffs: Vec<f64>, barrier: BarrierSpec) -> SessionBundle {
        let n = payoffs.len() - 1;
        SessionBundle {
            asset_prices: vec![prices],
            payoffs,
            machine_exercise_date: n,
            barrier,
            metadata: ContractMetadata {
                kind: ContractKind::UpAndOutCall,
                name: "UpAndOutCall".to_string(),
                description: String::new(),
                difficulty: Difficulty::Medium,
                strike: 100.0,
                maturity: 1.0,
                nb_dates: n,
                nb_assets: 1,
                barrier: BarrierInfo::default(),
            },
        }
    }

    #[test]
    fn test_exercises_at_first_date_over_threshold() {
        let b = bundle(
            vec![100.0, 103.0, 106.0, 109.0, 104.0],
            vec![0.0, 3.0, 6.0, 9.0, 4.0],
            BarrierSpec::none(),
        );
        assert_eq!(ThresholdPolicy::new(5.0).exercise_date(&b), 2);
        assert_eq!(ThresholdPolicy::new(50.0).exercise_date(&b), 4);
    }

    #[test]
    fn test_never_targets_knocked_out_dates() {
        let b = bundle(
            vec![100.0, 103.0, 112.0, 109.0, 104.0],
            vec![0.0, 3.0, 12.0, 9.0, 4.0],
            BarrierSpec::up(110.0),
        );
        // Date 2 pays enough but is the knockout date.
        assert_eq!(ThresholdPolicy::new(5.0).exercise_date(&b), 4);
        assert_eq!(ThresholdPolicy::new(2.0).exercise_date(&b), 1);
    }
}
