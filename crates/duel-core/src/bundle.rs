//! Immutable per-session input handed over by a [`crate::PathProvider`].

use serde::{Deserialize, Serialize};

use crate::{BarrierKind, BarrierSpec, ContractMetadata, DuelError, DuelResult};

/// Everything a session needs, fixed before play begins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBundle {
    /// One price sequence per asset, each covering dates 0..=N
    pub asset_prices: Vec<Vec<f64>>,
    /// Intrinsic payoff if exercised at each date, ignoring knockout
    pub payoffs: Vec<f64>,
    /// Date at which the machine exercises, in 1..=N
    pub machine_exercise_date: usize,
    pub barrier: BarrierSpec,
    pub metadata: ContractMetadata,
}

impl SessionBundle {
    /// Number of decision dates N
    pub fn horizon(&self) -> usize {
        self.payoffs.len().saturating_sub(1)
    }

    pub fn nb_assets(&self) -> usize {
        self.asset_prices.len()
    }

    /// Cross-section of asset prices at `step`
    pub fn prices_at(&self, step: usize) -> Vec<f64> {
        self.asset_prices
            .iter()
            .filter_map(|series| series.get(step).copied())
            .collect()
    }

    /// Check the structural invariants the session relies on.
    pub fn validate(&self) -> DuelResult<()> {
        if self.payoffs.len() < 2 {
            return Err(invalid(format!(
                "payoff timeline needs at least 2 dates, got {}",
                self.payoffs.len()
            )));
        }
        let n = self.horizon();
        let len = n + 1;

        if self.asset_prices.is_empty() {
            return Err(invalid("path has no assets".to_string()));
        }
        for (asset, series) in self.asset_prices.iter().enumerate() {
            if series.len() != len {
                return Err(invalid(format!(
                    "asset {} has {} prices, expected {}",
                    asset,
                    series.len(),
                    len
                )));
            }
            if let Some(date) = series.iter().position(|p| !p.is_finite()) {
                return Err(invalid(format!(
                    "asset {} has a non-finite price at date {}",
                    asset, date
                )));
            }
        }

        if let Some(date) = self
            .payoffs
            .iter()
            .position(|p| !p.is_finite() || *p < 0.0)
        {
            return Err(invalid(format!(
                "payoff at date {} is negative or non-finite",
                date
            )));
        }

        if self.machine_exercise_date == 0 || self.machine_exercise_date > n {
            return Err(invalid(format!(
                "machine exercise date {} outside 1..={}",
                self.machine_exercise_date, n
            )));
        }

        if self.metadata.nb_dates != n {
            return Err(invalid(format!(
                "metadata declares {} dates, timeline has {}",
                self.metadata.nb_dates, n
            )));
        }
        if self.metadata.nb_assets != self.asset_prices.len() {
            return Err(invalid(format!(
                "metadata declares {} assets, path has {}",
                self.metadata.nb_assets,
                self.asset_prices.len()
            )));
        }

        validate_barrier(&self.barrier, len)
    }
}

fn validate_barrier(spec: &BarrierSpec, len: usize) -> DuelResult<()> {
    let schedule_len = |name: &str, values: &[f64]| -> DuelResult<()> {
        if values.len() != len {
            return Err(invalid(format!(
                "{} barrier schedule has {} levels, expected {}",
                name,
                values.len(),
                len
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid(format!("{} barrier schedule is not finite", name)));
        }
        Ok(())
    };

    match &spec.kind {
        BarrierKind::None => Ok(()),
        BarrierKind::Up { threshold } | BarrierKind::Down { threshold } => {
            if threshold.is_finite() {
                Ok(())
            } else {
                Err(invalid("barrier threshold is not finite".to_string()))
            }
        }
        BarrierKind::Double { lower, upper } => {
            if !lower.is_finite() || !upper.is_finite() || lower >= upper {
                return Err(invalid(format!(
                    "double barrier needs finite lower < upper, got {} / {}",
                    lower, upper
                )));
            }
            Ok(())
        }
        BarrierKind::MovingUp { thresholds } => schedule_len("upper", thresholds),
        BarrierKind::MovingDouble { lower, upper } => {
            schedule_len("lower", lower)?;
            schedule_len("upper", upper)
        }
    }
}

fn invalid(msg: String) -> DuelError {
    DuelError::InvalidBundle(msg)
}
