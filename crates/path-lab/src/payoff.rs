//! Intrinsic payoff timelines
//!
//! One value per date, what exercising at that date would pay if the barrier
//! had never been touched. Knockout is applied by the session, not here.

use duel_core::{ContractKind, DuelError, DuelResult};

/// Rank weights for the basket call: highest, middle, lowest price
pub const RANK_WEIGHTS: [f64; 3] = [0.15, 0.50, 0.35];

/// Payoff at each date of `asset_prices` (one series per asset).
pub fn payoff_timeline(
    kind: ContractKind,
    strike: f64,
    asset_prices: &[Vec<f64>],
) -> DuelResult<Vec<f64>> {
    let len = match asset_prices.first() {
        Some(series) => series.len(),
        None => return Err(DuelError::InvalidBundle("path has no assets".to_string())),
    };
    if asset_prices.iter().any(|s| s.len() != len) {
        return Err(DuelError::InvalidBundle(
            "asset series have different lengths".to_string(),
        ));
    }
    if kind == ContractKind::DoubleBarrierRankWeightedBasketCall && asset_prices.len() != 3 {
        return Err(DuelError::InvalidBundle(format!(
            "{} needs exactly 3 assets, got {}",
            kind,
            asset_prices.len()
        )));
    }

    let mut running_max = f64::NEG_INFINITY;
    let timeline = (0..len)
        .map(|t| {
            let prices: Vec<f64> = asset_prices.iter().map(|s| s[t]).collect();
            // Lookback tracks the basket level, which is the price itself for one asset.
            running_max = running_max.max(mean(&prices));
            payoff_at(kind, strike, &prices, running_max)
        })
        .collect();
    Ok(timeline)
}

fn payoff_at(kind: ContractKind, strike: f64, prices: &[f64], running_max: f64) -> f64 {
    let value = match kind {
        ContractKind::UpAndOutCall | ContractKind::RandomlyMovingBarrierCall => prices[0] - strike,
        ContractKind::DownAndOutMinPut | ContractKind::UpAndOutMinPut => strike - min(prices),
        ContractKind::DoubleBarrierMaxCall => max(prices) - strike,
        ContractKind::DownAndOutBest2Call => {
            let sorted = descending(prices);
            mean(&sorted[..sorted.len().min(2)]) - strike
        }
        ContractKind::DoubleBarrierLookbackFloatingPut => running_max - mean(prices),
        ContractKind::DoubleBarrierRankWeightedBasketCall => {
            let weighted: f64 = descending(prices)
                .iter()
                .zip(RANK_WEIGHTS.iter())
                .map(|(p, w)| p * w)
                .sum();
            weighted - strike
        }
        ContractKind::DoubleMovingBarrierDispersionCall => std_dev(prices) - strike,
    };
    value.max(0.0)
}

fn descending(prices: &[f64]) -> Vec<f64> {
    let mut sorted = prices.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted
}

fn mean(prices: &[f64]) -> f64 {
    prices.iter().sum::<f64>() / prices.len() as f64
}

fn min(prices: &[f64]) -> f64 {
    prices.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(prices: &[f64]) -> f64 {
    prices.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Population standard deviation across assets
fn std_dev(prices: &[f64]) -> f64 {
    let m = mean(prices);
    (prices.iter().map(|p| (p - m).powi(2)).sum::<f64>() / prices.len() as f64).sqrt()
}
