//! Geometric Brownian motion paths

use duel_core::{DuelError, DuelResult};
use rand::distributions::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

/// Black-Scholes dynamics shared by every asset of a path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    pub spot: f64,
    pub drift: f64,
    pub volatility: f64,
    pub dividend: f64,
    /// Horizon in years
    pub maturity: f64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            spot: 100.0,
            drift: 0.02,
            volatility: 0.29,
            dividend: 0.0,
            maturity: 1.0,
        }
    }
}

/// Simulate `nb_assets` independent paths over `nb_dates` equal steps.
/// Each series has `nb_dates + 1` prices starting at the spot.
pub fn simulate_paths<R: Rng + ?Sized>(
    params: &GbmParams,
    nb_assets: usize,
    nb_dates: usize,
    rng: &mut R,
) -> DuelResult<Vec<Vec<f64>>> {
    if nb_assets == 0 || nb_dates == 0 {
        return Err(DuelError::Provider(format!(
            "cannot simulate {} assets over {} dates",
            nb_assets, nb_dates
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| DuelError::Provider(e.to_string()))?;

    let dt = params.maturity / nb_dates as f64;
    let drift = (params.drift - params.dividend - 0.5 * params.volatility.powi(2)) * dt;
    let diffusion = params.volatility * dt.sqrt();

    let paths = (0..nb_assets)
        .map(|_| {
            let mut price = params.spot;
            let mut series = Vec::with_capacity(nb_dates + 1);
            series.push(price);
            for _ in 0..nb_dates {
                price *= (drift + diffusion * normal.sample(&mut *rng)).exp();
                series.push(price);
            }
            series
        })
        .collect();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_shape_and_spot() {
        let mut rng = StdRng::seed_from_u64(1);
        let paths = simulate_paths(&GbmParams::default(), 3, 12, &mut rng).unwrap();
        assert_eq!(paths.len(), 3);
        for series in &paths {
            assert_eq!(series.len(), 13);
            assert_eq!(series[0], 100.0);
            assert!(series.iter().all(|p| p.is_finite() && *p > 0.0));
        }
    }

    #[test]
    fn test_seeded_paths_repeat() {
        let params = GbmParams::default();
        let a = simulate_paths(&params, 2, 12, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = simulate_paths(&params, 2, 12, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_volatility_is_deterministic_drift() {
        let params = GbmParams {
            volatility: 0.0,
            ..GbmParams::default()
        };
        let paths = simulate_paths(&params, 1, 4, &mut StdRng::seed_from_u64(3)).unwrap();
        let expected = 100.0 * (0.02_f64).exp();
        assert!((paths[0][4] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_empty_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(simulate_paths(&GbmParams::default(), 0, 12, &mut rng).is_err());
    }
}
