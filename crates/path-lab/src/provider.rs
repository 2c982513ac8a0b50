//! Bundle providers

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use duel_core::{
    ContractKind, ContractMetadata, DuelError, DuelResult, PathProvider, SessionBundle,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::barrier_path::DEFAULT_BARRIER_SEED;
use crate::catalog::ProductCatalog;
use crate::payoff::payoff_timeline;
use crate::policy::{ExercisePolicy, ThresholdPolicy};
use crate::simulate::{simulate_paths, GbmParams};

fn lock_poisoned<T>(_: T) -> DuelError {
    DuelError::Provider("random source lock poisoned".to_string())
}

/// Fresh GBM path per session, machine date from an [`ExercisePolicy`]
pub struct SimulatedProvider {
    params: GbmParams,
    barrier_seed: u64,
    policy: Arc<dyn ExercisePolicy>,
    rng: Mutex<StdRng>,
}

impl SimulatedProvider {
    /// `seed` fixes the path stream; `None` draws from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            params: GbmParams::default(),
            barrier_seed: DEFAULT_BARRIER_SEED,
            policy: Arc::new(ThresholdPolicy::default()),
            rng: Mutex::new(rng),
        }
    }

    pub fn with_params(mut self, params: GbmParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn ExercisePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_barrier_seed(mut self, seed: u64) -> Self {
        self.barrier_seed = seed;
        self
    }
}

#[async_trait]
impl PathProvider for SimulatedProvider {
    fn products(&self) -> Vec<ContractMetadata> {
        ProductCatalog::all_products()
            .into_iter()
            .map(|p| p.metadata)
            .collect()
    }

    async fn next_bundle(&self, kind: ContractKind) -> DuelResult<SessionBundle> {
        let product =
            ProductCatalog::get(kind).ok_or_else(|| DuelError::UnknownProduct(kind.to_string()))?;
        let metadata = product.metadata.clone();
        let params = GbmParams {
            maturity: metadata.maturity,
            ..self.params
        };

        let asset_prices = {
            let mut rng = self.rng.lock().map_err(lock_poisoned)?;
            simulate_paths(&params, metadata.nb_assets, metadata.nb_dates, &mut *rng)?
        };
        let payoffs = payoff_timeline(kind, metadata.strike, &asset_prices)?;
        let barrier = product.barrier_spec(metadata.nb_dates, self.barrier_seed);

        let mut bundle = SessionBundle {
            asset_prices,
            payoffs,
            machine_exercise_date: metadata.nb_dates,
            barrier,
            metadata,
        };
        bundle.machine_exercise_date = self.policy.exercise_date(&bundle);
        bundle.validate()?;

        tracing::debug!(
            product = %kind,
            policy = self.policy.name(),
            machine_date = bundle.machine_exercise_date,
            "simulated bundle"
        );
        Ok(bundle)
    }
}

/// Precomputed bundles loaded from `<product id>.json` files, each holding a
/// JSON array of bundles. One is drawn at random per session.
pub struct BundleDirProvider {
    dir: PathBuf,
    bundles: HashMap<ContractKind, Vec<SessionBundle>>,
    rng: Mutex<StdRng>,
}

impl BundleDirProvider {
    pub async fn load(dir: impl AsRef<Path>) -> DuelResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut bundles = HashMap::new();

        for kind in ContractKind::ALL {
            let path = dir.join(format!("{}.json", kind.id()));
            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(DuelError::Provider(format!(
                        "reading {}: {}",
                        path.display(),
                        e
                    )))
                }
            };

            let parsed: Vec<SessionBundle> = serde_json::from_str(&raw).map_err(|e| {
                DuelError::InvalidBundle(format!("{}: {}", path.display(), e))
            })?;

            let valid: Vec<SessionBundle> = parsed
                .into_iter()
                .enumerate()
                .filter_map(|(i, bundle)| {
                    if bundle.metadata.kind != kind {
                        tracing::warn!(file = %path.display(), index = i, "bundle is for another product, skipped");
                        return None;
                    }
                    match bundle.validate() {
                        Ok(()) => Some(bundle),
                        Err(e) => {
                            tracing::warn!(file = %path.display(), index = i, error = %e, "invalid bundle skipped");
                            None
                        }
                    }
                })
                .collect();

            if !valid.is_empty() {
                tracing::info!(product = %kind, count = valid.len(), "loaded bundles");
                bundles.insert(kind, valid);
            }
        }

        if bundles.is_empty() {
            return Err(DuelError::Provider(format!(
                "no usable bundles in {}",
                dir.display()
            )));
        }

        Ok(Self {
            dir,
            bundles,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PathProvider for BundleDirProvider {
    fn products(&self) -> Vec<ContractMetadata> {
        ContractKind::ALL
            .iter()
            .filter_map(|kind| self.bundles.get(kind))
            .filter_map(|list| list.first())
            .map(|bundle| ContractMetadata {
                barrier: bundle.barrier.info(),
                ..bundle.metadata.clone()
            })
            .collect()
    }

    async fn next_bundle(&self, kind: ContractKind) -> DuelResult<SessionBundle> {
        let list = self
            .bundles
            .get(&kind)
            .ok_or_else(|| DuelError::UnknownProduct(kind.to_string()))?;
        let index = {
            let mut rng = self.rng.lock().map_err(lock_poisoned)?;
            rng.gen_range(0..list.len())
        };
        Ok(list[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_engine::{GameSession, Phase, RevealTiming};

    #[tokio::test]
    async fn test_simulated_bundles_are_playable() {
        let provider = SimulatedProvider::new(Some(7));
        assert_eq!(provider.products().len(), 9);

        for kind in ContractKind::ALL {
            let bundle = provider.next_bundle(kind).await.unwrap();
            assert_eq!(bundle.metadata.kind, kind);
            assert_eq!(bundle.horizon(), 12);
            let session = GameSession::new(bundle, RevealTiming::default()).unwrap();
            assert_eq!(session.phase(), Phase::Created);
        }
    }

    #[tokio::test]
    async fn test_seeded_provider_repeats() {
        let a = SimulatedProvider::new(Some(11));
        let b = SimulatedProvider::new(Some(11));
        let kind = ContractKind::DownAndOutMinPut;
        assert_eq!(
            a.next_bundle(kind).await.unwrap(),
            b.next_bundle(kind).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_bundle_dir_round_trip() {
        let dir = std::env::temp_dir().join(format!("path-lab-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let simulated = SimulatedProvider::new(Some(3));
        let kind = ContractKind::UpAndOutCall;
        let mut broken = simulated.next_bundle(kind).await.unwrap();
        broken.machine_exercise_date = 0;
        let good = simulated.next_bundle(kind).await.unwrap();
        let json = serde_json::to_string(&vec![broken, good.clone()]).unwrap();
        tokio::fs::write(dir.join("upandoutcall.json"), json).await.unwrap();

        let provider = BundleDirProvider::load(&dir).await.unwrap();
        let listed = provider.products();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].barrier, good.barrier.info());
        assert_eq!(listed[0].barrier.levels.upper, Some(130.0));
        let loaded = provider.next_bundle(kind).await.unwrap();
        assert_eq!(loaded.metadata, good.metadata);
        assert_eq!(loaded.machine_exercise_date, good.machine_exercise_date);
        assert_eq!(loaded.barrier, good.barrier);
        assert!(matches!(
            provider.next_bundle(ContractKind::DownAndOutMinPut).await,
            Err(DuelError::UnknownProduct(_))
        ));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_dir_is_an_error() {
        let dir = std::env::temp_dir().join(format!("path-lab-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        assert!(BundleDirProvider::load(&dir).await.is_err());
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
