use async_trait::async_trait;

use crate::{ContractKind, ContractMetadata, DuelResult, SessionBundle};

/// Source of session bundles (simulated paths, precomputed files, ...)
#[async_trait]
pub trait PathProvider: Send + Sync {
    /// Products this provider can serve
    fn products(&self) -> Vec<ContractMetadata>;

    /// Build a fresh bundle for one session of `kind`
    async fn next_bundle(&self, kind: ContractKind) -> DuelResult<SessionBundle>;
}
