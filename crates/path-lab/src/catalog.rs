//! Product Catalog
//!
//! The nine playable contracts, grouped by difficulty.

use duel_core::{
    Aggregation, BarrierInfo, BarrierLevels, BarrierSpec, BarrierType, ContractKind,
    ContractMetadata, Difficulty,
};

use crate::barrier_path;

pub const DEFAULT_STRIKE: f64 = 100.0;
pub const DEFAULT_MATURITY: f64 = 1.0;
pub const DEFAULT_NB_DATES: usize = 12;

/// Barrier shape before the schedule is materialized for a horizon
#[derive(Debug, Clone, PartialEq)]
pub enum BarrierTemplate {
    Fixed(BarrierSpec),
    MovingUp { initial: f64 },
    MovingDouble { lower: f64, upper: f64 },
}

impl BarrierTemplate {
    /// Summary shown in the product listing. Moving schedules start at their
    /// initial levels, so date 0 is known before any seed is drawn.
    pub fn info(&self, aggregation: Aggregation) -> BarrierInfo {
        let (barrier_type, levels) = match self {
            BarrierTemplate::Fixed(spec) => (spec.kind.barrier_type(), spec.levels_at(0)),
            BarrierTemplate::MovingUp { initial } => (
                BarrierType::MovingUp,
                BarrierLevels {
                    lower: None,
                    upper: Some(*initial),
                },
            ),
            BarrierTemplate::MovingDouble { lower, upper } => (
                BarrierType::MovingDouble,
                BarrierLevels {
                    lower: Some(*lower),
                    upper: Some(*upper),
                },
            ),
        };
        BarrierInfo {
            barrier_type,
            levels,
            aggregation,
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone)]
pub struct Product {
    pub metadata: ContractMetadata,
    pub barrier: BarrierTemplate,
    pub aggregation: Aggregation,
}

impl Product {
    fn new(
        kind: ContractKind,
        description: &str,
        difficulty: Difficulty,
        nb_assets: usize,
        barrier: BarrierTemplate,
    ) -> Self {
        Self {
            metadata: ContractMetadata {
                kind,
                name: kind.display_name().to_string(),
                description: description.to_string(),
                difficulty,
                strike: DEFAULT_STRIKE,
                maturity: DEFAULT_MATURITY,
                nb_dates: DEFAULT_NB_DATES,
                nb_assets,
                barrier: barrier.info(Aggregation::PerAsset),
            },
            barrier,
            aggregation: Aggregation::PerAsset,
        }
    }

    fn basket_average(mut self) -> Self {
        self.aggregation = Aggregation::BasketAverage;
        self.metadata.barrier.aggregation = Aggregation::BasketAverage;
        self
    }

    pub fn kind(&self) -> ContractKind {
        self.metadata.kind
    }

    /// Concrete barrier for a horizon of `nb_dates`. Moving schedules are
    /// drawn from `seed`.
    pub fn barrier_spec(&self, nb_dates: usize, seed: u64) -> BarrierSpec {
        let spec = match &self.barrier {
            BarrierTemplate::Fixed(spec) => spec.clone(),
            BarrierTemplate::MovingUp { initial } => {
                BarrierSpec::moving_up(barrier_path::moving_upper(*initial, nb_dates, seed))
            }
            BarrierTemplate::MovingDouble { lower, upper } => {
                let (lower, upper) = barrier_path::moving_corridor(*lower, *upper, nb_dates, seed);
                BarrierSpec::moving_double(lower, upper)
            }
        };
        spec.with_aggregation(self.aggregation)
    }
}

pub struct ProductCatalog;

impl ProductCatalog {
    pub fn all_products() -> Vec<Product> {
        vec![
            Self::up_and_out_call(),
            Self::down_and_out_min_put(),
            Self::double_barrier_max_call(),
            Self::randomly_moving_barrier_call(),
            Self::up_and_out_min_put(),
            Self::down_and_out_best2_call(),
            Self::double_barrier_lookback_floating_put(),
            Self::double_barrier_rank_weighted_basket_call(),
            Self::double_moving_barrier_dispersion_call(),
        ]
    }

    pub fn get(kind: ContractKind) -> Option<Product> {
        Self::all_products().into_iter().find(|p| p.kind() == kind)
    }

    pub fn by_difficulty(difficulty: Difficulty) -> Vec<Product> {
        Self::all_products()
            .into_iter()
            .filter(|p| p.metadata.difficulty == difficulty)
            .collect()
    }

    pub fn up_and_out_call() -> Product {
        Product::new(
            ContractKind::UpAndOutCall,
            "1 stock, upper barrier at 130",
            Difficulty::Medium,
            1,
            BarrierTemplate::Fixed(BarrierSpec::up(130.0)),
        )
    }

    pub fn down_and_out_min_put() -> Product {
        Product::new(
            ContractKind::DownAndOutMinPut,
            "3 stocks, lower barrier at 85",
            Difficulty::Medium,
            3,
            BarrierTemplate::Fixed(BarrierSpec::down(85.0)),
        )
    }

    pub fn double_barrier_max_call() -> Product {
        Product::new(
            ContractKind::DoubleBarrierMaxCall,
            "7 stocks, barriers at 85 and 130",
            Difficulty::Medium,
            7,
            BarrierTemplate::Fixed(BarrierSpec::double(85.0, 130.0)),
        )
    }

    pub fn randomly_moving_barrier_call() -> Product {
        Product::new(
            ContractKind::RandomlyMovingBarrierCall,
            "1 stock, moving barrier starting at 125",
            Difficulty::Hard,
            1,
            BarrierTemplate::MovingUp { initial: 125.0 },
        )
    }

    pub fn up_and_out_min_put() -> Product {
        Product::new(
            ContractKind::UpAndOutMinPut,
            "3 stocks, upper barrier at 120",
            Difficulty::Hard,
            3,
            BarrierTemplate::Fixed(BarrierSpec::up(120.0)),
        )
    }

    pub fn down_and_out_best2_call() -> Product {
        Product::new(
            ContractKind::DownAndOutBest2Call,
            "7 stocks, lower barrier at 85",
            Difficulty::Hard,
            7,
            BarrierTemplate::Fixed(BarrierSpec::down(85.0)),
        )
    }

    pub fn double_barrier_lookback_floating_put() -> Product {
        Product::new(
            ContractKind::DoubleBarrierLookbackFloatingPut,
            "1 stock, barriers at 85 and 115",
            Difficulty::Impossible,
            1,
            BarrierTemplate::Fixed(BarrierSpec::double(85.0, 115.0)),
        )
    }

    pub fn double_barrier_rank_weighted_basket_call() -> Product {
        Product::new(
            ContractKind::DoubleBarrierRankWeightedBasketCall,
            "3 stocks, barriers at 80 and 125",
            Difficulty::Impossible,
            3,
            BarrierTemplate::Fixed(BarrierSpec::double(80.0, 125.0)),
        )
    }

    pub fn double_moving_barrier_dispersion_call() -> Product {
        Product::new(
            ContractKind::DoubleMovingBarrierDispersionCall,
            "7 stocks, moving barriers at 85 and 115",
            Difficulty::Impossible,
            7,
            BarrierTemplate::MovingDouble {
                lower: 85.0,
                upper: 115.0,
            },
        )
        .basket_average()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::BarrierKind;

    #[test]
    fn test_every_kind_has_a_product() {
        let products = ProductCatalog::all_products();
        assert_eq!(products.len(), ContractKind::ALL.len());
        for kind in ContractKind::ALL {
            assert!(ProductCatalog::get(kind).is_some(), "missing {}", kind);
        }
    }

    #[test]
    fn test_three_per_difficulty() {
        for difficulty in [Difficulty::Medium, Difficulty::Hard, Difficulty::Impossible] {
            assert_eq!(ProductCatalog::by_difficulty(difficulty).len(), 3);
        }
    }

    #[test]
    fn test_moving_schedule_matches_horizon() {
        let product = ProductCatalog::double_moving_barrier_dispersion_call();
        let spec = product.barrier_spec(12, 42);
        assert_eq!(spec.aggregation, Aggregation::BasketAverage);
        match spec.kind {
            BarrierKind::MovingDouble { lower, upper } => {
                assert_eq!(lower.len(), 13);
                assert_eq!(upper.len(), 13);
            }
            other => panic!("unexpected barrier {:?}", other),
        }
    }

    #[test]
    fn test_listing_matches_drawn_barrier_at_date_zero() {
        for product in ProductCatalog::all_products() {
            let spec = product.barrier_spec(product.metadata.nb_dates, 42);
            assert_eq!(product.metadata.barrier, spec.info(), "{}", product.kind());
        }

        let info = ProductCatalog::double_barrier_max_call().metadata.barrier;
        assert_eq!(info.barrier_type, BarrierType::Double);
        assert_eq!(info.levels.lower, Some(85.0));
        assert_eq!(info.levels.upper, Some(130.0));
    }

    #[test]
    fn test_rank_weighted_needs_three_assets() {
        let product = ProductCatalog::double_barrier_rank_weighted_basket_call();
        assert_eq!(product.metadata.nb_assets, 3);
        assert_eq!(product.metadata.name, "DoubleBarrierRankWeightedBskCall");
    }
}
