//! Contract identification and metadata.

use serde::{Deserialize, Serialize};

use crate::{BarrierInfo, DuelError};

/// Game difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    /// Single barrier, payoff easy to read off the chart
    Medium,
    /// Moving barriers or basket payoffs
    Hard,
    /// Path-dependent payoffs with two barriers
    Impossible,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
            Difficulty::Impossible => write!(f, "Impossible"),
        }
    }
}

/// Explicit contract identifier. Payoff and barrier behaviour is keyed on this,
/// never on the display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    UpAndOutCall,
    DownAndOutMinPut,
    DoubleBarrierMaxCall,
    RandomlyMovingBarrierCall,
    UpAndOutMinPut,
    DownAndOutBest2Call,
    DoubleBarrierLookbackFloatingPut,
    DoubleBarrierRankWeightedBasketCall,
    DoubleMovingBarrierDispersionCall,
}

impl ContractKind {
    pub const ALL: [ContractKind; 9] = [
        ContractKind::UpAndOutCall,
        ContractKind::DownAndOutMinPut,
        ContractKind::DoubleBarrierMaxCall,
        ContractKind::RandomlyMovingBarrierCall,
        ContractKind::UpAndOutMinPut,
        ContractKind::DownAndOutBest2Call,
        ContractKind::DoubleBarrierLookbackFloatingPut,
        ContractKind::DoubleBarrierRankWeightedBasketCall,
        ContractKind::DoubleMovingBarrierDispersionCall,
    ];

    /// Product id used on the wire (`?product=...`)
    pub fn id(&self) -> &'static str {
        match self {
            ContractKind::UpAndOutCall => "upandoutcall",
            ContractKind::DownAndOutMinPut => "downandoutminput",
            ContractKind::DoubleBarrierMaxCall => "doublebarriermaxcall",
            ContractKind::RandomlyMovingBarrierCall => "randomlymovingbarriercall",
            ContractKind::UpAndOutMinPut => "upandoutminput",
            ContractKind::DownAndOutBest2Call => "downandoutbest2call",
            ContractKind::DoubleBarrierLookbackFloatingPut => "doublebarrierlookbackfloatingput",
            ContractKind::DoubleBarrierRankWeightedBasketCall => "doublebarrierrankweightedbskcall",
            ContractKind::DoubleMovingBarrierDispersionCall => "doublemovingbarrierdispersioncall",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ContractKind::UpAndOutCall => "UpAndOutCall",
            ContractKind::DownAndOutMinPut => "DownAndOutMinPut",
            ContractKind::DoubleBarrierMaxCall => "DoubleBarrierMaxCall",
            ContractKind::RandomlyMovingBarrierCall => "RandomlyMovingBarrierCall",
            ContractKind::UpAndOutMinPut => "UpAndOutMinPut",
            ContractKind::DownAndOutBest2Call => "DownAndOutBest2Call",
            ContractKind::DoubleBarrierLookbackFloatingPut => "DoubleBarrierLookbackFloatingPut",
            ContractKind::DoubleBarrierRankWeightedBasketCall => "DoubleBarrierRankWeightedBskCall",
            ContractKind::DoubleMovingBarrierDispersionCall => "DoubleMovingBarrierDispersionCall",
        }
    }
}

impl std::fmt::Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for ContractKind {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ContractKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| DuelError::UnknownProduct(s.to_string()))
    }
}

/// Descriptive data for a contract, shown before and during play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub kind: ContractKind,
    /// Display name
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub strike: f64,
    /// Maturity in years
    pub maturity: f64,
    /// Number of decision dates N
    pub nb_dates: usize,
    pub nb_assets: usize,
    #[serde(default)]
    pub barrier: BarrierInfo,
}
