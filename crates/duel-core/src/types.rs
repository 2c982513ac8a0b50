use serde::{Deserialize, Serialize};

/// Participant in a duel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Human,
    Machine,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Human => write!(f, "human"),
            Actor::Machine => write!(f, "machine"),
        }
    }
}

/// What a party did (or what happened to it) at a given date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Still holding; never stored as a terminal record
    Hold,
    /// Voluntary early exercise
    Exercise,
    /// Forced termination by the barrier, payoff zero
    BarrierKnockout,
    /// Settled at the final date
    Maturity,
}

impl DecisionKind {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DecisionKind::Hold)
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionKind::Hold => write!(f, "hold"),
            DecisionKind::Exercise => write!(f, "exercise"),
            DecisionKind::BarrierKnockout => write!(f, "barrier_knockout"),
            DecisionKind::Maturity => write!(f, "maturity"),
        }
    }
}

/// Terminal outcome of one party's position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub actor: Actor,
    pub kind: DecisionKind,
    pub date: usize,
    pub payoff: f64,
}

impl DecisionRecord {
    pub fn exercise(actor: Actor, date: usize, payoff: f64) -> Self {
        Self {
            actor,
            kind: DecisionKind::Exercise,
            date,
            payoff,
        }
    }

    pub fn maturity(actor: Actor, date: usize, payoff: f64) -> Self {
        Self {
            actor,
            kind: DecisionKind::Maturity,
            date,
            payoff,
        }
    }

    /// Knockout always pays nothing.
    pub fn knockout(actor: Actor, date: usize) -> Self {
        Self {
            actor,
            kind: DecisionKind::BarrierKnockout,
            date,
            payoff: 0.0,
        }
    }
}

/// How asset prices at a date are reduced before barrier comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Compare each asset individually (max against upper, min against lower)
    #[default]
    PerAsset,
    /// Compare the arithmetic mean of all assets
    BasketAverage,
}

/// Barrier shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BarrierKind {
    None,
    Up { threshold: f64 },
    Down { threshold: f64 },
    Double { lower: f64, upper: f64 },
    MovingUp { thresholds: Vec<f64> },
    MovingDouble { lower: Vec<f64>, upper: Vec<f64> },
}

impl BarrierKind {
    pub fn barrier_type(&self) -> BarrierType {
        match self {
            BarrierKind::None => BarrierType::None,
            BarrierKind::Up { .. } => BarrierType::Up,
            BarrierKind::Down { .. } => BarrierType::Down,
            BarrierKind::Double { .. } => BarrierType::Double,
            BarrierKind::MovingUp { .. } => BarrierType::MovingUp,
            BarrierKind::MovingDouble { .. } => BarrierType::MovingDouble,
        }
    }
}

/// Shape of a barrier without its levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierType {
    #[default]
    None,
    Up,
    Down,
    Double,
    MovingUp,
    MovingDouble,
}

/// Barrier levels that apply at a single date
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BarrierLevels {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Barrier as advertised before play. Moving schedules report their date-0 levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BarrierInfo {
    pub barrier_type: BarrierType,
    #[serde(flatten)]
    pub levels: BarrierLevels,
    pub aggregation: Aggregation,
}

/// Knockout specification for a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierSpec {
    #[serde(flatten)]
    pub kind: BarrierKind,
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl BarrierSpec {
    pub fn none() -> Self {
        Self::from_kind(BarrierKind::None)
    }

    pub fn up(threshold: f64) -> Self {
        Self::from_kind(BarrierKind::Up { threshold })
    }

    pub fn down(threshold: f64) -> Self {
        Self::from_kind(BarrierKind::Down { threshold })
    }

    pub fn double(lower: f64, upper: f64) -> Self {
        Self::from_kind(BarrierKind::Double { lower, upper })
    }

    pub fn moving_up(thresholds: Vec<f64>) -> Self {
        Self::from_kind(BarrierKind::MovingUp { thresholds })
    }

    pub fn moving_double(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Self::from_kind(BarrierKind::MovingDouble { lower, upper })
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    fn from_kind(kind: BarrierKind) -> Self {
        Self {
            kind,
            aggregation: Aggregation::PerAsset,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, BarrierKind::None)
    }

    pub fn info(&self) -> BarrierInfo {
        BarrierInfo {
            barrier_type: self.kind.barrier_type(),
            levels: self.levels_at(0),
            aggregation: self.aggregation,
        }
    }

    /// Levels in force at `step`. Moving schedules past their end yield no level.
    pub fn levels_at(&self, step: usize) -> BarrierLevels {
        match &self.kind {
            BarrierKind::None => BarrierLevels::default(),
            BarrierKind::Up { threshold } => BarrierLevels {
                lower: None,
                upper: Some(*threshold),
            },
            BarrierKind::Down { threshold } => BarrierLevels {
                lower: Some(*threshold),
                upper: None,
            },
            BarrierKind::Double { lower, upper } => BarrierLevels {
                lower: Some(*lower),
                upper: Some(*upper),
            },
            BarrierKind::MovingUp { thresholds } => BarrierLevels {
                lower: None,
                upper: thresholds.get(step).copied(),
            },
            BarrierKind::MovingDouble { lower, upper } => BarrierLevels {
                lower: lower.get(step).copied(),
                upper: upper.get(step).copied(),
            },
        }
    }
}

impl Default for BarrierSpec {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_spec_json_shape() {
        let spec = BarrierSpec::double(85.0, 130.0);
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "double");
        assert_eq!(json["lower"], 85.0);
        assert_eq!(json["aggregation"], "per_asset");

        let parsed: BarrierSpec =
            serde_json::from_str(r#"{"type":"up","threshold":110.0}"#).unwrap();
        assert_eq!(parsed, BarrierSpec::up(110.0));
    }

    #[test]
    fn test_moving_levels_follow_step() {
        let spec = BarrierSpec::moving_double(vec![85.0, 86.0, 87.5], vec![115.0, 114.0, 113.0])
            .with_aggregation(Aggregation::BasketAverage);
        assert_eq!(
            spec.levels_at(2),
            BarrierLevels {
                lower: Some(87.5),
                upper: Some(113.0)
            }
        );
        assert_eq!(spec.levels_at(9), BarrierLevels::default());
    }

    #[test]
    fn test_info_reports_shape_and_starting_levels() {
        let spec = BarrierSpec::moving_up(vec![120.0, 118.5, 119.0]);
        let info = spec.info();
        assert_eq!(info.barrier_type, BarrierType::MovingUp);
        assert_eq!(info.levels.upper, Some(120.0));
        assert_eq!(info.levels.lower, None);

        let json = serde_json::to_value(BarrierSpec::double(85.0, 130.0).info()).unwrap();
        assert_eq!(json["barrier_type"], "double");
        assert_eq!(json["lower"], 85.0);
        assert_eq!(json["upper"], 130.0);
        assert_eq!(json["aggregation"], "per_asset");
    }

    #[test]
    fn test_knockout_record_pays_nothing() {
        let record = DecisionRecord::knockout(Actor::Machine, 4);
        assert_eq!(record.payoff, 0.0);
        assert!(record.kind.is_terminal());
        assert!(!DecisionKind::Hold.is_terminal());
    }
}
