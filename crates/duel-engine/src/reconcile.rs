//! Result Reconciliation
//!
//! Compares the two terminal records of a finished session.

use duel_core::{DecisionKind, DecisionRecord};
use serde::{Deserialize, Serialize};

/// Who came out ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Human,
    Machine,
    Tie,
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Winner::Human => write!(f, "human"),
            Winner::Machine => write!(f, "machine"),
            Winner::Tie => write!(f, "tie"),
        }
    }
}

/// Display classification of one party's termination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Termination {
    pub kind: DecisionKind,
    pub date: usize,
    pub payoff: f64,
    /// Human readable, e.g. "knocked out at date 4"
    pub label: String,
}

/// Final comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestResult {
    pub winner: Winner,
    /// Human payoff minus machine payoff
    pub margin: f64,
    pub human: Termination,
    pub machine: Termination,
    pub summary: String,
}

pub struct ResultReconciler;

impl ResultReconciler {
    pub fn reconcile(human: &DecisionRecord, machine: &DecisionRecord) -> ContestResult {
        let winner = Self::winner(human.payoff, machine.payoff);
        let margin = human.payoff - machine.payoff;

        let summary = match winner {
            Winner::Human => format!("You beat the machine by {:.2}.", margin),
            Winner::Machine => format!("The machine beat you by {:.2}.", -margin),
            Winner::Tie => format!("Tie: both collected {:.2}.", human.payoff),
        };

        ContestResult {
            winner,
            margin,
            human: Self::classify(human),
            machine: Self::classify(machine),
            summary,
        }
    }

    /// Strictly greater payoff wins; dates never break ties.
    pub fn winner(human_payoff: f64, machine_payoff: f64) -> Winner {
        if human_payoff > machine_payoff {
            Winner::Human
        } else if machine_payoff > human_payoff {
            Winner::Machine
        } else {
            Winner::Tie
        }
    }

    /// Derived from `kind` alone. A zero-payoff exercise is still an exercise.
    pub fn classify(record: &DecisionRecord) -> Termination {
        let label = match record.kind {
            DecisionKind::BarrierKnockout => format!("knocked out at date {}", record.date),
            DecisionKind::Exercise => format!("exercised at date {}", record.date),
            DecisionKind::Maturity => {
                format!("held to maturity, exercised at date {}", record.date)
            }
            DecisionKind::Hold => format!("holding at date {}", record.date),
        };

        Termination {
            kind: record.kind,
            date: record.date,
            payoff: record.payoff,
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::Actor;

    #[test]
    fn test_higher_payoff_wins() {
        let human = DecisionRecord::exercise(Actor::Human, 7, 6.0);
        let machine = DecisionRecord::exercise(Actor::Machine, 5, 10.0);
        let result = ResultReconciler::reconcile(&human, &machine);
        assert_eq!(result.winner, Winner::Machine);
        assert!((result.margin + 4.0).abs() < 1e-12);
        assert_eq!(result.machine.label, "exercised at date 5");
    }

    #[test]
    fn test_equal_payoffs_tie_regardless_of_dates() {
        let human = DecisionRecord::exercise(Actor::Human, 1, 5.0);
        let machine = DecisionRecord::maturity(Actor::Machine, 12, 5.0);
        let result = ResultReconciler::reconcile(&human, &machine);
        assert_eq!(result.winner, Winner::Tie);
        assert_eq!(result.machine.label, "held to maturity, exercised at date 12");
    }

    #[test]
    fn test_zero_exercise_is_not_a_knockout() {
        let human = DecisionRecord::exercise(Actor::Human, 3, 0.0);
        let termination = ResultReconciler::classify(&human);
        assert_eq!(termination.kind, DecisionKind::Exercise);
        assert_eq!(termination.label, "exercised at date 3");

        let knocked = ResultReconciler::classify(&DecisionRecord::knockout(Actor::Human, 3));
        assert_eq!(knocked.label, "knocked out at date 3");
    }
}
