//! Game Session
//!
//! One duel over one path. The session owns its bundle, the step pointer, both
//! decision records and the reveal scheduler. All inputs are either a human
//! action (`hold`, `exercise`) or a timer ticket coming back from the owner;
//! each input is applied completely before the call returns.

use chrono::{DateTime, Utc};
use duel_core::{
    Actor, BarrierLevels, ContractKind, DecisionKind, DecisionRecord, DuelError, DuelResult,
    SessionBundle,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::barrier;
use crate::reconcile::{ContestResult, ResultReconciler};
use crate::reveal::{RevealScheduler, RevealTiming, TimerKind, TimerTicket};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Built but not started; the pointer is at date 0
    Created,
    /// At least one party is still live
    Playing(PlayMode),
    /// Both parties have a terminal record
    Terminated,
    /// Reset before termination; no further input is accepted
    Abandoned,
}

impl Phase {
    pub fn is_final(&self) -> bool {
        matches!(self, Phase::Terminated | Phase::Abandoned)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Created => write!(f, "created"),
            Phase::Playing(PlayMode::AwaitingHumanInput) => write!(f, "awaiting human input"),
            Phase::Playing(PlayMode::RevealDelay(RevealStage::Settling)) => write!(f, "settling"),
            Phase::Playing(PlayMode::RevealDelay(_)) => write!(f, "revealing"),
            Phase::Playing(PlayMode::FastForward) => write!(f, "fast-forwarding"),
            Phase::Terminated => write!(f, "terminated"),
            Phase::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Sub-mode of [`Phase::Playing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Controls enabled, waiting for hold or exercise
    AwaitingHumanInput,
    /// Between a hold (or the start) and the next visible date
    RevealDelay(RevealStage),
    /// The human is done; dates advance on their own until the machine is done
    FastForward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealStage {
    /// Waiting for the first playable date
    Settling,
    /// Machine indicator for the held date still hidden
    Concealed,
    /// Machine indicator shown, next date pending
    Shown,
}

/// Timer bookkeeping produced by one input. The owner arms `scheduled` and
/// disarms `cancelled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    pub scheduled: Option<TimerTicket>,
    pub cancelled: Option<TimerTicket>,
}

impl Transition {
    fn scheduled(ticket: TimerTicket) -> Self {
        Self {
            scheduled: Some(ticket),
            cancelled: None,
        }
    }

    fn cancelled(ticket: Option<TimerTicket>) -> Self {
        Self {
            scheduled: None,
            cancelled: ticket,
        }
    }
}

/// The machine as the human is allowed to see it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MachineView {
    /// Known to be holding through `through`; anything later is withheld
    Holding { through: usize },
    Decided(DecisionRecord),
}

/// Presentation snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub product: ContractKind,
    pub name: String,
    pub phase: Phase,
    pub step: usize,
    pub horizon: usize,
    /// Per-asset prices for dates 0..=step
    pub prices: Vec<Vec<f64>>,
    pub payoff_now: f64,
    pub barrier_levels: BarrierLevels,
    /// Barrier levels for dates 0..=step, aligned with `prices`
    pub barrier_path: Vec<BarrierLevels>,
    pub barrier_hit: bool,
    pub knockout_step: Option<usize>,
    pub human: Option<DecisionRecord>,
    pub machine: MachineView,
    /// Machine indicator for each disclosed date starting at date 1
    pub machine_indicators: Vec<DecisionKind>,
    pub actions_enabled: bool,
    pub result: Option<ContestResult>,
}

/// A complete duel session
#[derive(Debug, Clone)]
pub struct GameSession {
    id: Uuid,
    bundle: SessionBundle,
    phase: Phase,
    step: usize,
    human: Option<DecisionRecord>,
    machine: Option<DecisionRecord>,
    knockout_step: Option<usize>,
    scheduler: RevealScheduler,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GameSession {
    /// Validate the bundle and timing and create a session at date 0.
    pub fn new(bundle: SessionBundle, timing: RevealTiming) -> DuelResult<Self> {
        bundle.validate()?;
        timing.validate()?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        tracing::debug!(
            session_id = %id,
            product = %bundle.metadata.kind,
            horizon = bundle.horizon(),
            "session created"
        );

        Ok(Self {
            id,
            bundle,
            phase: Phase::Created,
            step: 0,
            human: None,
            machine: None,
            knockout_step: None,
            scheduler: RevealScheduler::new(id, timing),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Number of decision dates N
    pub fn horizon(&self) -> usize {
        self.bundle.horizon()
    }

    pub fn bundle(&self) -> &SessionBundle {
        &self.bundle
    }

    pub fn human_record(&self) -> Option<&DecisionRecord> {
        self.human.as_ref()
    }

    /// Undisclosed machine record. Presentation goes through [`Self::view`].
    pub fn machine_record(&self) -> Option<&DecisionRecord> {
        self.machine.as_ref()
    }

    pub fn pending_timer(&self) -> Option<&TimerTicket> {
        self.scheduler.pending()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_final()
    }

    pub fn progress_pct(&self) -> f64 {
        (self.step as f64 / self.horizon() as f64) * 100.0
    }

    /// Barrier status at the current date. Date 0 carries no decision and is
    /// never evaluated.
    pub fn barrier_hit(&self) -> bool {
        self.step >= 1 && self.barrier_hit_at(self.step)
    }

    pub fn result(&self) -> Option<ContestResult> {
        match (self.phase, &self.human, &self.machine) {
            (Phase::Terminated, Some(human), Some(machine)) => {
                Some(ResultReconciler::reconcile(human, machine))
            }
            _ => None,
        }
    }

    /// Leave `Created` and arm the settle timer towards date 1.
    pub fn start(&mut self) -> DuelResult<Transition> {
        if self.phase != Phase::Created {
            return Err(self.out_of_phase("start"));
        }
        self.phase = Phase::Playing(PlayMode::RevealDelay(RevealStage::Settling));
        let ticket = self.scheduler.schedule(TimerKind::Settle);
        self.touch();
        Ok(Transition::scheduled(ticket))
    }

    /// Keep the position open for another date.
    pub fn hold(&mut self) -> DuelResult<Transition> {
        if !self.awaiting_input() || self.human.is_some() || self.step >= self.horizon() {
            return Err(self.out_of_phase("hold"));
        }

        self.phase = Phase::Playing(PlayMode::RevealDelay(RevealStage::Concealed));
        let ticket = self.scheduler.schedule(TimerKind::Reveal);
        tracing::debug!(session_id = %self.id, step = self.step, "human holds");
        self.touch();
        Ok(Transition::scheduled(ticket))
    }

    /// Lock in the payoff of the current date.
    pub fn exercise(&mut self) -> DuelResult<Transition> {
        if !self.awaiting_input() || self.human.is_some() {
            return Err(self.out_of_phase("exercise"));
        }

        let step = self.step;
        let record = DecisionRecord::exercise(Actor::Human, step, self.bundle.payoffs[step]);
        tracing::debug!(session_id = %self.id, step, payoff = record.payoff, "human exercises");
        self.human = Some(record);
        self.scheduler.disclose(step);
        self.touch();

        if self.machine.is_some() {
            Ok(self.finish())
        } else {
            self.phase = Phase::Playing(PlayMode::FastForward);
            Ok(Transition::scheduled(
                self.scheduler.schedule(TimerKind::FastForward),
            ))
        }
    }

    /// Apply a fired timer. Anything but the pending ticket of this session is
    /// rejected as stale and changes nothing.
    pub fn on_timer(&mut self, ticket: &TimerTicket) -> DuelResult<Transition> {
        let kind = self.scheduler.accept(ticket)?;

        let transition = match (kind, self.phase) {
            (TimerKind::Settle, Phase::Playing(PlayMode::RevealDelay(RevealStage::Settling))) => {
                self.arrive(1)
            }
            (TimerKind::Reveal, Phase::Playing(PlayMode::RevealDelay(RevealStage::Concealed))) => {
                self.scheduler.disclose(self.step);
                self.phase = Phase::Playing(PlayMode::RevealDelay(RevealStage::Shown));
                Transition::scheduled(self.scheduler.schedule(TimerKind::Advance))
            }
            (TimerKind::Advance, Phase::Playing(PlayMode::RevealDelay(RevealStage::Shown)))
            | (TimerKind::FastForward, Phase::Playing(PlayMode::FastForward)) => {
                self.arrive(self.step + 1)
            }
            (kind, phase) => {
                tracing::warn!(session_id = %self.id, ?kind, %phase, "timer does not match phase");
                return Err(DuelError::StaleTimerFired {
                    session_id: ticket.session_id,
                    seq: ticket.seq,
                });
            }
        };

        self.touch();
        Ok(transition)
    }

    /// Reset before the end. Cancels the pending timer; a no-op once final.
    pub fn abandon(&mut self) -> Transition {
        if self.phase.is_final() {
            return Transition::default();
        }
        self.phase = Phase::Abandoned;
        let cancelled = self.scheduler.cancel();
        tracing::debug!(session_id = %self.id, step = self.step, "session abandoned");
        self.touch();
        Transition::cancelled(cancelled)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id,
            product: self.bundle.metadata.kind,
            name: self.bundle.metadata.name.clone(),
            phase: self.phase,
            step: self.step,
            horizon: self.horizon(),
            prices: self
                .bundle
                .asset_prices
                .iter()
                .map(|series| series.iter().take(self.step + 1).copied().collect())
                .collect(),
            payoff_now: self.bundle.payoffs[self.step],
            barrier_levels: self.bundle.barrier.levels_at(self.step),
            barrier_path: (0..=self.step)
                .map(|date| self.bundle.barrier.levels_at(date))
                .collect(),
            barrier_hit: self.barrier_hit(),
            knockout_step: self.knockout_step,
            human: self.human.clone(),
            machine: self.machine_view(),
            machine_indicators: self.machine_indicators(),
            actions_enabled: self.awaiting_input(),
            result: self.result(),
        }
    }

    /// Move the pointer to `step` and settle everything that happens there.
    fn arrive(&mut self, step: usize) -> Transition {
        debug_assert!(step == self.step + 1 && step <= self.horizon());
        let horizon = self.horizon();
        self.step = step;

        // Once the human is out the race is over; show dates as they come.
        if self.human.is_some() {
            self.scheduler.disclose(step);
        }

        if self.barrier_hit_at(step) {
            if self.knockout_step.is_none() {
                self.knockout_step = Some(step);
            }
            if self.human.is_none() {
                self.human = Some(DecisionRecord::knockout(Actor::Human, step));
            }
            if self.machine.is_none() {
                // An exercise scheduled for this very date stands.
                self.machine = Some(if self.bundle.machine_exercise_date <= step {
                    self.machine_settlement()
                } else {
                    DecisionRecord::knockout(Actor::Machine, step)
                });
            }
            tracing::debug!(session_id = %self.id, step, "barrier hit");
        } else {
            if self.machine.is_none() && self.bundle.machine_exercise_date == step {
                self.machine = Some(self.machine_settlement());
            }
            if self.human.is_none() && step == horizon {
                self.human = Some(DecisionRecord::maturity(
                    Actor::Human,
                    horizon,
                    self.bundle.payoffs[horizon],
                ));
            }
        }

        match (&self.human, &self.machine) {
            (Some(_), Some(_)) => self.finish(),
            (Some(_), None) => {
                self.phase = Phase::Playing(PlayMode::FastForward);
                Transition::scheduled(self.scheduler.schedule(TimerKind::FastForward))
            }
            (None, _) => {
                self.phase = Phase::Playing(PlayMode::AwaitingHumanInput);
                Transition::default()
            }
        }
    }

    fn finish(&mut self) -> Transition {
        self.phase = Phase::Terminated;
        self.scheduler.disclose(self.step);
        let cancelled = self.scheduler.cancel();

        if let Some(result) = self.result() {
            tracing::info!(
                session_id = %self.id,
                product = %self.bundle.metadata.kind,
                winner = %result.winner,
                human = %result.human.label,
                machine = %result.machine.label,
                "session terminated"
            );
        }
        Transition::cancelled(cancelled)
    }

    fn machine_settlement(&self) -> DecisionRecord {
        let date = self.bundle.machine_exercise_date;
        let payoff = self.bundle.payoffs[date];
        if date == self.horizon() {
            DecisionRecord::maturity(Actor::Machine, date, payoff)
        } else {
            DecisionRecord::exercise(Actor::Machine, date, payoff)
        }
    }

    fn barrier_hit_at(&self, step: usize) -> bool {
        debug_assert!(step <= self.step);
        barrier::evaluate(&self.bundle.prices_at(step), &self.bundle.barrier, step)
    }

    fn machine_view(&self) -> MachineView {
        match &self.machine {
            Some(record)
                if self.phase == Phase::Terminated || self.scheduler.is_disclosed(record.date) =>
            {
                MachineView::Decided(record.clone())
            }
            _ => MachineView::Holding {
                through: self.scheduler.disclosed_through(),
            },
        }
    }

    fn machine_indicators(&self) -> Vec<DecisionKind> {
        let through = if self.phase == Phase::Terminated {
            self.step
        } else {
            self.scheduler.disclosed_through()
        };

        let mut indicators = Vec::with_capacity(through);
        for date in 1..=through {
            match &self.machine {
                Some(record) if record.date == date => {
                    indicators.push(record.kind);
                    break;
                }
                _ => indicators.push(DecisionKind::Hold),
            }
        }
        indicators
    }

    fn awaiting_input(&self) -> bool {
        self.phase == Phase::Playing(PlayMode::AwaitingHumanInput)
    }

    fn out_of_phase(&self, action: &'static str) -> DuelError {
        tracing::debug!(session_id = %self.id, action, phase = %self.phase, "action ignored");
        DuelError::ActionOutOfPhase {
            action,
            phase: self.phase.to_string(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
