//! Reveal timing and disclosure
//!
//! The core never sleeps. It hands out [`TimerTicket`]s and the owner (the
//! server's timer driver, or a test) feeds them back when the delay elapses.
//! Only the single pending ticket of the owning session is accepted; anything
//! else is stale.

use std::time::Duration;

use duel_core::{DuelError, DuelResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum latencies between visible updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealTiming {
    /// From session start to the first playable date
    pub settle: Duration,
    /// From a hold to the machine's indicator for that date being shown
    pub reveal: Duration,
    /// From the indicator being shown to the next date
    pub advance: Duration,
    /// Per-date interval while fast-forwarding
    pub fast_forward: Duration,
}

impl RevealTiming {
    pub fn new(
        settle: Duration,
        reveal: Duration,
        advance: Duration,
        fast_forward: Duration,
    ) -> DuelResult<Self> {
        let timing = Self {
            settle,
            reveal,
            advance,
            fast_forward,
        };
        timing.validate()?;
        Ok(timing)
    }

    /// Total delay of one human-driven date
    pub fn human_step(&self) -> Duration {
        self.reveal + self.advance
    }

    /// Fast-forward must be visibly quicker than live play.
    pub fn validate(&self) -> DuelResult<()> {
        if self.fast_forward >= self.human_step() {
            return Err(DuelError::InvalidTiming(format!(
                "fast-forward interval {:?} must be shorter than the human step {:?}",
                self.fast_forward,
                self.human_step()
            )));
        }
        Ok(())
    }

    pub fn delay_for(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::Settle => self.settle,
            TimerKind::Reveal => self.reveal,
            TimerKind::Advance => self.advance,
            TimerKind::FastForward => self.fast_forward,
        }
    }
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(600),
            reveal: Duration::from_millis(400),
            advance: Duration::from_millis(600),
            fast_forward: Duration::from_millis(350),
        }
    }
}

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Move from date 0 to date 1
    Settle,
    /// Show the machine's indicator for the date just held
    Reveal,
    /// Move to the next date after a reveal
    Advance,
    /// Move to the next date without human input
    FastForward,
}

/// Handle for one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerTicket {
    pub session_id: Uuid,
    pub seq: u64,
    pub kind: TimerKind,
    pub delay: Duration,
}

/// Pending-timer bookkeeping and the machine disclosure horizon
#[derive(Debug, Clone)]
pub struct RevealScheduler {
    session_id: Uuid,
    timing: RevealTiming,
    next_seq: u64,
    pending: Option<TimerTicket>,
    disclosed_through: usize,
}

impl RevealScheduler {
    pub fn new(session_id: Uuid, timing: RevealTiming) -> Self {
        Self {
            session_id,
            timing,
            next_seq: 0,
            pending: None,
            disclosed_through: 0,
        }
    }

    pub fn timing(&self) -> &RevealTiming {
        &self.timing
    }

    pub fn pending(&self) -> Option<&TimerTicket> {
        self.pending.as_ref()
    }

    /// Issue a new ticket, superseding whatever was pending.
    pub fn schedule(&mut self, kind: TimerKind) -> TimerTicket {
        self.next_seq += 1;
        let ticket = TimerTicket {
            session_id: self.session_id,
            seq: self.next_seq,
            kind,
            delay: self.timing.delay_for(kind),
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Drop the pending ticket; a later firing of it is stale.
    pub fn cancel(&mut self) -> Option<TimerTicket> {
        self.pending.take()
    }

    /// Consume `ticket` if it is the one currently pending for this session.
    pub fn accept(&mut self, ticket: &TimerTicket) -> DuelResult<TimerKind> {
        match self.pending {
            Some(pending)
                if ticket.session_id == self.session_id
                    && pending.seq == ticket.seq
                    && pending.kind == ticket.kind =>
            {
                self.pending = None;
                Ok(pending.kind)
            }
            _ => Err(DuelError::StaleTimerFired {
                session_id: ticket.session_id,
                seq: ticket.seq,
            }),
        }
    }

    /// Make the machine's decisions up to `step` visible.
    pub fn disclose(&mut self, step: usize) {
        self.disclosed_through = self.disclosed_through.max(step);
    }

    pub fn is_disclosed(&self, step: usize) -> bool {
        step <= self.disclosed_through
    }

    pub fn disclosed_through(&self) -> usize {
        self.disclosed_through
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_timing_rejects_slow_fast_forward() {
        assert!(RevealTiming::new(ms(500), ms(300), ms(300), ms(599)).is_ok());
        assert!(matches!(
            RevealTiming::new(ms(500), ms(300), ms(300), ms(600)),
            Err(DuelError::InvalidTiming(_))
        ));
        assert!(RevealTiming::default().validate().is_ok());
    }

    #[test]
    fn test_only_pending_ticket_is_accepted() {
        let id = Uuid::new_v4();
        let mut scheduler = RevealScheduler::new(id, RevealTiming::default());

        let first = scheduler.schedule(TimerKind::Reveal);
        let second = scheduler.schedule(TimerKind::Advance);
        assert_eq!(second.delay, ms(600));

        assert!(scheduler.accept(&first).is_err());
        assert_eq!(scheduler.accept(&second).unwrap(), TimerKind::Advance);
        // Already consumed
        assert!(scheduler.accept(&second).is_err());
    }

    #[test]
    fn test_cancelled_ticket_is_stale() {
        let mut scheduler = RevealScheduler::new(Uuid::new_v4(), RevealTiming::default());
        let ticket = scheduler.schedule(TimerKind::FastForward);
        assert_eq!(scheduler.cancel(), Some(ticket));
        assert!(matches!(
            scheduler.accept(&ticket),
            Err(DuelError::StaleTimerFired { seq: 1, .. })
        ));
    }

    #[test]
    fn test_foreign_session_ticket_is_stale() {
        let mut mine = RevealScheduler::new(Uuid::new_v4(), RevealTiming::default());
        let mut other = RevealScheduler::new(Uuid::new_v4(), RevealTiming::default());
        mine.schedule(TimerKind::Settle);
        let foreign = other.schedule(TimerKind::Settle);
        // Same seq and kind, different owner
        assert!(mine.accept(&foreign).is_err());
        assert!(mine.pending().is_some());
    }

    #[test]
    fn test_disclosure_is_monotonic() {
        let mut scheduler = RevealScheduler::new(Uuid::new_v4(), RevealTiming::default());
        scheduler.disclose(4);
        scheduler.disclose(2);
        assert_eq!(scheduler.disclosed_through(), 4);
        assert!(scheduler.is_disclosed(4));
        assert!(!scheduler.is_disclosed(5));
    }
}
