//! Live session registry and timer driver
//!
//! Sessions are kept in memory, one async mutex each. Every ticket a session
//! hands out becomes a spawned sleep; when it wakes it is fed back through
//! [`GameSession::on_timer`]. Cancelled tickets have their task aborted, and a
//! ticket that still slips through is rejected by the session as stale.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use duel_core::DuelError;
use duel_engine::{GameSession, SessionView, TimerTicket, Transition};
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Duel(#[from] DuelError),
}

/// Human input on a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Hold,
    Exercise,
    Abandon,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Hold => write!(f, "hold"),
            Action::Exercise => write!(f, "exercise"),
            Action::Abandon => write!(f, "abandon"),
        }
    }
}

pub struct SessionRegistry {
    sessions: DashMap<Uuid, Arc<Mutex<GameSession>>>,
    /// Armed timer per session, keyed to the ticket's sequence number
    timers: DashMap<Uuid, (u64, AbortHandle)>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            timers: DashMap::new(),
            ttl,
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Register a freshly built session and start it.
    pub fn start(self: &Arc<Self>, mut session: GameSession) -> Result<SessionView, SessionError> {
        let transition = session.start()?;
        let view = session.view();
        let id = session.id();

        self.sessions.insert(id, Arc::new(Mutex::new(session)));
        self.apply(transition);

        tracing::info!(session_id = %id, product = %view.product, "session started");
        Ok(view)
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView, SessionError> {
        let entry = self.get(id)?;
        let session = entry.lock().await;
        Ok(session.view())
    }

    /// Apply a human action. Actions that arrive outside their window leave
    /// the session untouched and answer with its current view.
    pub async fn act(self: &Arc<Self>, id: Uuid, action: Action) -> Result<SessionView, SessionError> {
        let entry = self.get(id)?;
        let (transition, view) = {
            let mut session = entry.lock().await;
            let outcome = match action {
                Action::Hold => session.hold(),
                Action::Exercise => session.exercise(),
                Action::Abandon => Ok(session.abandon()),
            };
            let transition = match outcome {
                Ok(transition) => transition,
                Err(e) if e.is_benign() => {
                    tracing::debug!(session_id = %id, %action, error = %e, "action ignored");
                    Transition::default()
                }
                Err(e) => return Err(e.into()),
            };
            (transition, session.view())
        };

        self.apply(transition);
        tracing::debug!(session_id = %id, %action, step = view.step, phase = %view.phase, "action applied");
        Ok(view)
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were removed.
    pub fn sweep_idle(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                // Busy sessions are not idle.
                let session = entry.value().try_lock().ok()?;
                let idle = (now - session.updated_at()).to_std().ok()?;
                (idle >= self.ttl).then_some(*entry.key())
            })
            .collect();

        for id in &expired {
            self.sessions.remove(id);
            if let Some((_, (_, handle))) = self.timers.remove(id) {
                handle.abort();
            }
        }

        if !expired.is_empty() {
            tracing::info!(removed = expired.len(), remaining = self.sessions.len(), "swept idle sessions");
        }
        expired.len()
    }

    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                registry.sweep_idle();
            }
        })
    }

    fn get(&self, id: Uuid) -> Result<Arc<Mutex<GameSession>>, SessionError> {
        self.sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::NotFound(id))
    }

    fn apply(self: &Arc<Self>, transition: Transition) {
        if let Some(cancelled) = transition.cancelled {
            if let Some((_, (_, handle))) = self
                .timers
                .remove_if(&cancelled.session_id, |_, (seq, _)| *seq == cancelled.seq)
            {
                handle.abort();
            }
        }
        if let Some(ticket) = transition.scheduled {
            self.arm(ticket);
        }
    }

    fn arm(self: &Arc<Self>, ticket: TimerTicket) {
        let registry = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(ticket.delay).await;
            registry.fire(ticket).await;
        });

        if let Some((seq, previous)) = self
            .timers
            .insert(ticket.session_id, (ticket.seq, task.abort_handle()))
        {
            tracing::debug!(session_id = %ticket.session_id, seq, "superseded timer aborted");
            previous.abort();
        }
    }

    async fn fire(self: Arc<Self>, ticket: TimerTicket) {
        self.timers
            .remove_if(&ticket.session_id, |_, (seq, _)| *seq == ticket.seq);

        let Ok(entry) = self.get(ticket.session_id) else {
            tracing::debug!(session_id = %ticket.session_id, "timer fired for a removed session");
            return;
        };

        let transition = {
            let mut session = entry.lock().await;
            match session.on_timer(&ticket) {
                Ok(transition) => transition,
                Err(e) => {
                    tracing::debug!(session_id = %ticket.session_id, error = %e, "timer ignored");
                    return;
                }
            }
        };
        self.apply(transition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::{
        BarrierInfo, BarrierSpec, ContractKind, ContractMetadata, Difficulty, SessionBundle,
    };
    use duel_engine::{Phase, PlayMode, RevealTiming, Winner};

    fn flat_session(payoffs: Vec<f64>, machine_date: usize) -> GameSession {
        let n = payoffs.len() - 1;
        let bundle = SessionBundle {
            asset_prices: vec![vec![100.0; n + 1]],
            payoffs,
            machine_exercise_date: machine_date,
            barrier: BarrierSpec::none(),
            metadata: ContractMetadata {
                kind: ContractKind::UpAndOutCall,
                name: "UpAndOutCall".to_string(),
                description: String::new(),
                difficulty: Difficulty::Medium,
                strike: 100.0,
                maturity: 1.0,
                nb_dates: n,
                nb_assets: 1,
                barrier: BarrierInfo::default(),
            },
        };
        GameSession::new(bundle, RevealTiming::default()).unwrap()
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_drive_session() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let view = registry.start(flat_session(vec![0.0, 1.0, 2.0, 3.0], 3)).unwrap();
        let id = view.session_id;
        assert_eq!(view.step, 0);
        assert!(!view.actions_enabled);

        wait(700).await;
        let view = registry.view(id).await.unwrap();
        assert_eq!(view.step, 1);
        assert_eq!(view.phase, Phase::Playing(PlayMode::AwaitingHumanInput));

        registry.act(id, Action::Hold).await.unwrap();
        wait(1100).await;
        assert_eq!(registry.view(id).await.unwrap().step, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exercise_fast_forwards_to_result() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let id = registry
            .start(flat_session(vec![0.0, 4.0, 1.0, 1.0, 2.0], 4))
            .unwrap()
            .session_id;
        wait(700).await;

        let view = registry.act(id, Action::Exercise).await.unwrap();
        assert_eq!(view.phase, Phase::Playing(PlayMode::FastForward));

        wait(3 * 350 + 100).await;
        let view = registry.view(id).await.unwrap();
        assert_eq!(view.phase, Phase::Terminated);
        assert_eq!(view.result.unwrap().winner, Winner::Human);
        assert!(registry.timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_cancels_timer() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let id = registry
            .start(flat_session(vec![0.0, 1.0, 2.0, 3.0], 3))
            .unwrap()
            .session_id;
        wait(700).await;

        registry.act(id, Action::Hold).await.unwrap();
        assert!(registry.timers.contains_key(&id));
        let view = registry.act(id, Action::Abandon).await.unwrap();
        assert_eq!(view.phase, Phase::Abandoned);
        assert!(!registry.timers.contains_key(&id));

        wait(2000).await;
        let view = registry.view(id).await.unwrap();
        assert_eq!(view.step, 1);
        assert_eq!(view.phase, Phase::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_phase_action_is_a_noop() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let id = registry
            .start(flat_session(vec![0.0, 1.0, 2.0], 2))
            .unwrap()
            .session_id;

        // Still settling
        let view = registry.act(id, Action::Hold).await.unwrap();
        assert_eq!(view.step, 0);
        assert!(view.human.is_none());
        assert!(!view.actions_enabled);

        // The settle timer is untouched and still lands the session on date 1.
        wait(700).await;
        let view = registry.view(id).await.unwrap();
        assert_eq!(view.step, 1);
        assert!(view.actions_enabled);

        registry.act(id, Action::Exercise).await.unwrap();
        let view = registry.act(id, Action::Exercise).await.unwrap();
        assert_eq!(view.human.unwrap().date, 1);

        let missing = registry.act(Uuid::new_v4(), Action::Hold).await.unwrap_err();
        assert!(matches!(missing, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sweep_removes_idle_sessions() {
        let registry = SessionRegistry::new(Duration::ZERO);
        registry.start(flat_session(vec![0.0, 1.0, 2.0], 2)).unwrap();
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.sweep_idle(), 1);
        assert!(registry.is_empty());
        assert!(registry.timers.is_empty());
    }
}
