//! Duel Engine
//!
//! Session state machine for a human-versus-machine early exercise contest.
//! A session walks one simulated path date by date, takes the human's
//! hold/exercise choices, applies barrier knockouts, discloses the machine's
//! precomputed decision only as the reveal timers allow, and reconciles both
//! outcomes once each party has terminated.

pub mod barrier;
pub mod reconcile;
pub mod reveal;
pub mod session;


pub use barrier::{evaluate, first_knockout};
pub use reconcile::{ContestResult, ResultReconciler, Termination, Winner};
pub use reveal::{RevealScheduler, RevealTiming, TimerKind, TimerTicket};
pub use session::{
    GameSession, MachineView, Phase, PlayMode, RevealStage, SessionView, Transition,
};
