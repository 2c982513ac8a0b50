//! Path Lab
//!
//! Everything that happens before a session starts: the product catalog,
//! simulated asset paths, per-date payoff timelines, moving barrier schedules
//! and the machine's exercise date. Providers package these into
//! [`duel_core::SessionBundle`]s.

pub mod barrier_path;
pub mod catalog;
pub mod payoff;
pub mod policy;
pub mod provider;
pub mod simulate;

pub use catalog::{BarrierTemplate, Product, ProductCatalog};
pub use payoff::payoff_timeline;
pub use policy::{ExercisePolicy, ThresholdPolicy};
pub use provider::{BundleDirProvider, SimulatedProvider};
pub use simulate::{simulate_paths, GbmParams};
