//! Gold-cap simulation engine — reallocation of displaced competitors
//!
//! Caps the highest-payout ("gold") competition at a retain count, pushes the
//! displaced competitors into the normal competitions with payout-weighted
//! draws, and measures the resulting change in top-K welfare.
//! Provides:
//! - Roster builder over a pluggable leaderboard source
//! - Top-K welfare calculator
//! - Single and multi assignment reallocation strategies
//! - Seeded, parallel simulation driver
//! - Retain count sweep

pub mod error;
pub mod ordering;
pub mod payout;
pub mod reallocation;
pub mod roster;
pub mod sampling;
pub mod simulation;
pub mod sweep;
pub mod types;
pub mod welfare;

// Re-exports for convenience
pub use error::{checked_count, EngineError, EngineResult};
pub use ordering::RosterOrdering;
pub use payout::{CompetitionPayoutTable, PayoutWeights};
pub use reallocation::{
    build_assignment_strategy, reallocate, AssignmentPolicy, AssignmentStrategy, MultiAssignment,
    SingleAssignment,
};
pub use roster::{build_roster, InMemoryLeaderboards, LeaderboardSource, Roster};
pub use simulation::{
    prepare_baseline, run_simulation, run_simulation_with_progress, simulate_baseline, Baseline,
    RunProgress, RunStatus, SimulationConfig, SimulationInput,
};
pub use sweep::{
    find_best_retain_count, find_best_retain_count_with_progress, stepped_range, sweep_with,
    SweepCandidate, SweepOutcome,
};
pub use types::*;
pub use welfare::{compute_welfare, welfare_by_competition};
