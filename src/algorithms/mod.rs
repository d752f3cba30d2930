//! Convergence policies

pub mod convergence;

pub use convergence::{
    AccuracyBonus, CoarseLadder, ConvergenceLadder, ConvergenceScheduler, Decision, Evaluation,
    PreciseLadder, ProgressStep, StopReason, StopRule,
};
