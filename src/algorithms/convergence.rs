//! Convergence ladders and the tick-driven scheduler
//!
//! The scheduler is advanced only by ticks. Each tick adds one nominal
//! interval to the elapsed time, however late the timer fired, and then
//! evaluates the mode's ladder against the best accuracy known at that tick.
//!
//! Two ladders exist:
//!
//! - **Coarse**: stop rules pair an accuracy bound with a minimum wait
//!   (≤100 m at once, ≤300 m after 15 s, ≤500 m after 30 s). Progress is a
//!   time component plus an accuracy bonus.
//! - **Precise**: nested accuracy steps map the latest reading to a progress
//!   value, and the last step stops the session.
//!
//! Reported progress never decreases between ticks.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stop once accuracy is within `max_accuracy_m` and `min_elapsed_secs` have passed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRule {
    pub max_accuracy_m: f32,
    pub min_elapsed_secs: u64,
}

/// Progress bonus for a best accuracy within `max_accuracy_m`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyBonus {
    pub max_accuracy_m: f32,
    pub bonus: u8,
}

/// Multi-candidate ladder for network positioning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseLadder {
    /// Checked in order; the first match stops the session
    pub stop_rules: Vec<StopRule>,
    /// Time over which the time component runs from 0 to 100 (seconds)
    pub progress_horizon_secs: u64,
    /// Progress cap while no candidate has arrived
    pub searching_cap: u8,
    /// Cap on the time component once candidates exist
    pub time_cap: u8,
    /// Tiers in ascending accuracy bound; the first match applies
    pub bonuses: Vec<AccuracyBonus>,
}

impl Default for CoarseLadder {
    fn default() -> Self {
        Self {
            stop_rules: vec![
                StopRule { max_accuracy_m: 100.0, min_elapsed_secs: 0 },
                StopRule { max_accuracy_m: 300.0, min_elapsed_secs: 15 },
                StopRule { max_accuracy_m: 500.0, min_elapsed_secs: 30 },
            ],
            progress_horizon_secs: 45,
            searching_cap: 30,
            time_cap: 90,
            bonuses: vec![
                AccuracyBonus { max_accuracy_m: 100.0, bonus: 10 },
                AccuracyBonus { max_accuracy_m: 200.0, bonus: 8 },
                AccuracyBonus { max_accuracy_m: 300.0, bonus: 6 },
                AccuracyBonus { max_accuracy_m: 500.0, bonus: 4 },
                AccuracyBonus { max_accuracy_m: 1000.0, bonus: 2 },
            ],
        }
    }
}

impl CoarseLadder {
    fn time_component(&self, elapsed_secs: u64) -> u64 {
        elapsed_secs.saturating_mul(100) / self.progress_horizon_secs.max(1)
    }

    fn bonus(&self, accuracy_m: f32) -> u64 {
        self.bonuses
            .iter()
            .find(|tier| accuracy_m <= tier.max_accuracy_m)
            .map_or(0, |tier| tier.bonus as u64)
    }

    fn progress(&self, best_accuracy: Option<f32>, elapsed_secs: u64) -> u8 {
        let time = self.time_component(elapsed_secs);
        let progress = match best_accuracy {
            None => time.min(self.searching_cap as u64),
            Some(accuracy) => time.min(self.time_cap as u64) + self.bonus(accuracy),
        };
        progress.min(100) as u8
    }

    fn accuracy_reached(&self, accuracy: f32, elapsed_secs: u64) -> bool {
        self.stop_rules
            .iter()
            .any(|rule| accuracy <= rule.max_accuracy_m && elapsed_secs >= rule.min_elapsed_secs)
    }
}

/// One rung of the precise ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStep {
    /// Whole meters
    pub max_accuracy_m: u32,
    pub progress: u8,
}

/// Single-reading ladder for the high-power feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreciseLadder {
    /// Descending accuracy bounds; evaluation stops at the first step not crossed
    pub steps: Vec<ProgressStep>,
    /// Accuracy that completes the session (whole meters)
    pub stop_accuracy_m: u32,
}

impl Default for PreciseLadder {
    fn default() -> Self {
        Self {
            steps: vec![
                ProgressStep { max_accuracy_m: 1000, progress: 20 },
                ProgressStep { max_accuracy_m: 500, progress: 30 },
                ProgressStep { max_accuracy_m: 100, progress: 40 },
                ProgressStep { max_accuracy_m: 50, progress: 50 },
                ProgressStep { max_accuracy_m: 40, progress: 70 },
                ProgressStep { max_accuracy_m: 30, progress: 80 },
            ],
            stop_accuracy_m: 30,
        }
    }
}

impl PreciseLadder {
    /// Accuracy truncated to whole meters; non-finite readings never cross a step
    fn whole_meters(accuracy: f32) -> u32 {
        if accuracy.is_finite() {
            accuracy.max(0.0) as u32
        } else {
            u32::MAX
        }
    }

    fn progress(&self, meters: u32) -> u8 {
        self.steps
            .iter()
            .take_while(|step| meters <= step.max_accuracy_m)
            .last()
            .map_or(0, |step| step.progress)
    }
}

/// Mode-specific convergence policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConvergenceLadder {
    Coarse(CoarseLadder),
    Precise(PreciseLadder),
}

/// Why a session stopped successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The ladder's accuracy condition was met
    AccuracyReached,
    /// The time bound passed with a fix in hand
    BestEffort,
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Converged(StopReason),
    /// The time bound passed without any fix
    TimedOut,
}

impl Decision {
    pub fn is_stop(&self) -> bool {
        !matches!(self, Decision::Continue)
    }
}

impl ConvergenceLadder {
    /// Evaluate a best accuracy at `elapsed_secs`.
    ///
    /// Returns the raw progress (before ratcheting) and the decision.
    pub fn evaluate(
        &self,
        best_accuracy: Option<f32>,
        elapsed_secs: u64,
        timeout_secs: Option<u64>,
    ) -> (u8, Decision) {
        let timed_out = timeout_secs.is_some_and(|limit| elapsed_secs >= limit);
        let expired = |progress: u8| {
            if timed_out {
                match best_accuracy {
                    Some(_) => (progress, Decision::Converged(StopReason::BestEffort)),
                    None => (progress, Decision::TimedOut),
                }
            } else {
                (progress, Decision::Continue)
            }
        };

        match self {
            ConvergenceLadder::Coarse(ladder) => {
                let progress = ladder.progress(best_accuracy, elapsed_secs);
                match best_accuracy {
                    Some(accuracy) if ladder.accuracy_reached(accuracy, elapsed_secs) => {
                        (progress, Decision::Converged(StopReason::AccuracyReached))
                    }
                    _ => expired(progress),
                }
            }
            ConvergenceLadder::Precise(ladder) => match best_accuracy {
                Some(accuracy) => {
                    let meters = PreciseLadder::whole_meters(accuracy);
                    if meters <= ladder.stop_accuracy_m {
                        (100, Decision::Converged(StopReason::AccuracyReached))
                    } else {
                        expired(ladder.progress(meters))
                    }
                }
                None => expired(0),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ConvergenceLadder::Coarse(ladder) => ladder.stop_rules.is_empty(),
            ConvergenceLadder::Precise(ladder) => ladder.steps.is_empty(),
        }
    }
}

/// Result of advancing the scheduler by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub elapsed_secs: u64,
    pub progress: u8,
    pub decision: Decision,
}

/// Tick-driven convergence evaluator for one session
#[derive(Debug, Clone)]
pub struct ConvergenceScheduler {
    ladder: ConvergenceLadder,
    tick_interval: Duration,
    timeout_secs: Option<u64>,
    elapsed: Duration,
    ticks: u32,
    progress: u8,
}

impl ConvergenceScheduler {
    pub fn new(ladder: ConvergenceLadder, tick_interval: Duration, timeout_secs: Option<u64>) -> Self {
        Self {
            ladder,
            tick_interval,
            timeout_secs,
            elapsed: Duration::ZERO,
            ticks: 0,
            progress: 0,
        }
    }

    /// Advance one nominal interval and evaluate `best_accuracy`
    pub fn tick(&mut self, best_accuracy: Option<f32>) -> Evaluation {
        self.elapsed += self.tick_interval;
        self.ticks += 1;

        let elapsed_secs = self.elapsed.as_secs();
        let (computed, decision) = self.ladder.evaluate(best_accuracy, elapsed_secs, self.timeout_secs);

        self.progress = match decision {
            Decision::Converged(_) => 100,
            _ => computed.max(self.progress),
        };

        Evaluation {
            elapsed_secs,
            progress: self.progress,
            decision,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}
