use std::time::Duration;

use tokio::time::Instant;

/// The last stretch of any wait is slept in one go rather than split into steps.
pub const FINE_WAIT_WINDOW: Duration = Duration::from_secs(1);

/// How the scheduler and the wrapper sleep towards absolute targets.
///
/// Every iteration recomputes the time remaining until the target instead of adding up sleep
/// durations, so errors from individual sleeps never accumulate across a long experiment. Sleeps
/// are capped at `step` so that a caller supplied check can run between them, and once the
/// target is within both [FINE_WAIT_WINDOW] and `step` the rest is slept in one go. Targets in
/// the past are due immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitDiscipline {
    step: Duration,
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The target was reached, `lag` after it was due.
    Reached { lag: Duration },
    /// The caller's check asked to stop before the target.
    Stopped,
}

impl Default for WaitDiscipline {
    fn default() -> Self {
        Self::new(FINE_WAIT_WINDOW)
    }
}

impl WaitDiscipline {
    pub fn new(step: Duration) -> Self {
        Self {
            step: step.max(Duration::from_millis(1)),
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Sleep until `target` and return how late the wake-up was.
    pub async fn wait_until(&self, target: Instant) -> Duration {
        match self.wait_until_or_stop(target, || false).await {
            WaitOutcome::Reached { lag } => lag,
            WaitOutcome::Stopped => Duration::ZERO,
        }
    }

    /// Sleep until `target`, consulting `stop` before every step.
    pub async fn wait_until_or_stop<F>(&self, target: Instant, mut stop: F) -> WaitOutcome
    where
        F: FnMut() -> bool,
    {
        loop {
            if stop() {
                return WaitOutcome::Stopped;
            }

            let now = Instant::now();
            // A target behind us saturates to zero instead of underflowing.
            let remaining = target.saturating_duration_since(now);
            if remaining.is_zero() {
                return WaitOutcome::Reached {
                    lag: now.saturating_duration_since(target),
                };
            }

            if remaining <= FINE_WAIT_WINDOW && remaining <= self.step {
                tokio::time::sleep(remaining).await;
                return WaitOutcome::Reached {
                    lag: Instant::now().saturating_duration_since(target),
                };
            }

            let nap = match remaining.checked_sub(FINE_WAIT_WINDOW) {
                Some(coarse) if !coarse.is_zero() => coarse.min(self.step),
                _ => self.step,
            };
            tokio::time::sleep(nap).await;
        }
    }

    /// Pause for a fixed duration, measured from now.
    pub async fn pause(&self, duration: Duration) {
        self.wait_until(Instant::now() + duration).await;
    }
}
