//! Fixed-step accumulator
//!
//! Real elapsed time goes in, a whole number of simulation steps comes out.
//! The remainder is carried to the next call so long-run step count tracks
//! wall time exactly.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FixedStepClock {
    step: f64,
    accumulator: f64,
}

impl FixedStepClock {
    pub fn new(step: Duration) -> Self {
        Self {
            step: step.as_secs_f64().max(f64::EPSILON),
            accumulator: 0.0,
        }
    }

    /// Add elapsed time and return how many steps are now due
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed.as_secs_f64();
        let mut steps = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }

}
