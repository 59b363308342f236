use std::time::Duration;

use crate::config::{RampMode, Stage};

/// Converts a declarative stage list into an instantaneous target
/// concurrency for any elapsed run time.
#[derive(Debug, Clone)]
pub struct RampSchedule {
    start: u64,
    mode: RampMode,
    stages: Vec<Stage>,
    cumulative_ends: Vec<Duration>,
}

impl RampSchedule {
    pub fn new(start: u64, stages: Vec<Stage>, mode: RampMode) -> Self {
        let mut cumulative_ends = Vec::with_capacity(stages.len());
        let mut acc = Duration::ZERO;
        for s in &stages {
            acc = acc.saturating_add(s.duration);
            cumulative_ends.push(acc);
        }

        Self {
            start,
            mode,
            stages,
            cumulative_ends,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.cumulative_ends
            .last()
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_done(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    pub fn target_at(&self, elapsed: Duration) -> u64 {
        if self.stages.is_empty() {
            return self.start;
        }

        let total = self.total_duration();
        if elapsed >= total {
            return self.stages.last().map(|s| s.target).unwrap_or(self.start);
        }

        // Stage intervals are half-open: an elapsed time equal to a
        // stage's end already belongs to the next stage.
        let idx = match self
            .cumulative_ends
            .binary_search_by(|end| end.cmp(&elapsed))
        {
            Ok(i) => (i + 1).min(self.stages.len() - 1),
            Err(i) => i,
        };

        let stage = &self.stages[idx];
        if self.mode == RampMode::Step {
            return stage.target;
        }

        if elapsed == Duration::ZERO {
            return self.start;
        }

        let stage_end = self.cumulative_ends[idx];
        let stage_start = if idx == 0 {
            Duration::ZERO
        } else {
            self.cumulative_ends[idx - 1]
        };

        let stage_duration = stage_end.saturating_sub(stage_start);
        let stage_elapsed = elapsed.saturating_sub(stage_start);

        let start_target = if idx == 0 {
            self.start
        } else {
            self.stages[idx - 1].target
        };
        let end_target = stage.target;

        if stage_duration.is_zero() {
            return end_target;
        }

        // Linear interpolation across the stage.
        let start_i = start_target as i128;
        let end_i = end_target as i128;
        let delta = end_i - start_i;

        let num = stage_elapsed.as_nanos() as i128;
        let den = stage_duration.as_nanos() as i128;

        let cur = start_i + (delta.saturating_mul(num) / den.max(1));
        cur.clamp(0, u64::MAX as i128) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(secs: u64, target: u64) -> Stage {
        Stage {
            duration: Duration::from_secs(secs),
            target,
        }
    }

    #[test]
    fn linear_ramp_interpolates_within_a_stage() {
        let s = RampSchedule::new(0, vec![stage(10, 10)], RampMode::Linear);

        assert_eq!(s.target_at(Duration::ZERO), 0);
        assert_eq!(s.target_at(Duration::from_secs(5)), 5);
        assert_eq!(s.target_at(Duration::from_secs(9)), 9);
        // At or past the total duration, the last target holds.
        assert_eq!(s.target_at(Duration::from_secs(10)), 10);
        assert_eq!(s.target_at(Duration::from_secs(60)), 10);
    }

    #[test]
    fn ramp_down_returns_toward_zero() {
        let s = RampSchedule::new(
            0,
            vec![stage(10, 10), stage(10, 10), stage(10, 0)],
            RampMode::Linear,
        );

        // Sustain stage holds the previous target.
        assert_eq!(s.target_at(Duration::from_secs(15)), 10);
        // Ramp-down interpolates back to zero.
        assert_eq!(s.target_at(Duration::from_secs(25)), 5);
        assert_eq!(s.target_at(Duration::from_secs(30)), 0);
    }

    #[test]
    fn step_mode_jumps_at_stage_boundaries() {
        let s = RampSchedule::new(0, vec![stage(10, 2), stage(10, 50)], RampMode::Step);

        assert_eq!(s.target_at(Duration::ZERO), 2);
        assert_eq!(s.target_at(Duration::from_secs(5)), 2);
        assert_eq!(s.target_at(Duration::from_millis(9_999)), 2);
        // The boundary instant itself belongs to the next stage.
        assert_eq!(s.target_at(Duration::from_secs(10)), 50);
        assert_eq!(s.target_at(Duration::from_secs(15)), 50);
    }

    #[test]
    fn linear_mode_is_continuous_across_stage_boundaries() {
        let s = RampSchedule::new(0, vec![stage(10, 10), stage(10, 0)], RampMode::Linear);

        assert_eq!(s.target_at(Duration::from_millis(9_999)), 9);
        assert_eq!(s.target_at(Duration::from_secs(10)), 10);
        assert_eq!(s.target_at(Duration::from_secs(11)), 9);
    }

    #[test]
    fn start_target_seeds_the_first_stage() {
        let s = RampSchedule::new(10, vec![stage(10, 0)], RampMode::Linear);

        assert_eq!(s.target_at(Duration::ZERO), 10);
        assert_eq!(s.target_at(Duration::from_secs(5)), 5);
    }

    #[test]
    fn total_duration_sums_stages() {
        let s = RampSchedule::new(
            0,
            vec![stage(30, 10), stage(60, 10), stage(30, 0)],
            RampMode::Linear,
        );
        assert_eq!(s.total_duration(), Duration::from_secs(120));
        assert!(!s.is_done(Duration::from_secs(119)));
        assert!(s.is_done(Duration::from_secs(120)));
    }
}
