use std::time::Duration;

use crate::error::ConfigError;
use crate::thresholds::{Threshold, ThresholdSpec, compile_thresholds};

/// One ramp segment: over `duration`, the published target moves toward
/// `target` (linearly or as a step, per [`RampMode`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum RampMode {
    /// Interpolate linearly from the previous stage's target to the
    /// current stage's target across the stage duration.
    #[default]
    Linear,
    /// Jump to the stage's target at the stage boundary.
    Step,
}

/// How a threshold whose metric recorded no samples counts toward the
/// run verdict.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum NoDataPolicy {
    Pass,
    #[default]
    Fail,
    Skip,
}

#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub name: String,
    /// Target concurrency at t=0, ramped toward the first stage's target.
    pub start_target: u64,
    pub stages: Vec<Stage>,
    pub ramp: RampMode,
    /// Scheduler tick interval; the target is recomputed and published
    /// once per tick.
    pub tick: Duration,
    /// Optional fixed delay between a VU's iterations.
    pub pacing: Option<Duration>,
    /// How long in-flight iterations may keep running once the run
    /// starts draining, before they are force-cancelled.
    pub grace: Duration,
    /// Hard wall-clock cap on the run, applied on top of the stage
    /// durations.
    pub deadline: Option<Duration>,
    pub no_data: NoDataPolicy,
    pub thresholds: Vec<ThresholdSpec>,
}

impl ScenarioConfig {
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            name: name.into(),
            start_target: 0,
            stages,
            ramp: RampMode::default(),
            tick: Duration::from_secs(1),
            pacing: None,
            grace: Duration::from_secs(10),
            deadline: None,
            no_data: NoDataPolicy::default(),
            thresholds: Vec::new(),
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |acc, s| acc.saturating_add(s.duration))
    }

    /// Highest target the schedule can ever publish; bounds the number
    /// of workers the pool spawns.
    pub fn max_target(&self) -> u64 {
        self.stages
            .iter()
            .map(|s| s.target)
            .max()
            .unwrap_or(0)
            .max(self.start_target)
    }

    /// Fail-fast validation; parses threshold expressions so malformed
    /// configuration surfaces before any traffic is generated.
    pub fn validate(&self) -> Result<Vec<Threshold>, ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::EmptyStages);
        }
        if self.total_duration().is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.max_target() == 0 {
            return Err(ConfigError::ZeroPeakTarget);
        }
        if self.tick.is_zero() {
            return Err(ConfigError::InvalidTick);
        }

        compile_thresholds(&self.thresholds)
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
    fn validate_rejects_empty_stages() {
        let cfg = ScenarioConfig::new("t", Vec::new());
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyStages)));
    }

    #[test]
    fn validate_rejects_zero_total_duration() {
        let cfg = ScenarioConfig::new("t", vec![stage(0, 5)]);
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroDuration)));
    }

    #[test]
    fn validate_rejects_all_zero_targets() {
        let cfg = ScenarioConfig::new("t", vec![stage(10, 0)]);
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroPeakTarget)));
    }

    #[test]
    fn validate_surfaces_malformed_thresholds_before_run() {
        let mut cfg = ScenarioConfig::new("t", vec![stage(10, 5)]);
        cfg.thresholds = vec![ThresholdSpec {
            metric: "latency".to_string(),
            expressions: vec!["p95 below 100".to_string()],
        }];

        match cfg.validate() {
            Err(ConfigError::InvalidThreshold { metric, .. }) => {
                assert_eq!(metric, "latency");
            }
            other => panic!("expected InvalidThreshold, got {other:?}"),
        }
    }

    #[test]
    fn max_target_covers_start_target() {
        let mut cfg = ScenarioConfig::new("t", vec![stage(10, 5), stage(10, 0)]);
        cfg.start_target = 8;
        assert_eq!(cfg.max_target(), 8);
        assert_eq!(cfg.total_duration(), Duration::from_secs(20));
    }

    #[test]
    fn ramp_mode_parses_from_config_strings() {
        assert_eq!("linear".parse(), Ok(RampMode::Linear));
        assert_eq!("step".parse(), Ok(RampMode::Step));
        assert!("bezier".parse::<RampMode>().is_err());
        assert_eq!("skip".parse(), Ok(NoDataPolicy::Skip));
    }
}
