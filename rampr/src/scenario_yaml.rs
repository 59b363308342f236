use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use rampr_core::{NoDataPolicy, RampMode, ScenarioConfig, Stage, ThresholdSpec};
use serde::{Deserialize, Serialize};

/// On-disk scenario document. Durations accept humantime strings
/// ("30s", "1m 30s") or plain numbers of seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScenarioYaml {
    /// Scenario name; defaults to the file stem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Workload executed per iteration (auth | crud).
    pub workload: String,

    /// Target concurrency at t=0.
    #[serde(rename = "startTarget", default)]
    pub start_target: u64,

    pub stages: Vec<StageYaml>,

    /// Ramp shape: linear | step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ramp: Option<String>,

    /// Scheduler tick interval.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tick: Option<YamlDuration>,

    /// Fixed delay between a VU's iterations.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pacing: Option<YamlDuration>,

    /// Drain grace period before in-flight iterations are cancelled.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub grace: Option<YamlDuration>,

    /// Hard wall-clock cap on the run.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deadline: Option<YamlDuration>,

    /// Verdict for thresholds whose metric recorded nothing:
    /// pass | fail | skip.
    #[serde(rename = "noData", skip_serializing_if = "Option::is_none")]
    pub no_data: Option<String>,

    /// Threshold expressions keyed by metric name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub thresholds: BTreeMap<String, ThresholdExprYaml>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StageYaml {
    pub target: u64,

    #[serde(default)]
    pub duration: YamlDuration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum ThresholdExprYaml {
    One(String),
    Many(Vec<String>),
}

impl ThresholdExprYaml {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl From<Duration> for YamlDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl Serialize for YamlDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl<'de> serde::de::Visitor<'de> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v <= 0 {
                    return Err(E::custom("duration must be positive"));
                }
                Ok(YamlDuration(Duration::from_secs(v as u64)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v <= 0.0 {
                    return Err(E::custom("duration must be a positive, finite number"));
                }
                Ok(YamlDuration(Duration::from_secs_f64(v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v)
            }
        }

        deserializer.deserialize_any(V)
    }
}

impl ScenarioYaml {
    pub(crate) fn parse(raw: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(raw).context("failed to parse scenario yaml")
    }

    /// Build the engine config. The file stem names the scenario when
    /// the document has no explicit name.
    pub(crate) fn into_config(self, path: &Path) -> anyhow::Result<ScenarioConfig> {
        let name = self
            .name
            .clone()
            .or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "scenario".to_string());

        let stages: Vec<Stage> = self
            .stages
            .iter()
            .map(|s| Stage {
                duration: s.duration.into_inner(),
                target: s.target,
            })
            .collect();

        let mut config = ScenarioConfig::new(name, stages);
        config.start_target = self.start_target;

        if let Some(ramp) = &self.ramp {
            config.ramp = ramp
                .parse::<RampMode>()
                .map_err(|_| anyhow::anyhow!("unknown ramp mode `{ramp}` (linear | step)"))?;
        }
        if let Some(no_data) = &self.no_data {
            config.no_data = no_data.parse::<NoDataPolicy>().map_err(|_| {
                anyhow::anyhow!("unknown noData policy `{no_data}` (pass | fail | skip)")
            })?;
        }
        if let Some(tick) = self.tick {
            config.tick = tick.into_inner();
        }
        config.pacing = self.pacing.map(YamlDuration::into_inner);
        if let Some(grace) = self.grace {
            config.grace = grace.into_inner();
        }
        config.deadline = self.deadline.map(YamlDuration::into_inner);

        config.thresholds = self
            .thresholds
            .into_iter()
            .map(|(metric, exprs)| ThresholdSpec {
                metric,
                expressions: exprs.into_vec(),
            })
            .collect();

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
name: books-load
workload: crud
startTarget: 0
stages:
  - { duration: 30s, target: 10 }
  - { duration: 1m, target: 10 }
  - { duration: 30s, target: 0 }
tick: 500ms
grace: 15s
noData: skip
thresholds:
  iteration_duration:
    - "p(95)<1000"
    - "p(99)<2000"
  errors: "rate<0.05"
"#;

    #[test]
    fn parses_full_document() {
        let doc = match ScenarioYaml::parse(DOC) {
            Ok(doc) => doc,
            Err(err) => panic!("parse failed: {err:#}"),
        };
        assert_eq!(doc.workload, "crud");
        assert_eq!(doc.stages.len(), 3);
        assert_eq!(doc.stages[1].duration.into_inner(), Duration::from_secs(60));
        assert_eq!(doc.thresholds.len(), 2);
    }

    #[test]
    fn into_config_maps_every_field() {
        let doc = match ScenarioYaml::parse(DOC) {
            Ok(doc) => doc,
            Err(err) => panic!("parse failed: {err:#}"),
        };
        let config = match doc.into_config(Path::new("scenarios/books-load.yaml")) {
            Ok(c) => c,
            Err(err) => panic!("conversion failed: {err:#}"),
        };
        assert_eq!(config.name, "books-load");
        assert_eq!(config.tick, Duration::from_millis(500));
        assert_eq!(config.grace, Duration::from_secs(15));
        assert_eq!(config.no_data, NoDataPolicy::Skip);
        assert_eq!(config.max_target(), 10);
        assert_eq!(config.total_duration(), Duration::from_secs(120));
        assert_eq!(config.thresholds.len(), 2);
        let errors = config
            .thresholds
            .iter()
            .find(|t| t.metric == "errors")
            .map(|t| t.expressions.clone());
        assert_eq!(errors, Some(vec!["rate<0.05".to_string()]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn name_defaults_to_file_stem() {
        let doc = match ScenarioYaml::parse("workload: auth\nstages:\n  - { duration: 10s, target: 1 }\n") {
            Ok(doc) => doc,
            Err(err) => panic!("parse failed: {err:#}"),
        };
        let config = match doc.into_config(Path::new("demo/spike.yaml")) {
            Ok(c) => c,
            Err(err) => panic!("conversion failed: {err:#}"),
        };
        assert_eq!(config.name, "spike");
    }

    #[test]
    fn unknown_ramp_mode_is_rejected() {
        let doc = match ScenarioYaml::parse(
            "workload: auth\nramp: sideways\nstages:\n  - { duration: 10s, target: 1 }\n",
        ) {
            Ok(doc) => doc,
            Err(err) => panic!("parse failed: {err:#}"),
        };
        assert!(doc.into_config(Path::new("x.yaml")).is_err());
    }

    #[test]
    fn duration_accepts_plain_seconds() {
        let doc = match ScenarioYaml::parse(
            "workload: auth\nstages:\n  - { duration: 45, target: 3 }\n",
        ) {
            Ok(doc) => doc,
            Err(err) => panic!("parse failed: {err:#}"),
        };
        assert_eq!(doc.stages[0].duration.into_inner(), Duration::from_secs(45));
    }
}
