use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    let unit = unit_str.trim();
    match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary, one record per line.
    HumanReadable,
    /// Emit the final report as a single JSON document on stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "rampr",
    author,
    version,
    about = "Staged load generation with threshold-based pass/fail",
    long_about = "rampr ramps a pool of virtual users through configured stages, aggregates per-iteration metrics, and evaluates thresholds over the final aggregates to decide the run verdict.\n\nA scenario file defines the stages (duration + target concurrency), the workload to execute per iteration, and the thresholds.",
    after_help = "Examples:\n  rampr run scenarios/load.yaml\n  rampr run scenarios/spike.yaml --api-url http://localhost:8080 --output json\n  rampr run scenarios/soak.yaml --deadline 10m\n  rampr validate scenarios/stress.yaml"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a scenario to completion and print the report
    #[command(
        long_about = "Run a scenario file: ramp virtual users through its stages, execute the configured workload per iteration, and evaluate thresholds.\n\nCLI flags override values from the scenario file."
    )]
    Run(RunArgs),

    /// Parse and validate a scenario file without running it
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the scenario file (.yaml)
    pub scenario: PathBuf,

    /// Base URL of the system under test
    #[arg(long, env = "API_URL")]
    pub api_url: Option<String>,

    /// Override the workload named in the scenario (auth | crud)
    #[arg(long)]
    pub workload: Option<String>,

    /// Hard wall-clock cap on the run (e.g. 10s, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub deadline: Option<Duration>,

    /// Override the fixed delay between a VU's iterations
    #[arg(long, value_parser = parse_duration)]
    pub pacing: Option<Duration>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Path to the scenario file (.yaml)
    pub scenario: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(2 * 60 * 60)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn cli_parses_run_with_overrides() {
        let parsed = Cli::try_parse_from([
            "rampr",
            "run",
            "scenarios/load.yaml",
            "--api-url",
            "http://localhost:8080",
            "--workload",
            "crud",
            "--deadline",
            "90s",
            "--pacing",
            "500ms",
            "--output",
            "json",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.scenario, PathBuf::from("scenarios/load.yaml"));
                assert_eq!(args.api_url.as_deref(), Some("http://localhost:8080"));
                assert_eq!(args.workload.as_deref(), Some("crud"));
                assert_eq!(args.deadline, Some(Duration::from_secs(90)));
                assert_eq!(args.pacing, Some(Duration::from_millis(500)));
                assert!(matches!(args.output, OutputFormat::Json));
            }
            Command::Validate(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_parses_validate() {
        let parsed = Cli::try_parse_from(["rampr", "validate", "scenarios/soak.yaml"]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.scenario, PathBuf::from("scenarios/soak.yaml"));
            }
            Command::Run(_) => panic!("expected validate command"),
        }
    }
}
