use std::path::Path;

use anyhow::Context as _;
use rampr_core::{ExitCode, RunHooks, ScenarioConfig};

use crate::cli::{RunArgs, ValidateArgs};
use crate::output;
use crate::run_error::RunError;
use crate::scenario_yaml::ScenarioYaml;
use crate::workloads::auth::AuthWorkload;
use crate::workloads::crud::CrudWorkload;

const DEFAULT_API_URL: &str = "http://localhost:3000";

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let (doc, config) = load_scenario(&args.scenario)
        .await
        .map_err(RunError::InvalidInput)?;

    let mut config = config;
    if let Some(deadline) = args.deadline {
        config.deadline = Some(deadline);
    }
    if let Some(pacing) = args.pacing {
        config.pacing = Some(pacing);
    }
    config
        .validate()
        .context("invalid scenario")
        .map_err(RunError::InvalidInput)?;

    let workload = args.workload.as_deref().unwrap_or(doc.workload.as_str());
    let api_url = args
        .api_url
        .clone()
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let hooks = RunHooks {
        on_tick: out.progress(),
        ..RunHooks::default()
    };

    let report = match workload {
        "auth" => dispatch(config, AuthWorkload::new(api_url), hooks).await?,
        "crud" => dispatch(config, CrudWorkload::new(api_url), hooks).await?,
        other => {
            return Err(RunError::InvalidInput(anyhow::anyhow!(
                "unknown workload `{other}` (auth | crud)"
            )));
        }
    };

    out.print_report(&report).map_err(RunError::RuntimeError)?;
    Ok(report.exit_code())
}

async fn dispatch<W: rampr_core::Workload>(
    config: ScenarioConfig,
    workload: W,
    hooks: RunHooks,
) -> Result<rampr_core::RunReport, RunError> {
    let registry = std::sync::Arc::new(rampr_core::Registry::default());
    rampr_core::run_with(config, workload, registry, hooks)
        .await
        .map_err(|err| match err {
            rampr_core::Error::Config(e) => RunError::InvalidInput(e.into()),
            e @ rampr_core::Error::Setup(_) => RunError::SetupFailed(anyhow::Error::new(e)),
            e => RunError::RuntimeError(anyhow::Error::new(e)),
        })
}

pub async fn validate(args: ValidateArgs) -> anyhow::Result<()> {
    let (doc, config) = load_scenario(&args.scenario).await?;
    config.validate().context("invalid scenario")?;

    if !matches!(doc.workload.as_str(), "auth" | "crud") {
        anyhow::bail!("unknown workload `{}` (auth | crud)", doc.workload);
    }

    eprintln!(
        "ok scenario={} stages={} peak={} duration={:?}",
        config.name,
        config.stages.len(),
        config.max_target(),
        config.total_duration()
    );
    Ok(())
}

async fn load_scenario(path: &Path) -> anyhow::Result<(ScenarioYaml, ScenarioConfig)> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read scenario file: {}", path.display()))?;
    let doc = ScenarioYaml::parse(&raw)
        .with_context(|| format!("invalid scenario file: {}", path.display()))?;
    let config = doc.clone().into_config(path)?;
    Ok((doc, config))
}
