use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rampr_metrics::{MetricValues, Registry};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::config::ScenarioConfig;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::pool::{PoolCounts, spawn_workers};
use crate::schedule::RampSchedule;
use crate::signal::Signal;
use crate::summary::RunReport;
use crate::thresholds::evaluate_thresholds;
use crate::workload::Workload;

/// Run lifecycle states, in order. `Draining` stops new iterations
/// while in-flight ones finish; `Terminated` triggers teardown exactly
/// once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Phase {
    Pending,
    Running,
    Draining,
    Terminated,
}

/// Published once per scheduler tick.
#[derive(Debug, Clone, Copy)]
pub struct TickUpdate {
    pub elapsed: Duration,
    pub target: u64,
    pub live: u64,
}

pub type TickFn = Arc<dyn Fn(TickUpdate) + Send + Sync + 'static>;
pub type PhaseFn = Arc<dyn Fn(Phase) + Send + Sync + 'static>;

/// Optional observation and control hooks for a run.
#[derive(Default, Clone)]
pub struct RunHooks {
    /// External cancellation; fires the same path as the deadline.
    pub cancel: Option<Arc<Signal>>,
    pub on_tick: Option<TickFn>,
    pub on_phase: Option<PhaseFn>,
}

/// Run a scenario against a workload with a fresh metric registry.
pub async fn run<W: Workload>(config: ScenarioConfig, workload: W) -> Result<RunReport> {
    run_with(config, workload, Arc::new(Registry::default()), RunHooks::default()).await
}

/// Run a scenario with an injected registry and hooks. The registry is
/// frozen once the run terminates, before thresholds are evaluated.
pub async fn run_with<W: Workload>(
    config: ScenarioConfig,
    workload: W,
    registry: Arc<Registry>,
    hooks: RunHooks,
) -> Result<RunReport> {
    let thresholds = config.validate()?;
    let schedule = RampSchedule::new(config.start_target, config.stages.clone(), config.ramp);

    let set_phase = |phase: Phase| {
        if let Some(f) = &hooks.on_phase {
            f(phase);
        }
    };

    // Setup runs exactly once, before any VU or metric exists. A
    // failure here is fatal and the registry stays empty; the executor
    // (which registers the built-in metrics) is only built afterwards.
    set_phase(Phase::Pending);
    let ctx = Arc::new(
        workload
            .setup()
            .await
            .map_err(|err| Error::Setup(err.to_string()))?,
    );
    let executor = Arc::new(Executor::new(workload, registry.clone())?);

    let (target_tx, target_rx) = watch::channel(0u64);
    let stop = Arc::new(Signal::new());
    let hard_cancel = Arc::new(Signal::new());
    let counts = Arc::new(PoolCounts::default());

    let mut workers = JoinSet::new();
    spawn_workers(
        &mut workers,
        executor.clone(),
        ctx.clone(),
        config.max_target(),
        target_rx,
        stop.clone(),
        hard_cancel.clone(),
        config.pacing,
        counts.clone(),
    );

    set_phase(Phase::Running);
    let started = Instant::now();

    {
        let mut interval = tokio::time::interval(config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            match &hooks.cancel {
                Some(cancel) => {
                    tokio::select! {
                        _ = interval.tick() => {}
                        _ = cancel.wait() => break,
                    }
                }
                None => {
                    interval.tick().await;
                }
            }

            let elapsed = started.elapsed();
            if schedule.is_done(elapsed) {
                break;
            }
            if let Some(deadline) = config.deadline
                && elapsed >= deadline
            {
                break;
            }

            let target = schedule.target_at(elapsed);
            let _ = target_tx.send(target);

            if let Some(on_tick) = &hooks.on_tick {
                on_tick(TickUpdate {
                    elapsed,
                    target,
                    live: counts.live(),
                });
            }
        }
    }

    // Draining: publish target 0 and stop new iterations; in-flight
    // ones get the grace period, then a hard cancel.
    set_phase(Phase::Draining);
    let _ = target_tx.send(0);
    stop.fire();

    let mut drain = pin!(async {
        while let Some(res) = workers.join_next().await {
            res?;
        }
        Ok::<(), Error>(())
    });
    match tokio::time::timeout(config.grace, drain.as_mut()).await {
        Ok(res) => res?,
        Err(_) => {
            hard_cancel.fire();
            drain.as_mut().await?;
        }
    }

    set_phase(Phase::Terminated);
    let elapsed = started.elapsed();

    let teardown_error = executor.teardown(&ctx).await;
    registry.freeze();

    let metrics = registry.snapshot();
    let thresholds = evaluate_thresholds(&thresholds, &metrics, config.no_data);

    let iterations_total = counter_value(&metrics, "iterations");
    let timeouts_total = counter_value(&metrics, "iteration_timeouts");

    Ok(RunReport {
        scenario: config.name,
        elapsed,
        iterations_total,
        timeouts_total,
        teardown_error,
        metrics,
        thresholds,
    })
}

fn counter_value(metrics: &[rampr_metrics::MetricSummary], name: &str) -> u64 {
    metrics
        .iter()
        .find(|m| m.name == name)
        .and_then(|m| match &m.values {
            MetricValues::Counter { value } => Some(value.round() as u64),
            _ => None,
        })
        .unwrap_or(0)
}
