use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::executor::Executor;
use crate::signal::Signal;
use crate::workload::{VuInfo, Workload};

/// Live-VU accounting shared between the pool's workers and the
/// scheduler tick loop.
#[derive(Debug, Default)]
pub(crate) struct PoolCounts {
    live: AtomicU64,
}

impl PoolCounts {
    pub(crate) fn live(&self) -> u64 {
        self.live.load(Ordering::Relaxed)
    }
}

/// Spawn one worker task per potential VU (indexes `1..=max_target`).
/// A worker is active while the published target covers its index, so
/// a falling target retires the highest-indexed (most recently
/// activated) workers first, each finishing its current iteration.
#[allow(clippy::too_many_arguments)]
pub(crate) fn spawn_workers<W: Workload>(
    set: &mut JoinSet<()>,
    executor: Arc<Executor<W>>,
    ctx: Arc<W::Context>,
    max_target: u64,
    target_rx: watch::Receiver<u64>,
    stop: Arc<Signal>,
    hard_cancel: Arc<Signal>,
    pacing: Option<Duration>,
    counts: Arc<PoolCounts>,
) {
    for index in 1..=max_target {
        set.spawn(worker(
            index,
            executor.clone(),
            ctx.clone(),
            target_rx.clone(),
            stop.clone(),
            hard_cancel.clone(),
            pacing,
            counts.clone(),
        ));
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker<W: Workload>(
    index: u64,
    executor: Arc<Executor<W>>,
    ctx: Arc<W::Context>,
    mut target_rx: watch::Receiver<u64>,
    stop: Arc<Signal>,
    hard_cancel: Arc<Signal>,
    pacing: Option<Duration>,
    counts: Arc<PoolCounts>,
) {
    let mut iteration: u64 = 0;

    loop {
        // Wait until the published target covers this worker's index.
        loop {
            if stop.is_fired() {
                return;
            }
            if *target_rx.borrow_and_update() >= index {
                break;
            }
            tokio::select! {
                changed = target_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = stop.wait() => return,
            }
        }

        counts.live.fetch_add(1, Ordering::Relaxed);

        // Iterate until retired (target dropped below our index) or
        // the run starts draining. Iterations are never interrupted
        // mid-execution except by the drain hard-cancel.
        while !stop.is_fired() && *target_rx.borrow() >= index {
            iteration += 1;
            let vu = VuInfo { id: index, iteration };

            tokio::select! {
                _ = executor.run_iteration(&ctx, vu) => {}
                _ = hard_cancel.wait() => {
                    executor.record_timeout();
                    counts.live.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
            }

            if let Some(pacing) = pacing {
                tokio::select! {
                    _ = tokio::time::sleep(pacing) => {}
                    _ = stop.wait() => {}
                }
            }
        }

        counts.live.fetch_sub(1, Ordering::Relaxed);
        if stop.is_fired() {
            return;
        }
    }
}
