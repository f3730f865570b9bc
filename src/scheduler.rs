use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::metrics::MetricBatch;
use crate::providers::circleci::CircleCiClient;
use crate::queue::Classifier;
use crate::sinks::Emitter;

/// Per-cycle settings, shared read-only by every cycle.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub classifier: Classifier,
    pub running_metric: String,
    pub not_running_metric: String,
}

/// How often cycles are started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Once,
    Every {
        interval: Duration,
        /// Skip ticks while this many cycles are still running
        max_concurrent: Option<usize>,
    },
}

/// Drives polling cycles; owns the CircleCI client and the emitter.
pub struct Scheduler {
    fetcher: Arc<CircleCiClient>,
    emitter: Arc<Emitter>,
    config: Arc<CycleConfig>,
}

impl Scheduler {
    pub fn new(fetcher: CircleCiClient, emitter: Emitter, config: CycleConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            emitter: Arc::new(emitter),
            config: Arc::new(config),
        }
    }

    /// Runs according to `schedule`. Periodic schedules never return.
    pub async fn run(&self, schedule: Schedule) {
        match schedule {
            Schedule::Once => {
                run_cycle(&self.fetcher, &self.emitter, &self.config).await;
            }
            Schedule::Every {
                interval,
                max_concurrent,
            } => self.run_every(interval, max_concurrent).await,
        }
    }

    async fn run_every(&self, period: Duration, max_concurrent: Option<usize>) {
        info!("Polling CircleCI every {period:?}");

        let permits = max_concurrent.map(|limit| Arc::new(Semaphore::new(limit)));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let permit = match &permits {
                Some(semaphore) => match Arc::clone(semaphore).try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!("Previous cycles still running, skipping this tick");
                        continue;
                    }
                },
                None => None,
            };

            let fetcher = Arc::clone(&self.fetcher);
            let emitter = Arc::clone(&self.emitter);
            let config = Arc::clone(&self.config);

            tokio::spawn(async move {
                let _permit = permit;
                run_cycle(&fetcher, &emitter, &config).await;
            });
        }
    }
}

/// One poll: fetch, aggregate, emit. Failures are logged and end the cycle.
pub async fn run_cycle(fetcher: &CircleCiClient, emitter: &Emitter, config: &CycleConfig) {
    // failures are logged inside try_run_cycle
    let _ = try_run_cycle(fetcher, emitter, config).await;
}

async fn try_run_cycle(
    fetcher: &CircleCiClient,
    emitter: &Emitter,
    config: &CycleConfig,
) -> Result<MetricBatch> {
    let now = Utc::now();

    let counts = fetcher
        .fetch_queue_counts(&config.classifier)
        .await
        .inspect_err(|e| error!("Failed to get recent builds from CircleCI: {e}"))?;

    info!(
        "running:{}\tnot_running:{}\tqueues:{}",
        counts.running.total_count(),
        counts.not_running.total_count(),
        counts.queue_count()
    );
    if counts.is_empty() {
        info!("No matching queues in recent builds");
    }

    for entry in counts.not_running.entries().filter(|entry| entry.count > 0) {
        debug!("{} has {} jobs waiting", entry.key, entry.count);
    }

    let batch =
        counts.to_metric_batch(now, &config.running_metric, &config.not_running_metric);

    emitter
        .emit(&batch)
        .await
        .inspect_err(|e| error!("Failed to post metrics to Datadog: {e}"))?;

    if !emitter.is_debug() {
        info!(
            "successfully sent metrics at {} to Datadog",
            now.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    Ok(batch)
}
