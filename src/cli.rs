use anyhow::{bail, Context, Result};
use clap::builder::FalseyValueParser;
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::Token;
use crate::config::Config;
use crate::providers::circleci::CircleCiClient;
use crate::queue::{Classifier, TargetFilter};
use crate::scheduler::{CycleConfig, Schedule, Scheduler};
use crate::sinks::{DatadogClient, Emitter};

#[derive(Parser, Debug)]
#[command(name = "queuelens")]
#[command(author, version, about = "Reports CircleCI queue depth to Datadog", long_about = None)]
pub struct Cli {
    /// Path to a TOML, JSON or YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated list of usernames to check queue
    #[arg(short, long)]
    usernames: Option<String>,

    /// Interval to check CircleCI queue in seconds [default: 60]
    #[arg(short, long)]
    interval: Option<u64>,

    /// Exits after the first check
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Number of recent builds to request per check [default: 100]
    #[arg(short, long)]
    limit: Option<usize>,

    #[arg(long, env = "CIRCLECI_API_TOKEN", hide_env_values = true)]
    circleci_token: Option<String>,

    #[arg(long)]
    circleci_url: Option<String>,

    #[arg(long, env = "DATADOG_API_KEY", hide_env_values = true)]
    datadog_api_key: Option<String>,

    #[arg(long)]
    datadog_url: Option<String>,

    /// Only report the lifecycle a job is in, without zero series for the other
    #[arg(long, default_value_t = false)]
    no_zero_fill: bool,

    /// Skip a tick while this many checks are still in flight
    #[arg(long)]
    max_concurrent_cycles: Option<usize>,

    /// Print metrics to stderr instead of sending them to Datadog
    #[arg(long, env = "QUEUELENS_DEBUG", value_parser = FalseyValueParser::new())]
    debug: bool,
}

/// Fully resolved runtime settings: config file values with flags applied.
#[derive(Debug)]
pub struct Settings {
    pub circleci_url: String,
    pub circleci_token: Option<Token>,
    pub limit: usize,
    pub datadog_url: String,
    pub datadog_api_key: Option<Token>,
    pub debug: bool,
    pub schedule: Schedule,
    pub cycle: CycleConfig,
}

impl Cli {
    /// Merges the flags over `config` and validates the result.
    pub fn resolve(&self, config: Config) -> Result<Settings> {
        let Config {
            circleci,
            datadog,
            schedule,
            queue,
        } = config;

        let once = self.once || schedule.once;
        let interval = self.interval.unwrap_or(schedule.interval);
        let max_concurrent = self.max_concurrent_cycles.or(schedule.max_concurrent_cycles);

        let schedule = if once {
            if self.interval.is_some() {
                warn!("--interval has no effect with --once mode");
            }
            Schedule::Once
        } else {
            if interval == 0 {
                bail!("Interval must be at least 1 second");
            }
            if max_concurrent == Some(0) {
                bail!("max-concurrent-cycles must be at least 1");
            }
            Schedule::Every {
                interval: Duration::from_secs(interval),
                max_concurrent,
            }
        };

        let filter = match &self.usernames {
            Some(list) => TargetFilter::parse(list),
            None => TargetFilter::new(&queue.usernames),
        };

        let debug = self.debug;
        let datadog_api_key = self
            .datadog_api_key
            .clone()
            .or(datadog.api_key)
            .map(Token::from);

        if datadog_api_key.is_none() && !debug {
            bail!("Datadog API key is required (set DATADOG_API_KEY or --datadog-api-key)");
        }

        Ok(Settings {
            circleci_url: self.circleci_url.clone().unwrap_or(circleci.base_url),
            circleci_token: self
                .circleci_token
                .clone()
                .or(circleci.token)
                .map(Token::from),
            limit: self.limit.unwrap_or(circleci.limit),
            datadog_url: self.datadog_url.clone().unwrap_or(datadog.base_url),
            datadog_api_key,
            debug,
            schedule,
            cycle: CycleConfig {
                classifier: Classifier {
                    filter,
                    zero_fill: queue.zero_fill && !self.no_zero_fill,
                },
                running_metric: datadog.running_metric,
                not_running_metric: datadog.not_running_metric,
            },
        })
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let settings = self.resolve(config)?;
        debug!("Resolved settings: {settings:?}");

        if settings.circleci_token.is_none() {
            warn!("No CircleCI token configured, only public builds will be visible");
        }

        let fetcher = CircleCiClient::new(
            &settings.circleci_url,
            settings.circleci_token,
            settings.limit,
        )
        .context("Failed to set up CircleCI client")?;

        let emitter = match (settings.debug, settings.datadog_api_key) {
            (false, Some(api_key)) => Emitter::Datadog(
                DatadogClient::new(&settings.datadog_url, api_key)
                    .context("Failed to set up Datadog client")?,
            ),
            _ => {
                info!("Debug mode: metrics will be printed instead of sent");
                Emitter::Debug
            }
        };

        if !settings.cycle.classifier.filter.is_empty() {
            info!("Restricting queue checks to the configured usernames");
        }

        Scheduler::new(fetcher, emitter, settings.cycle)
            .run(settings.schedule)
            .await;

        Ok(())
    }
}
