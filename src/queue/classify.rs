use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::debug;

use crate::error::Result;
use crate::metrics::MetricBatch;
use crate::providers::circleci::{JobRecord, Lifecycle};

use super::counter::{GroupKey, JobCounter};

/// Allow-list of account names whose jobs are counted.
///
/// An empty list matches every account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    usernames: HashSet<String>,
}

impl TargetFilter {
    pub fn new<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let usernames = usernames
            .into_iter()
            .map(|name| name.as_ref().trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();

        Self { usernames }
    }

    /// Parses a comma-separated list such as `"org-a,org-b"`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.usernames.is_empty()
    }

    pub fn matches(&self, job: &JobRecord) -> bool {
        self.usernames.is_empty() || self.usernames.contains(&job.username)
    }
}

/// Controls how job records are folded into [`QueueCounts`].
#[derive(Debug, Clone)]
pub struct Classifier {
    pub filter: TargetFilter,
    /// Keep a zero entry in the opposite bucket for every queue seen
    pub zero_fill: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            filter: TargetFilter::default(),
            zero_fill: true,
        }
    }
}

/// Running and not-running counters for one polling cycle.
#[derive(Debug, Default)]
pub struct QueueCounts {
    pub running: JobCounter,
    pub not_running: JobCounter,
}

impl QueueCounts {
    pub fn new() -> Self {
        Self {
            running: JobCounter::new(),
            not_running: JobCounter::new(),
        }
    }

    /// Number of distinct queues seen in either bucket.
    pub fn queue_count(&self) -> usize {
        let running: HashSet<&GroupKey> = self.running.entries().map(|entry| &entry.key).collect();
        let not_running_only = self
            .not_running
            .entries()
            .filter(|entry| !running.contains(&entry.key))
            .count();
        self.running.len() + not_running_only
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty() && self.not_running.is_empty()
    }

    /// Folds a single job into the counters according to its lifecycle.
    pub fn record(&mut self, job: &JobRecord, classifier: &Classifier) {
        if !classifier.filter.matches(job) {
            return;
        }

        match (job.lifecycle, classifier.zero_fill) {
            (Lifecycle::Running, zero_fill) => {
                self.running.increment(job);
                if zero_fill {
                    self.not_running.ensure(job);
                }
            }
            (Lifecycle::NotRunning, zero_fill) => {
                self.not_running.increment(job);
                if zero_fill {
                    self.running.ensure(job);
                }
            }
            (Lifecycle::Other, true) => {
                self.running.ensure(job);
                self.not_running.ensure(job);
            }
            (Lifecycle::Other, false) => {}
        }
    }

    pub fn record_page(&mut self, jobs: &[JobRecord], classifier: &Classifier) {
        for job in jobs {
            self.record(job, classifier);
        }
    }

    /// Folds every decoded page, stopping at the first decode failure.
    ///
    /// Counts from earlier pages are dropped along with `self` when an error
    /// is returned.
    pub fn from_pages<I>(pages: I, classifier: &Classifier) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Vec<JobRecord>>>,
    {
        let mut counts = Self::new();

        for (index, page) in pages.into_iter().enumerate() {
            let page = page?;
            debug!("Folding page {} with {} jobs", index + 1, page.len());
            counts.record_page(&page, classifier);
        }

        Ok(counts)
    }

    pub fn to_metric_batch(
        &self,
        collected_at: DateTime<Utc>,
        running_metric: &str,
        not_running_metric: &str,
    ) -> MetricBatch {
        MetricBatch {
            collected_at,
            running: self.running.to_metric_points(collected_at, running_metric),
            not_running: self
                .not_running
                .to_metric_points(collected_at, not_running_metric),
        }
    }
}
