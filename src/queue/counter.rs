use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::metrics::MetricPoint;
use crate::providers::circleci::JobRecord;

/// Identity of a build queue: `(vcs_type, username, reponame, branch)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub vcs_type: String,
    pub username: String,
    pub reponame: String,
    pub branch: String,
}

impl GroupKey {
    pub fn new(vcs_type: &str, username: &str, reponame: &str, branch: &str) -> Self {
        Self {
            vcs_type: vcs_type.to_owned(),
            username: username.to_owned(),
            reponame: reponame.to_owned(),
            branch: branch.to_owned(),
        }
    }

    /// Datadog tags for this queue, always in the same four-tag order.
    pub fn tags(&self) -> Vec<String> {
        vec![
            format!("vcs_type:{}", self.vcs_type),
            format!("username:{}", self.username),
            format!("reponame:{}", self.reponame),
            format!("branch:{}", self.branch),
        ]
    }
}

impl From<&JobRecord> for GroupKey {
    fn from(job: &JobRecord) -> Self {
        Self::new(&job.vcs_type, &job.username, &job.reponame, &job.branch)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.vcs_type, self.username, self.reponame, self.branch
        )
    }
}

/// Number of jobs observed for one queue in the current cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCountEntry {
    pub key: GroupKey,
    pub count: u64,
}

/// Per-queue job counter for a single lifecycle bucket.
///
/// Entries are created on first sight of a key and are never removed; a new
/// counter is built for every polling cycle.
#[derive(Debug)]
pub struct JobCounter {
    entries: HashMap<GroupKey, JobCountEntry>,
}

impl Default for JobCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl JobCounter {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the entry for the job's queue, inserting a zero count if absent.
    pub fn ensure(&mut self, job: &JobRecord) -> &JobCountEntry {
        self.entry_mut(job)
    }

    pub fn increment(&mut self, job: &JobRecord) {
        self.entry_mut(job).count += 1;
    }

    fn entry_mut(&mut self, job: &JobRecord) -> &mut JobCountEntry {
        let key = GroupKey::from(job);
        self.entries
            .entry(key)
            .or_insert_with_key(|key| JobCountEntry {
                key: key.clone(),
                count: 0,
            })
    }

    #[cfg(test)]
    pub fn get(&self, key: &GroupKey) -> Option<&JobCountEntry> {
        self.entries.get(key)
    }

    /// Iterates entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = &JobCountEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_count(&self) -> u64 {
        self.entries.values().map(|entry| entry.count).sum()
    }

    /// Projects every entry to one gauge point tagged with its queue key.
    ///
    /// Point order follows map iteration and is not stable.
    pub fn to_metric_points(&self, timestamp: DateTime<Utc>, metric_name: &str) -> Vec<MetricPoint> {
        self.entries
            .values()
            .map(|entry| {
                #[allow(clippy::cast_precision_loss)]
                let value = entry.count as f64;
                MetricPoint::new(metric_name, timestamp, value, entry.key.tags())
            })
            .collect()
    }
}
