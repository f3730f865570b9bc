use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default metric name for the running-jobs series.
pub const RUNNING_METRIC: &str = "circleci.queue.running";
/// Default metric name for the not-running (queued) jobs series.
pub const NOT_RUNNING_METRIC: &str = "circleci.queue.not_running";

/// A single tagged gauge sample, shaped like a Datadog `series` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub metric: String,
    /// `[unix_seconds, value]` pairs; always exactly one per point
    pub points: Vec<(f64, f64)>,
    pub tags: Vec<String>,
}

impl MetricPoint {
    pub fn new(metric: &str, timestamp: DateTime<Utc>, value: f64, tags: Vec<String>) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let ts = timestamp.timestamp() as f64;

        Self {
            metric: metric.to_owned(),
            points: vec![(ts, value)],
            tags,
        }
    }

    /// Value of the single sample carried by this point.
    pub fn value(&self) -> f64 {
        self.points.first().map_or(0.0, |&(_, value)| value)
    }

    /// Looks up a tag value by its key (`branch` for `branch:master`).
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.iter().find_map(|tag| {
            tag.split_once(':')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }
}

/// Metrics produced by one polling cycle, both series together.
#[derive(Debug, Clone, Default)]
pub struct MetricBatch {
    pub collected_at: DateTime<Utc>,
    pub running: Vec<MetricPoint>,
    pub not_running: Vec<MetricPoint>,
}

impl MetricBatch {
    pub fn len(&self) -> usize {
        self.running.len() + self.not_running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty() && self.not_running.is_empty()
    }

    /// All points, running series first.
    pub fn series(&self) -> impl Iterator<Item = &MetricPoint> {
        self.running.iter().chain(self.not_running.iter())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_metric_point_serializes_as_series_entry() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let point = MetricPoint::new(
            RUNNING_METRIC,
            ts,
            3.0,
            vec!["vcs_type:github".to_string(), "branch:master".to_string()],
        );

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "metric": "circleci.queue.running",
                "points": [[1_704_164_645.0, 3.0]],
                "tags": ["vcs_type:github", "branch:master"]
            })
        );
    }

    #[test]
    fn test_tag_lookup_splits_on_first_colon() {
        let point = MetricPoint::new(
            RUNNING_METRIC,
            Utc::now(),
            1.0,
            vec!["branch:feature:x".to_string(), "username:u".to_string()],
        );

        assert_eq!(point.tag("branch"), Some("feature:x"));
        assert_eq!(point.tag("username"), Some("u"));
        assert_eq!(point.tag("reponame"), None);
        assert_eq!(point.value(), 1.0);
    }

    #[test]
    fn test_batch_len_counts_both_series() {
        let now = Utc::now();
        let batch = MetricBatch {
            collected_at: now,
            running: vec![MetricPoint::new(RUNNING_METRIC, now, 1.0, vec![])],
            not_running: vec![
                MetricPoint::new(NOT_RUNNING_METRIC, now, 0.0, vec![]),
                MetricPoint::new(NOT_RUNNING_METRIC, now, 2.0, vec![]),
            ],
        };

        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
        assert_eq!(batch.series().next().unwrap().metric, RUNNING_METRIC);
        assert!(MetricBatch::default().is_empty());
    }
}
