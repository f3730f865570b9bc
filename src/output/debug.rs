use std::fmt::Write;

use crate::metrics::{MetricBatch, MetricPoint};

use super::styling::{bright, bright_green, bright_yellow, dim};
use super::tables::{color_coded_count_cell, create_cyan_header, create_table};

/// Prints a metric batch to stderr in place of submitting it.
pub fn print_batch(batch: &MetricBatch) {
    eprintln!("{}", render_batch(batch));
}

/// Renders both series of a batch as tables, one row per queue.
///
/// Rows are sorted by queue so consecutive cycles are easy to compare.
pub fn render_batch(batch: &MetricBatch) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{} {}",
        bright("🕒"),
        dim(batch.collected_at.to_rfc3339())
    );

    add_series(&mut output, &bright_green("Running"), &batch.running);
    add_series(&mut output, &bright_yellow("Not Running"), &batch.not_running);

    output
}

fn add_series(output: &mut String, title: &dyn std::fmt::Display, points: &[MetricPoint]) {
    let _ = writeln!(output, "\n{title}:");

    let Some(first) = points.first() else {
        let _ = writeln!(output, "  {}", dim("(no queues)"));
        return;
    };

    let _ = writeln!(output, "  {}", dim(&first.metric));

    let mut rows: Vec<&MetricPoint> = points.iter().collect();
    rows.sort_by(|a, b| a.tags.cmp(&b.tags));

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "VCS",
        "Username",
        "Repository",
        "Branch",
        "Count",
    ]));

    for point in rows {
        table.add_row(vec![
            comfy_table::Cell::new(point.tag("vcs_type").unwrap_or_default()),
            comfy_table::Cell::new(point.tag("username").unwrap_or_default()),
            comfy_table::Cell::new(point.tag("reponame").unwrap_or_default()),
            comfy_table::Cell::new(point.tag("branch").unwrap_or_default()),
            color_coded_count_cell(point.value()),
        ]);
    }

    let _ = writeln!(output, "{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_point(metric: &str, branch: &str, value: f64) -> MetricPoint {
        MetricPoint::new(
            metric,
            Utc::now(),
            value,
            vec![
                "vcs_type:github".to_string(),
                "username:yuya-takeyama".to_string(),
                "reponame:jr".to_string(),
                format!("branch:{branch}"),
            ],
        )
    }

    #[test]
    fn test_render_batch_lists_both_series() {
        let batch = MetricBatch {
            collected_at: Utc::now(),
            running: vec![create_point("circleci.queue.running", "master", 3.0)],
            not_running: vec![create_point("circleci.queue.not_running", "dev", 0.0)],
        };

        let rendered = render_batch(&batch);
        assert!(rendered.contains("Running"));
        assert!(rendered.contains("Not Running"));
        assert!(rendered.contains("circleci.queue.running"));
        assert!(rendered.contains("circleci.queue.not_running"));
        assert!(rendered.contains("yuya-takeyama"));
        assert!(rendered.contains("master"));
        assert!(rendered.contains("dev"));
    }

    #[test]
    fn test_render_empty_series() {
        let batch = MetricBatch {
            collected_at: Utc::now(),
            running: vec![],
            not_running: vec![],
        };

        let rendered = render_batch(&batch);
        assert_eq!(rendered.matches("(no queues)").count(), 2);
    }
}
