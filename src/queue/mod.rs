//! Job aggregation: per-queue counters and lifecycle classification.

mod classify;
mod counter;

pub use classify::{Classifier, QueueCounts, TargetFilter};
#[cfg(test)]
pub use counter::GroupKey;
