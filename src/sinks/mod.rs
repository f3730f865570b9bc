mod datadog;

pub use datadog::{DatadogClient, DEFAULT_BASE_URL};

use crate::error::Result;
use crate::metrics::MetricBatch;
use crate::output;

/// Destination for the metrics produced by each cycle.
pub enum Emitter {
    Datadog(DatadogClient),
    /// Render the batch to stderr instead of submitting it
    Debug,
}

impl Emitter {
    pub async fn emit(&self, batch: &MetricBatch) -> Result<()> {
        match self {
            Self::Datadog(client) => client.post_metrics(batch).await,
            Self::Debug => {
                output::print_batch(batch);
                Ok(())
            }
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, Self::Debug)
    }
}
