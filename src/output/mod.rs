mod debug;
mod styling;
mod tables;

pub use debug::print_batch;
pub use styling::{dim, magenta_bold};

/// Prints the `QueueLens` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📊 QueueLens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CircleCI queue depth to Datadog")
    );
}
