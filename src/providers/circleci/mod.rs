mod client;
mod types;

pub use client::{CircleCiClient, DEFAULT_BASE_URL, DEFAULT_LIMIT};
pub use types::{JobRecord, Lifecycle};
