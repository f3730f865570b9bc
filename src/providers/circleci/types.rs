use serde::{Deserialize, Deserializer};

/// Lifecycle state reported by CircleCI for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Running,
    NotRunning,
    /// Any other state (`queued`, `finished`, `not_run`, ...) or a missing value
    #[default]
    #[serde(other)]
    Other,
}

/// Snapshot of one job from the CircleCI `recent-builds` endpoint.
///
/// Only the fields needed to key and classify the job are kept; the rest of
/// the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobRecord {
    /// Version control provider (e.g. "github", "bitbucket")
    #[serde(default, deserialize_with = "null_as_default")]
    pub vcs_type: String,
    /// Repository owner
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    /// Repository name
    #[serde(default, deserialize_with = "null_as_default")]
    pub reponame: String,
    /// Branch name, empty for tag builds
    #[serde(default, deserialize_with = "null_as_default")]
    pub branch: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lifecycle: Lifecycle,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
