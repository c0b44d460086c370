use std::fmt;
use std::time::Duration;

use anomscope_config::SourceConfig;
use anomscope_core::{Dataset, GroupOutcome, SummaryRecord, records_from_value};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

mod dir;
mod http;

pub use dir::DirSource;
pub use http::HttpSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Summary,
    Anomalies,
    TopGroups,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Self::Summary, Self::Anomalies, Self::TopGroups];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Summary => "summary.json",
            Self::Anomalies => "anomalies.json",
            Self::TopGroups => "top_groups.json",
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(self, Self::TopGroups)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Undecoded response for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBody {
    pub location: String,
    /// HTTP status, when the transport has one.
    pub status: Option<u16>,
    pub text: String,
}

impl RawBody {
    pub fn is_success(&self) -> bool {
        self.status.is_none_or(|status| (200..300).contains(&status))
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("HTTP {status} when fetching {location}\nFirst chars: {prefix}")]
    Transport {
        resource: Resource,
        location: String,
        status: u16,
        prefix: String,
    },
    #[error("Invalid JSON from {location}. (Maybe HTML returned)\nFirst chars: {prefix}")]
    Decode {
        resource: Resource,
        location: String,
        prefix: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("request to {location} failed: {source}")]
    Request {
        resource: Resource,
        location: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read {location}: {source}")]
    Io {
        resource: Resource,
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl LoadError {
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Self::Transport { resource, .. }
            | Self::Decode { resource, .. }
            | Self::Request { resource, .. }
            | Self::Io { resource, .. } => Some(*resource),
            Self::Client(_) => None,
        }
    }
}

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Where resources are read from, for log lines.
    fn describe(&self) -> String;

    async fn fetch(&self, resource: Resource) -> Result<RawBody, LoadError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub body_prefix_chars: usize,
}

impl From<&SourceConfig> for LoadOptions {
    fn from(config: &SourceConfig) -> Self {
        Self {
            body_prefix_chars: config.body_prefix_chars,
        }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::from(&SourceConfig::default())
    }
}

/// Picks an HTTP source for `http(s)://` locations, a directory source otherwise.
pub fn source_from_location(
    location: &str,
    config: &SourceConfig,
) -> Result<Box<dyn DataSource>, LoadError> {
    let location = location.trim();
    if location.starts_with("http://") || location.starts_with("https://") {
        let timeout = config.timeout_secs.map(Duration::from_secs);
        Ok(Box::new(HttpSource::new(location, timeout)?))
    } else {
        Ok(Box::new(DirSource::new(location)))
    }
}

/// Fetches the three resources concurrently and assembles a dataset.
///
/// Summary and anomalies failures are fatal. Any failure on the grouped
/// statistics resource degrades to [`GroupOutcome::Absent`].
pub async fn load_dataset(
    source: &dyn DataSource,
    options: LoadOptions,
) -> Result<Dataset, LoadError> {
    let (summary, anomalies, groups) = tokio::join!(
        fetch_json(source, Resource::Summary, options),
        fetch_json(source, Resource::Anomalies, options),
        fetch_json(source, Resource::TopGroups, options),
    );

    let summary = SummaryRecord::from_value(summary?);
    let records = records_from_value(anomalies?);
    let groups = match groups {
        Ok(value) => GroupOutcome::from_value(value),
        Err(err) => {
            tracing::warn!(
                error = %err,
                resource = %Resource::TopGroups,
                "optional resource unavailable, continuing without it"
            );
            GroupOutcome::Absent
        }
    };

    let dataset = Dataset::new(records, summary, groups);
    tracing::info!(
        source = %source.describe(),
        dataset = %dataset.id().short(),
        records = dataset.len(),
        groups = dataset.groups().is_present(),
        "loaded anomaly dataset"
    );
    Ok(dataset)
}

async fn fetch_json(
    source: &dyn DataSource,
    resource: Resource,
    options: LoadOptions,
) -> Result<Value, LoadError> {
    let body = source.fetch(resource).await?;
    decode_body(resource, body, options)
}

fn decode_body(resource: Resource, body: RawBody, options: LoadOptions) -> Result<Value, LoadError> {
    if let Some(status) = body.status.filter(|_| !body.is_success()) {
        return Err(LoadError::Transport {
            resource,
            location: body.location,
            status,
            prefix: body_prefix(&body.text, options.body_prefix_chars),
        });
    }

    serde_json::from_str(&body.text).map_err(|source| LoadError::Decode {
        resource,
        prefix: body_prefix(&body.text, options.body_prefix_chars),
        location: body.location,
        source,
    })
}

pub fn body_prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
