use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;

use crate::{DataSource, LoadError, RawBody, Resource};

/// Fetches exported JSON files relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, LoadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(LoadError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
        })
    }

    pub fn url_for(&self, resource: Resource) -> String {
        format!("{}/{}", self.base_url, resource.file_name())
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch(&self, resource: Resource) -> Result<RawBody, LoadError> {
        let url = self.url_for(resource);
        let request_error = |source| LoadError::Request {
            resource,
            location: url.clone(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(request_error)?;

        Ok(RawBody {
            location: url.clone(),
            status: Some(status),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_joins_base_and_file_name() {
        let source = HttpSource::new("http://127.0.0.1:5173/", None).expect("http source");
        assert_eq!(
            source.url_for(Resource::TopGroups),
            "http://127.0.0.1:5173/top_groups.json"
        );
    }
}
