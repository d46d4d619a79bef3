use async_trait::async_trait;
use common::Config;
use reqwest::Client;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::AgencyDirectory;
use crate::error::{NewsError, Result};
use crate::models::{Agency, DirectoryRecord};

/// Client for the well-known agency directory (`GET <base>/directory/`).
///
/// Every call re-fetches the list; nothing is cached between queries.
pub struct HttpDirectory {
    url: String,
    client: Client,
}

impl HttpDirectory {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = super::http_client(config, reqwest::redirect::Policy::limited(config.max_redirects()))?;
        Ok(Self::with_client(config.directory_url(), client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            url: format!("{}/directory/", base_url.trim_end_matches('/')),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AgencyDirectory for HttpDirectory {
    async fn list_agencies(&self) -> Result<Vec<Agency>> {
        debug!(url = %self.url, "fetching agency directory");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| NewsError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::Unavailable(format!("directory returned HTTP {}", status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NewsError::Unavailable(e.to_string()))?;
        let records: Vec<DirectoryRecord> = serde_json::from_slice(&body)
            .map_err(|e| NewsError::Unavailable(format!("malformed directory: {}", e)))?;

        Ok(dedup_by_code(records.into_iter().map(Agency::from)))
    }
}

/// Keep the first agency listed under each code, preserving directory order.
fn dedup_by_code(agencies: impl Iterator<Item = Agency>) -> Vec<Agency> {
    let mut seen = HashSet::new();
    agencies
        .filter(|agency| {
            let first = seen.insert(agency.code.clone());
            if !first {
                warn!(agency = %agency.code, url = %agency.base_url, "duplicate agency code in directory; skipped");
            }
            first
        })
        .collect()
}
