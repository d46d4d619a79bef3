//! Fan-out of a `news` query across every agency in the directory.
//!
//! Each selected agency gets its own task. A task's failure (transport, HTTP status,
//! undecodable body, timeout, even a panic) is captured as a diagnostic for that agency
//! and never touches its siblings. Results are joined in directory order, so the merged
//! story list does not depend on which agency answered first.

use std::sync::Arc;
use std::time::Duration;

use common::Config;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clients::{AgencyDirectory, StorySource};
use crate::error::{NewsError, Result};
use crate::filter::QueryFilter;
use crate::models::{Agency, Story};

/// A per-agency failure reported alongside the stories of the agencies that answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgencyFailure {
    pub agency: Agency,
    pub error: NewsError,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub query_id: Uuid,
    /// Stories of every agency that answered, agencies in directory order
    pub stories: Vec<Story>,
    pub failures: Vec<AgencyFailure>,
    /// Number of agencies the filter selected
    pub agencies_queried: usize,
}

impl QueryOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct Aggregator {
    directory: Arc<dyn AgencyDirectory>,
    source: Arc<dyn StorySource>,
    max_concurrency: usize,
    agency_timeout: Duration,
}

impl Aggregator {
    pub fn new(directory: Arc<dyn AgencyDirectory>, source: Arc<dyn StorySource>) -> Self {
        Self {
            directory,
            source,
            max_concurrency: 8,
            agency_timeout: Duration::from_secs(10),
        }
    }

    /// Apply the `[fanout]` settings.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_limits(config.max_concurrency(), config.agency_timeout())
    }

    pub fn with_limits(mut self, max_concurrency: usize, agency_timeout: Duration) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self.agency_timeout = agency_timeout;
        self
    }

    pub fn directory(&self) -> &Arc<dyn AgencyDirectory> {
        &self.directory
    }

    /// Run `filter` against every selected agency.
    ///
    /// Fails only when the directory cannot be read. An outcome where every agency
    /// failed (or none matched) is still `Ok`, with an empty story list.
    pub async fn query(&self, filter: &QueryFilter) -> Result<QueryOutcome> {
        let query_id = Uuid::new_v4();
        let span = info_span!("news_query", %query_id, filter = %filter);
        self.run(query_id, filter).instrument(span).await
    }

    async fn run(&self, query_id: Uuid, filter: &QueryFilter) -> Result<QueryOutcome> {
        let agencies = self.directory.list_agencies().await?;
        let selected: Vec<Agency> = agencies
            .into_iter()
            .filter(|agency| filter.selects_agency(&agency.code))
            .collect();

        info!(agencies = selected.len(), "dispatching story queries");

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let tasks: Vec<(Agency, JoinHandle<Result<Vec<Story>>>)> = selected
            .into_iter()
            .map(|agency| {
                let handle = self.spawn_agency_task(agency.clone(), filter.clone(), permits.clone());
                (agency, handle)
            })
            .collect();

        let mut outcome = QueryOutcome {
            query_id,
            agencies_queried: tasks.len(),
            ..Default::default()
        };

        // Join barrier: await every task, in directory order.
        for (agency, handle) in tasks {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(NewsError::TaskFailed(join_err.to_string())),
            };
            match result {
                Ok(stories) => {
                    debug!(agency = %agency.code, stories = stories.len(), "agency answered");
                    outcome.stories.extend(stories);
                }
                Err(error) => {
                    warn!(agency = %agency.code, url = %agency.base_url, %error, "agency query failed");
                    outcome.failures.push(AgencyFailure { agency, error });
                }
            }
        }

        info!(
            stories = outcome.stories.len(),
            failed = outcome.failures.len(),
            partial = outcome.is_partial(),
            "news query finished"
        );
        Ok(outcome)
    }

    fn spawn_agency_task(
        &self,
        agency: Agency,
        filter: QueryFilter,
        permits: Arc<Semaphore>,
    ) -> JoinHandle<Result<Vec<Story>>> {
        let source = Arc::clone(&self.source);
        let timeout = self.agency_timeout;

        tokio::spawn(
            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| NewsError::TaskFailed(e.to_string()))?;

                // The deadline starts once the agency call can actually run.
                match tokio::time::timeout(timeout, source.list_stories(&agency, &filter)).await {
                    Ok(result) => result,
                    Err(_) => Err(NewsError::Network(format!("timed out after {}ms", timeout.as_millis()))),
                }
            }
            .in_current_span(),
        )
    }
}
