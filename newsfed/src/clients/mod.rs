use async_trait::async_trait;
use common::Config;
use reqwest::Client;

use crate::error::Result;
use crate::filter::QueryFilter;
use crate::models::{Agency, Story, StoryDraft};
use crate::session::{Credential, Session};

/// Source of the list of known agencies.
#[async_trait]
pub trait AgencyDirectory: Send + Sync {
    /// Fetch every agency, in directory order. Any failure is `Unavailable`.
    async fn list_agencies(&self) -> Result<Vec<Agency>>;
}

/// Read path of one agency's story API. Needs no session.
#[async_trait]
pub trait StorySource: Send + Sync {
    /// List the agency's stories matching the category/region/date of `filter`.
    async fn list_stories(&self, agency: &Agency, filter: &QueryFilter) -> Result<Vec<Story>>;
}

/// Login/logout against a single agency.
#[async_trait]
pub trait AgencyAuth: Send + Sync {
    async fn login(&self, base_url: &str, username: &str, password: &str) -> Result<Credential>;

    async fn logout(&self, session: &Session) -> Result<()>;
}

/// Authenticated write path of the agency a session belongs to.
#[async_trait]
pub trait StoryPublisher: Send + Sync {
    async fn post_story(&self, session: &Session, draft: &StoryDraft) -> Result<()>;

    async fn delete_story(&self, session: &Session, key: &str) -> Result<()>;
}

pub mod agency;
pub mod directory;

/// Build a reqwest client from the `[http]` settings.
pub(crate) fn http_client(config: &Config, redirects: reqwest::redirect::Policy) -> anyhow::Result<Client> {
    use anyhow::Context;

    Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.user_agent())
        .redirect(redirects)
        .build()
        .context("failed to build reqwest client")
}
