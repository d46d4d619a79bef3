use async_trait::async_trait;
use common::Config;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, Url};
use tracing::{debug, info};

use super::{AgencyAuth, StoryPublisher, StorySource};
use crate::error::{NewsError, Result};
use crate::filter::QueryFilter;
use crate::models::{decode_story, Agency, Story, StoryDraft, StoryList};
use crate::session::{Credential, Session};

/// HTTP client for agency story APIs.
///
/// Reads follow redirects like any fetch would. Authenticated writes do not: an agency
/// bouncing an unauthenticated request to its login page must surface as an HTTP error
/// instead of a 200 from the login page.
pub struct AgencyClient {
    read: Client,
    write: Client,
}

impl AgencyClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            read: super::http_client(config, reqwest::redirect::Policy::limited(config.max_redirects()))?,
            write: super::http_client(config, reqwest::redirect::Policy::none())?,
        })
    }

    fn authenticated(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.credential.header_value() {
            Some(cookies) => request.header(COOKIE, cookies),
            None => request,
        }
    }
}

/// Story-listing URL for `agency`, carrying only the non-wildcard story fields of `filter`.
/// A filter with no such fields gives the bare listing URL.
///
/// The agency URL comes from the directory, so an unusable one is that agency's
/// `Malformed` outcome.
pub fn stories_url(agency: &Agency, filter: &QueryFilter) -> Result<Url> {
    let endpoint = agency.endpoint("api/stories");
    let mut url = Url::parse(&endpoint)
        .map_err(|e| NewsError::Malformed(format!("agency url {}: {}", endpoint, e)))?;

    let params = filter.story_params();
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// URL of one story on the session's agency. The key is a single escaped path segment.
pub fn story_url(session: &Session, key: &str) -> Result<Url> {
    if matches!(key, "" | "." | "..") {
        return Err(NewsError::Validation("Invalid story key provided".into()));
    }
    let endpoint = session.endpoint("api/stories");
    let mut url = Url::parse(&endpoint).map_err(|_| NewsError::InvalidUrl(endpoint.clone()))?;
    url.path_segments_mut()
        .map_err(|_| NewsError::InvalidUrl(endpoint))?
        .pop_if_empty()
        .push(key);
    Ok(url)
}

async fn send(request: RequestBuilder) -> Result<Response> {
    request.send().await.map_err(NewsError::from_transport)
}

fn expect_success(response: &Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(NewsError::Http { status: status.as_u16() })
    }
}

#[async_trait]
impl StorySource for AgencyClient {
    async fn list_stories(&self, agency: &Agency, filter: &QueryFilter) -> Result<Vec<Story>> {
        let url = stories_url(agency, filter)?;
        debug!(agency = %agency.code, %url, "listing stories");

        let response = send(self.read.get(url)).await?;
        expect_success(&response)?;

        let body = response.bytes().await.map_err(NewsError::from_transport)?;
        let list: StoryList =
            serde_json::from_slice(&body).map_err(|e| NewsError::Malformed(e.to_string()))?;

        list.stories
            .unwrap_or_default()
            .into_iter()
            .map(|wire| decode_story(&agency.code, wire))
            .collect()
    }
}

#[async_trait]
impl AgencyAuth for AgencyClient {
    async fn login(&self, base_url: &str, username: &str, password: &str) -> Result<Credential> {
        let url = format!("{}/api/login", base_url);
        let response = send(
            self.write
                .post(&url)
                .form(&[("username", username), ("password", password)]),
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::AuthFailed { status: status.as_u16() });
        }

        let credential = Credential::from_set_cookie(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok()),
        );
        Ok(credential)
    }

    async fn logout(&self, session: &Session) -> Result<()> {
        let request = self.authenticated(self.write.post(session.endpoint("api/logout")), session);
        let response = send(request).await?;
        expect_success(&response)
    }
}

#[async_trait]
impl StoryPublisher for AgencyClient {
    async fn post_story(&self, session: &Session, draft: &StoryDraft) -> Result<()> {
        let request = self.authenticated(self.write.post(session.endpoint("api/stories")), session);
        let response = send(request.json(draft)).await?;
        expect_success(&response)?;
        info!(agency = %session.agency_base_url, headline = %draft.headline, "story posted");
        Ok(())
    }

    async fn delete_story(&self, session: &Session, key: &str) -> Result<()> {
        let url = story_url(session, key)?;
        let request = self.authenticated(self.write.delete(url), session);
        let response = send(request).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(NewsError::NotFound(key.to_string()));
        }
        expect_success(&response)?;
        info!(agency = %session.agency_base_url, key, "story deleted");
        Ok(())
    }
}
