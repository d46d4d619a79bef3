use common::Config;
use std::fmt;
use tracing::{info, warn};
use url::Url;

use crate::clients::{AgencyAuth, StoryPublisher};
use crate::error::{NewsError, Result};
use crate::models::{normalize_base_url, StoryDraft};

/// Opaque credential handed out by an agency's login endpoint (its session cookies),
/// kept in `Cookie` header form.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credential(String);

impl Credential {
    pub fn new(header_value: impl Into<String>) -> Self {
        Self(header_value.into())
    }

    /// Collect `name=value` pairs out of `Set-Cookie` header values, dropping attributes.
    pub fn from_set_cookie<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pairs: Vec<String> = values
            .into_iter()
            .filter_map(|raw| match cookie::Cookie::parse(raw) {
                Ok(c) => Some(format!("{}={}", c.name(), c.value())),
                Err(e) => {
                    warn!(%e, "ignoring unparseable Set-Cookie header");
                    None
                }
            })
            .collect();
        Self(pairs.join("; "))
    }

    pub fn header_value(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            Some(&self.0)
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// An authenticated session against exactly one agency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub agency_base_url: String,
    pub credential: Credential,
}

impl Session {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.agency_base_url, path.trim_start_matches('/'))
    }
}

/// Tracks the one active session and gates the write path on it.
///
/// Logging in while a session is active replaces it without contacting the previous
/// agency; its credential is simply dropped.
#[derive(Debug)]
pub struct SessionManager {
    config: Config,
    current: Option<Session>,
}

impl SessionManager {
    pub fn new(config: Config) -> Self {
        Self { config, current: None }
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn active(&self) -> Result<&Session> {
        self.current.as_ref().ok_or(NewsError::NotAuthenticated)
    }

    /// Resolve a login target (URL or alias such as `local`) to a normalized agency base URL.
    pub fn resolve_target(&self, target: &str) -> Result<String> {
        let target = target.trim();
        if target.is_empty() {
            return Err(NewsError::InvalidUrl("no URL given".into()));
        }
        let raw = self.config.resolve_alias(target).unwrap_or_else(|| target.to_string());
        let url = Url::parse(&raw).map_err(|_| NewsError::InvalidUrl(raw.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(NewsError::InvalidUrl(raw));
        }
        Ok(normalize_base_url(&raw))
    }

    /// Log into the agency at `target`. Once the target resolves, any previous session is
    /// dropped, so a rejected attempt (empty or wrong credentials) leaves the manager
    /// logged out. An unresolvable target changes nothing.
    pub async fn login<A>(&mut self, auth: &A, target: &str, username: &str, password: &str) -> Result<&Session>
    where
        A: AgencyAuth + ?Sized,
    {
        let base_url = self.resolve_target(target)?;

        if let Some(previous) = self.current.take() {
            info!(previous = %previous.agency_base_url, "replacing active session");
        }

        if username.trim().is_empty() || password.is_empty() {
            return Err(NewsError::EmptyCredentials);
        }

        let credential = auth.login(&base_url, username, password).await?;
        info!(agency = %base_url, "logged in");
        Ok(&*self.current.insert(Session {
            agency_base_url: base_url,
            credential,
        }))
    }

    /// Log out of the active session. The agency is told on a best-effort basis; the local
    /// session is dropped either way. Returns false when nobody was logged in.
    pub async fn logout<A>(&mut self, auth: &A) -> bool
    where
        A: AgencyAuth + ?Sized,
    {
        let Some(session) = self.current.take() else {
            return false;
        };
        if let Err(e) = auth.logout(&session).await {
            warn!(agency = %session.agency_base_url, %e, "agency logout failed; session dropped locally");
        }
        true
    }

    pub async fn post_story<P>(&self, publisher: &P, draft: &StoryDraft) -> Result<()>
    where
        P: StoryPublisher + ?Sized,
    {
        let session = self.active()?;
        draft.validate()?;
        publisher.post_story(session, draft).await
    }

    pub async fn delete_story<P>(&self, publisher: &P, key: &str) -> Result<()>
    where
        P: StoryPublisher + ?Sized,
    {
        let session = self.active()?;
        let key = key.trim();
        if key.is_empty() {
            return Err(NewsError::Validation("Invalid story key provided".into()));
        }
        publisher.delete_story(session, key).await
    }
}
