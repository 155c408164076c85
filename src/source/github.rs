//! GitHub repository search

use super::{CandidateStream, EnumerationError, RepositorySource, SearchCriteria};
use crate::model::{Candidate, RepoIdentity};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// GitHub search never returns more than this many results for one query.
pub const MAX_SEARCH_RESULTS: usize = 1000;

const PER_PAGE: u32 = 100;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("repo-spider/", env!("CARGO_PKG_VERSION"));

/// One page of raw search results
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<Value>,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetches page `page` (1-based) of results for `query`.
    async fn search(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, EnumerationError>;
}

/// `GET /search/repositories` against the REST API
pub struct GitHubSearchClient {
    api_base: String,
    token: Option<String>,
    http_client: Client,
}

impl GitHubSearchClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self, EnumerationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            http_client,
        })
    }
}

#[async_trait]
impl SearchClient for GitHubSearchClient {
    async fn search(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, EnumerationError> {
        let url = format!("{}/search/repositories", self.api_base);
        debug!(query, page, "Searching repositories");

        let mut request = self
            .http_client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", query.to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(EnumerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<SearchPage>()
            .await
            .map_err(|e| EnumerationError::InvalidResponse(e.to_string()))
    }
}

/// Builds a candidate from one search API item, or `None` when the item
/// lacks the fields needed for an identity.
pub(crate) fn candidate_from_item(item: Value, query: &str) -> Option<Candidate> {
    let owner = item.pointer("/owner/login")?.as_str()?.to_string();
    let name = item.get("name")?.as_str()?.to_string();
    let url = item
        .get("clone_url")
        .or_else(|| item.get("html_url"))
        .and_then(Value::as_str)?
        .to_string();
    let branch = item
        .get("default_branch")
        .and_then(Value::as_str)
        .unwrap_or("main")
        .to_string();

    let identity = RepoIdentity::new(owner, name, url, branch);
    Some(Candidate::new(identity, item).with_query(query))
}

pub struct GitHubSearchSource {
    client: Arc<dyn SearchClient>,
}

impl GitHubSearchSource {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }
}

struct QueryCursor {
    query: String,
    next_page: u32,
    examined: usize,
    kept: usize,
    exhausted: bool,
}

struct SearchState {
    client: Arc<dyn SearchClient>,
    queries: VecDeque<String>,
    current: Option<QueryCursor>,
    buffer: VecDeque<Candidate>,
    seen: HashSet<String>,
    max_examined: usize,
    max_kept: usize,
    failed: bool,
}

impl SearchState {
    fn stop_query(&mut self) {
        if let Some(cursor) = self.current.as_mut() {
            cursor.exhausted = true;
        }
    }

    /// Applies one page to the current cursor, buffering unseen candidates.
    fn absorb(&mut self, page: SearchPage) {
        let Some(cursor) = self.current.as_mut() else {
            return;
        };
        let received = page.items.len();

        for item in page.items {
            if cursor.examined >= self.max_examined || cursor.kept >= self.max_kept {
                break;
            }
            cursor.examined += 1;

            let Some(candidate) = candidate_from_item(item, &cursor.query) else {
                warn!(query = %cursor.query, "Skipping search item without owner/name/url");
                continue;
            };
            let key = candidate.identity.slug().to_lowercase();
            if self.seen.insert(key) {
                cursor.kept += 1;
                self.buffer.push_back(candidate);
            }
        }

        let fetched = cursor.next_page as usize * PER_PAGE as usize;
        if received < PER_PAGE as usize
            || fetched >= MAX_SEARCH_RESULTS
            || cursor.examined >= self.max_examined
            || cursor.kept >= self.max_kept
        {
            debug!(
                query = %cursor.query,
                examined = cursor.examined,
                kept = cursor.kept,
                "Query finished"
            );
            cursor.exhausted = true;
        }
        cursor.next_page += 1;
    }

    async fn advance(mut self) -> Option<(Result<Candidate, EnumerationError>, Self)> {
        loop {
            if self.failed {
                return None;
            }
            if let Some(candidate) = self.buffer.pop_front() {
                return Some((Ok(candidate), self));
            }

            let needs_query = self.current.as_ref().map_or(true, |c| c.exhausted);
            if needs_query {
                let query = self.queries.pop_front()?;
                info!(query = %query, "Starting repository search");
                self.current = Some(QueryCursor {
                    query,
                    next_page: 1,
                    examined: 0,
                    kept: 0,
                    exhausted: false,
                });
                continue;
            }

            let (query, page) = match self.current.as_ref() {
                Some(c) => (c.query.clone(), c.next_page),
                None => continue,
            };
            match self.client.search(&query, page, PER_PAGE).await {
                Ok(result) => {
                    if result.items.is_empty() {
                        self.stop_query();
                    } else {
                        self.absorb(result);
                    }
                }
                Err(e) => {
                    self.failed = true;
                    return Some((Err(e), self));
                }
            }
        }
    }
}

impl RepositorySource for GitHubSearchSource {
    fn enumerate(&self, criteria: &SearchCriteria) -> CandidateStream {
        let state = SearchState {
            client: Arc::clone(&self.client),
            queries: criteria.queries.iter().cloned().collect(),
            current: None,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            max_examined: criteria.max_examined.unwrap_or(usize::MAX),
            max_kept: criteria.max_kept.unwrap_or(usize::MAX),
            failed: false,
        };
        stream::unfold(state, SearchState::advance).boxed()
    }

    fn describe(&self) -> String {
        "github search".to_string()
    }
}
