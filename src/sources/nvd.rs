use super::CveSource;
use super::pacing::{RatePolicy, Sleeper, TokioSleeper};
use crate::error::{HarvestError, Result};
use crate::models::{CveRecord, DateWindow};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const NVD_API_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0";
/// Largest `resultsPerPage` the API accepts.
pub const MAX_PAGE_SIZE: u32 = 2000;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SOURCE_NAME: &str = "NVD";

/// Fetch client for the NVD CVE API.
pub struct NvdClient {
    api_key: Option<String>,
    client: reqwest::Client,
    api_url: String,
    page_size: u32,
    policy: RatePolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl NvdClient {
    /// Build a client; pacing is derived from whether `api_key` is present.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let policy = RatePolicy::for_credential(api_key.is_some());

        Ok(Self {
            api_key,
            client,
            api_url: NVD_API_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            policy,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Override the API base URL (useful for mock servers in tests)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Records per request, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_policy(mut self, policy: RatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    async fn fetch_page(&self, window: &DateWindow, start_index: u64) -> Result<PageResponse> {
        let mut query = Vec::from(window.query_pairs());
        query.push(("startIndex", start_index.to_string()));
        query.push(("resultsPerPage", self.page_size.to_string()));

        let mut request = self.client.get(&self.api_url).query(&query);
        if let Some(key) = &self.api_key {
            request = request.header("apiKey", key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(PageResponse::Throttled);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HarvestError::source_fetch(
                SOURCE_NAME,
                format!(
                    "HTTP {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            ));
        }

        Ok(PageResponse::Page(response.json().await?))
    }
}

#[async_trait]
impl CveSource for NvdClient {
    async fn fetch_all(&self, window: &DateWindow) -> Result<Vec<CveRecord>> {
        let mut records: Vec<CveRecord> = Vec::new();
        let mut start_index: u64 = 0;
        let mut throttled: u32 = 0;

        loop {
            debug!(start_index, page_size = self.page_size, "Fetching NVD page");

            let page = match self.fetch_page(window, start_index).await? {
                PageResponse::Throttled => {
                    throttled += 1;
                    if !self.policy.allows_retry(throttled) {
                        return Err(HarvestError::rate_limit(
                            SOURCE_NAME,
                            format!("still throttled after {throttled} attempts at startIndex={start_index}"),
                        ));
                    }
                    warn!(
                        start_index,
                        attempt = throttled,
                        cooldown_secs = self.policy.throttle_cooldown.as_secs(),
                        "NVD rate limited, cooling down before retrying the same page"
                    );
                    self.sleeper.sleep(self.policy.throttle_cooldown).await;
                    continue;
                }
                PageResponse::Page(page) => page,
            };
            throttled = 0;

            let count = page.vulnerabilities.len();
            if count == 0 {
                info!(
                    retrieved = records.len(),
                    total = page.total_results,
                    "NVD returned an empty page, no more CVEs to fetch"
                );
                break;
            }

            debug!(first_id = ?page.vulnerabilities[0].id(), "Page received");
            records.extend(page.vulnerabilities);
            info!(
                count,
                retrieved = records.len(),
                total = page.total_results,
                "Retrieved NVD page"
            );

            if records.len() as u64 >= page.total_results {
                break;
            }

            // Advance by what actually came back so short pages are not skipped.
            start_index += count as u64;
            self.sleeper.sleep(self.policy.request_delay).await;
        }

        Ok(records)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn uses_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

enum PageResponse {
    Throttled,
    Page(NvdPage),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NvdPage {
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    vulnerabilities: Vec<CveRecord>,
}
