//! NationStates API client.
//!
//! Every request carries a `User-Agent` naming the operating nation, as the
//! NationStates API terms require. Callers are responsible for staying inside
//! the API's request budget; this client only reports a `429` as
//! [`ClientError::RateLimited`].

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use super::{ClientError, with_trailing_slash};
use crate::objects::nation::RecruitmentEligibility;

const DEFAULT_BASE_URL: &str = "https://www.nationstates.net/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Typed HTTP client for the NationStates API.
#[derive(Debug, Clone)]
pub struct NsClient {
    http: Client,
    base_url: Url,
    user_agent: String,
}

impl NsClient {
    /// Create a new `NsClient` identifying itself as `user`.
    pub fn new(user: &str) -> Result<Self, ClientError> {
        let user_agent = format!("ll0en/{} (by:{})", env!("CARGO_PKG_VERSION"), user);
        let http = Client::builder()
            .user_agent(user_agent.as_str())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            user_agent,
        })
    }

    /// Point the client at a different host (used against mirrors and in tests).
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = with_trailing_slash(base_url);
        self
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// The `User-Agent` sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// URL of the server-sent happenings feed for `region`.
    pub fn happenings_url(&self, region: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(&format!("api/region:{region}"))?)
    }

    /// `GET /cgi-bin/api.cgi?nation={nation}&q=tgcanrecruit+region&from={region}`
    pub async fn recruitment_eligibility(
        &self,
        nation: &str,
        region: &str,
    ) -> Result<RecruitmentEligibility, ClientError> {
        let url = self.base_url.join("cgi-bin/api.cgi")?;

        debug!(nation = %nation, region = %region, "Querying recruitment eligibility");

        // The space is form-encoded as `+`, the shard separator the API expects.
        let resp = self
            .http
            .get(url)
            .query(&[("nation", nation), ("q", "tgcanrecruit region"), ("from", region)])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ClientError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }

        let body = resp.text().await?;
        Ok(RecruitmentEligibility::from_xml(&body)?)
    }
}
