use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use http::{header, HeaderMap, HeaderValue};
use crate::{config::Ctfd, tools::join_url};

use super::{
    models::{ApiResponse, Challenge, Solve},
    ScoreboardApi,
};

/// HTTP client for the CTFd REST API.
/// Built once and shared by every cycle; requests are bounded by `ctfd.timeout_secs`.
pub struct CtfdClient {
    http: reqwest::Client,
    base_url: String,
}

impl CtfdClient {
    pub fn new(config: &Ctfd) -> Result<Self, anyhow::Error> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("ctfd.api_key is required"))?;
        let base_url = config
            .api_url
            .as_deref()
            .ok_or_else(|| anyhow!("ctfd.api_url is required"))?;

        let mut token = HeaderValue::from_str(&format!("Token {api_key}"))
            .context("ctfd.api_key contains characters not allowed in a header")?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, token);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("firstblood/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn solves_url(&self, challenge_id: u64) -> String {
        join_url(&self.base_url, &format!("{challenge_id}/solves"))
    }

    /// GET `url` and return the CTFd envelope with its items still undecoded
    async fn get_data(&self, url: &str) -> Result<ApiResponse, anyhow::Error> {
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            bail!("unexpected status {status}");
        }

        Ok(response.json::<ApiResponse>().await?)
    }
}

#[async_trait]
impl ScoreboardApi for CtfdClient {
    async fn fetch_challenges(&self) -> Vec<Challenge> {
        match self.get_data(&self.base_url).await {
            Ok(body) => body.items(),
            Err(err) => {
                tracing::error!(url = %self.base_url, "failed to fetch challenges: {err:#}");
                vec![]
            }
        }
    }

    async fn fetch_solves(&self, challenge_id: u64) -> Vec<Solve> {
        // CTFd lists solves earliest first; callers rely on that order as-is,
        // so a malformed entry ends the list instead of being skipped.
        match self.get_data(&self.solves_url(challenge_id)).await {
            Ok(body) => body.leading_items(),
            Err(err) => {
                tracing::error!(
                    challenge_id,
                    "failed to fetch solves for challenge {challenge_id}: {err:#}"
                );
                vec![]
            }
        }
    }
}
