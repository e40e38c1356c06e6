//! Graph API implementation of [`PlatformDataSource`].

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::http::{build_client, json_or_raw, read_response, sanitize_error_body, HttpTimeouts};

use super::{PlatformDataSource, PlatformError};

/// Default Graph API origin.
pub const GRAPH_API_BASE: &str = "https://graph.facebook.com";
/// Default Graph API version segment.
pub const GRAPH_API_VERSION: &str = "v20.0";

const STATUS_FIELDS: &str = "account_status,disable_reason";
const ADSET_FIELDS: &str = "id,name,daily_budget";
const INSIGHT_FIELDS: &str = "campaign_name,campaign_id,adset_name,adset_id,ad_name,ad_id,\
spend,actions,cpm,ctr,video_thruplay_watched_actions";

/// HTTP client for the Graph API.
#[derive(Debug, Clone)]
pub struct GraphApiClient {
    base_url: String,
    api_version: String,
    client: reqwest::Client,
}

impl GraphApiClient {
    /// Create a client for `base_url` (e.g. [`GRAPH_API_BASE`]) and `api_version`.
    pub fn new(base_url: &str, api_version: &str, timeouts: HttpTimeouts) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_version: api_version.to_owned(),
            client: build_client(timeouts),
        }
    }

    /// Build the request URL for `path` under the versioned API root.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidUrl`] if the result does not parse.
    pub fn endpoint(
        &self,
        path: &str,
        query: &[(&str, &str)],
        access_token: &str,
    ) -> Result<Url, PlatformError> {
        let raw = format!("{}/{}/{}", self.base_url, self.api_version, path);
        let mut url = Url::parse(&raw).map_err(|e| PlatformError::InvalidUrl(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("access_token", access_token);
        }
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Value, PlatformError> {
        debug!(path = url.path(), "graph api request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let (status, body) = read_response(response)
            .await
            .map_err(reqwest::Error::without_url)?;
        if !(200..300).contains(&status) {
            return Err(PlatformError::HttpStatus {
                status,
                body: sanitize_error_body(&body),
            });
        }
        Ok(json_or_raw(&body))
    }
}

#[async_trait]
impl PlatformDataSource for GraphApiClient {
    async fn account_status(
        &self,
        ad_account_id: &str,
        access_token: &str,
    ) -> Result<Value, PlatformError> {
        let url = self.endpoint(ad_account_id, &[("fields", STATUS_FIELDS)], access_token)?;
        self.get(url).await
    }

    async fn adsets(
        &self,
        ad_account_id: &str,
        access_token: &str,
    ) -> Result<Value, PlatformError> {
        let path = format!("{ad_account_id}/adsets");
        let url = self.endpoint(&path, &[("fields", ADSET_FIELDS)], access_token)?;
        self.get(url).await
    }

    async fn yesterday_insights(
        &self,
        ad_account_id: &str,
        access_token: &str,
    ) -> Result<Value, PlatformError> {
        let path = format!("{ad_account_id}/insights");
        let url = self.endpoint(
            &path,
            &[
                ("fields", INSIGHT_FIELDS),
                ("date_preset", "yesterday"),
                ("level", "ad"),
            ],
            access_token,
        )?;
        self.get(url).await
    }
}
