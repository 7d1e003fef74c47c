use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ApiError;

/// Remote job-trigger settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct JenkinsConfig {
    pub url: String,
    pub user: Option<String>,
    pub token: Option<String>,
    pub job: String,
    pub build_token: String,
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            user: None,
            token: None,
            job: "mobsf-scan-test".to_string(),
            build_token: "START_SCAN".to_string(),
        }
    }
}

impl JenkinsConfig {
    /// `<url>/job/<job>/buildWithParameters`
    pub fn build_url(&self) -> String {
        format!(
            "{}/job/{}/buildWithParameters",
            self.url.trim_end_matches('/'),
            self.job
        )
    }
}

/// Fires the scan job; no retries, the caller re-invokes on failure
#[derive(Clone, Debug)]
pub struct JobTrigger {
    client: reqwest::Client,
    config: JenkinsConfig,
}

impl JobTrigger {
    pub fn new(config: JenkinsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Queue a manual scan
    pub async fn trigger(&self) -> Result<(), ApiError> {
        let (Some(user), Some(token)) = (&self.config.user, &self.config.token) else {
            warn!("Jenkins credentials not configured");
            return Err(ApiError::CredentialsMissing);
        };

        info!(job = %self.config.job, "triggering scan job");
        let response = self
            .client
            .post(self.config.build_url())
            .query(&[
                ("token", self.config.build_token.as_str()),
                ("SCAN_TYPE", "manual"),
            ])
            .basic_auth(user, Some(token))
            .send()
            .await?;

        let status = response.status();
        let details = response.text().await.unwrap_or_default();
        info!(%status, "Jenkins responded");

        if !status.is_success() {
            return Err(ApiError::Upstream { status, details });
        }
        Ok(())
    }
}
