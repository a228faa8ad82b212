//! Jenkins `buildWithParameters` client.

use async_trait::async_trait;
use chartdeck_core::TriggerConfig;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::error::{TriggerError, TriggerResult};
use crate::{JobRequest, JobTrigger};

/// Longest slice of a rejection body carried into the error.
const MAX_BODY_CHARS: usize = 512;

/// Triggers parameterized Jenkins jobs with basic auth.
///
/// Jenkins answers 201 once the build is queued; any other status means
/// the job will not run.
#[derive(Clone)]
pub struct JenkinsTrigger {
    url: String,
    user: String,
    token: String,
    client: reqwest::Client,
}

impl JenkinsTrigger {
    pub fn new(config: &TriggerConfig) -> TriggerResult<Self> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TriggerError::Config("trigger token is not configured".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TriggerError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: config.url.clone(),
            user: config.user.clone(),
            token,
            client,
        })
    }
}

#[async_trait]
impl JobTrigger for JenkinsTrigger {
    async fn trigger(&self, request: &JobRequest) -> TriggerResult<()> {
        debug!(
            kind = %request.kind,
            project = %request.project_id,
            url = %self.url,
            "triggering build job"
        );

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.token))
            .form(request)
            .send()
            .await
            .map_err(|e| TriggerError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::CREATED {
            info!(kind = %request.kind, project = %request.project_id, "build job accepted");
            return Ok(());
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, project = %request.project_id, "build system rejected credentials");
            return Err(TriggerError::Auth {
                status: status.as_u16(),
            });
        }

        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_BODY_CHARS)
            .collect();
        warn!(%status, kind = %request.kind, project = %request.project_id, "build job not accepted");
        Err(TriggerError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
