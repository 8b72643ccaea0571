//! Random user generator tool backed by randomuser.me.

use async_trait::async_trait;
use reqwest::{Client, Url};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument, Span, error, info, info_span};

use super::common::{body_snippet, build_client, parse_json};
use crate::core::config::UpstreamConfig;
use crate::domains::tools::error::{ToolError, UpstreamError};
use crate::domains::tools::handlers::ToolDefinition;

/// Gender selector accepted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Parameters for the random user tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RandomUserParams {
    /// Gender for the user.
    pub gender: Gender,

    /// Nationality for the user, e.g. "us", "gb" or "fr".
    #[serde(default)]
    pub nationality: Option<String>,
}

/// HTTP client for the random user provider.
#[derive(Debug, Clone)]
pub struct RandomUserClient {
    http: Client,
    base_url: String,
    span: Span,
}

impl RandomUserClient {
    pub fn new(config: &UpstreamConfig, parent: &Span) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: build_client(config.timeout, &config.user_agent)?,
            base_url: config.random_user.base_url.clone(),
            span: info_span!(parent: parent, "random_user"),
        })
    }

    /// Provider URL with one query parameter per supplied filter.
    pub fn request_url(&self, params: &RandomUserParams) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| UpstreamError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("gender", params.gender.as_str());
            if let Some(nat) = params.nationality.as_deref().filter(|n| !n.is_empty()) {
                query.append_pair("nat", nat);
            }
        }
        Ok(url)
    }

    /// Generate a random user. Single attempt, no retry.
    pub async fn generate(&self, params: &RandomUserParams) -> Result<Value, UpstreamError> {
        let url = self.request_url(params)?;

        async {
            info!("Calling Random User API: {}", url);

            let response = self.http.get(url.clone()).send().await.map_err(|e| {
                error!("Error generating random user: {}", e);
                UpstreamError::Network(e)
            })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!("Random User API returned {}", status);
                return Err(UpstreamError::Status {
                    status,
                    message: body_snippet(&body),
                });
            }

            let body = response.bytes().await.map_err(UpstreamError::Network)?;
            let data = parse_json(url.as_str(), &body)?;
            info!("Successfully retrieved random user data");
            Ok(data)
        }
        .instrument(self.span.clone())
        .await
    }
}

/// Random User Tool implementation.
#[derive(Debug, Clone)]
pub struct RandomUserTool {
    client: RandomUserClient,
}

impl RandomUserTool {
    pub fn new(config: &UpstreamConfig, parent: &Span) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: RandomUserClient::new(config, parent)?,
        })
    }
}

#[async_trait]
impl ToolDefinition for RandomUserTool {
    const NAME: &'static str = "create_random_user";
    const DESCRIPTION: &'static str = "Generate random user data";

    type Params = RandomUserParams;

    async fn execute(&self, params: RandomUserParams) -> Result<Value, ToolError> {
        info!(
            "Received user generation request with gender={}",
            params.gender.as_str()
        );
        self.client
            .generate(&params)
            .await
            .map_err(|e| ToolError::execution(Self::NAME, e))
    }
}
