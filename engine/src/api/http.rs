use super::wire::{
    BatchRequest, ErrorEnvelope, ListSchemasResponse, OrgUnitRecord, OrgUnitsResponse,
    ResolveRequest, ResolveResponse, ResolvedPolicyRecord, SchemaRecord, TargetResourceRef,
};
use super::{Page, PolicyBackend};
use crate::error::PolicyError;
use crate::model::{InheritRequest, ModifyRequest};
use async_trait::async_trait;
use config_loader::{ConsoleConfig, TokenError, TokenProvider};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// reqwest-backed [`PolicyBackend`]. Asks its [`TokenProvider`] for a bearer
/// token on every request, on the blocking pool since providers may read
/// files or run a command.
pub struct HttpPolicyBackend {
    client: Client,
    policy_api: Url,
    directory_api: Url,
    customer: String,
    page_size: u32,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpPolicyBackend {
    pub fn new(config: &ConsoleConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, PolicyError> {
        let policy_api = parse_base_url(&config.policy_api_url)?;
        let directory_api = parse_base_url(&config.directory_api_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("policyctl"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PolicyError::Transport {
                status: None,
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            policy_api,
            directory_api,
            customer: config.customer.clone(),
            page_size: config.page_size,
            tokens,
        })
    }

    fn policy_url(&self, path: &str) -> Result<Url, PolicyError> {
        join_url(
            &self.policy_api,
            &format!("v1/customers/{}/{}", self.customer, path),
        )
    }

    fn directory_url(&self, path: &str) -> Result<Url, PolicyError> {
        join_url(
            &self.directory_api,
            &format!("admin/directory/v1/customer/{}/{}", self.customer, path),
        )
    }

    async fn bearer_token(&self) -> Result<String, PolicyError> {
        let tokens = Arc::clone(&self.tokens);
        let token = tokio::task::spawn_blocking(move || tokens.token())
            .await
            .map_err(|e| TokenError::Unavailable {
                message: format!("token provider did not finish: {}", e),
            })??;
        Ok(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PolicyError> {
        let token = self.bearer_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PolicyError::Transport {
                status: None,
                message: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = server_message(&body).unwrap_or_else(|| status.to_string());
        warn!(status = status.as_u16(), "policy API returned an error: {}", message);

        match status.as_u16() {
            401 | 403 => Err(PolicyError::Auth { message }),
            code => Err(PolicyError::Transport {
                status: Some(code),
                message,
            }),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, PolicyError> {
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| PolicyError::InvalidResponse {
                message: format!("Failed to decode response: {}", e),
            })
    }
}

#[async_trait]
impl PolicyBackend for HttpPolicyBackend {
    #[instrument(skip(self))]
    async fn list_schemas(
        &self,
        namespace: &str,
        page_token: Option<&str>,
    ) -> Result<Page<SchemaRecord>, PolicyError> {
        let mut url = self.policy_url("policySchemas")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("pageSize", &self.page_size.to_string());
            pairs.append_pair("filter", &format!("namespace={}", namespace));
            if let Some(token) = page_token {
                pairs.append_pair("pageToken", token);
            }
        }

        debug!("Listing policy schemas");
        let response: ListSchemasResponse = self.send_json(self.client.get(url)).await?;
        Ok(Page {
            items: response.policy_schemas,
            next_page_token: response.next_page_token,
        })
    }

    #[instrument(skip(self))]
    async fn resolve(
        &self,
        target_resource: &str,
        schema_filter: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ResolvedPolicyRecord>, PolicyError> {
        let url = self.policy_url("policies:resolve")?;
        let body = ResolveRequest {
            policy_target_key: TargetResourceRef { target_resource },
            policy_schema_filter: schema_filter.to_string(),
            page_token,
        };

        debug!("Resolving policies");
        let response: ResolveResponse = self.send_json(self.client.post(url).json(&body)).await?;
        Ok(Page {
            items: response.resolved_policies,
            next_page_token: response.next_page_token,
        })
    }

    #[instrument(skip(self))]
    async fn list_org_units(&self) -> Result<Vec<OrgUnitRecord>, PolicyError> {
        let mut url = self.directory_url("orgunits")?;
        url.query_pairs_mut()
            .append_pair("type", "ALL_INCLUDING_PARENT");

        let response: OrgUnitsResponse = self.send_json(self.client.get(url)).await?;
        Ok(response.organization_units)
    }

    #[instrument(skip(self, requests), fields(count = requests.len()))]
    async fn batch_modify(&self, requests: &[ModifyRequest]) -> Result<(), PolicyError> {
        let url = self.policy_url("policies/orgunits:batchModify")?;
        self.send(self.client.post(url).json(&BatchRequest { requests }))
            .await
            .map(|_| ())
    }

    #[instrument(skip(self, requests), fields(count = requests.len()))]
    async fn batch_inherit(&self, requests: &[InheritRequest]) -> Result<(), PolicyError> {
        let url = self.policy_url("policies/orgunits:batchInherit")?;
        self.send(self.client.post(url).json(&BatchRequest { requests }))
            .await
            .map(|_| ())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, PolicyError> {
    // A trailing slash keeps `Url::join` from dropping the last path segment.
    let normalized = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalized).map_err(|e| PolicyError::Transport {
        status: None,
        message: format!("Invalid API base URL {}: {}", raw, e),
    })
}

fn join_url(base: &Url, path: &str) -> Result<Url, PolicyError> {
    base.join(path).map_err(|e| PolicyError::Transport {
        status: None,
        message: format!("Invalid API path {}: {}", path, e),
    })
}

/// Pull `error.message` out of a Google-style error body.
fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
}
