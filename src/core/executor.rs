use crate::core::{ConfigProvider, SqlExecutor};
use crate::utils::error::{Result, RunnerError};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use url::Url;

/// Calls the database's exec-SQL function through its REST RPC surface
/// (`POST {endpoint}/rest/v1/rpc/{function}`).
pub struct RpcExecutor {
    client: Client,
    url: Url,
    api_key: String,
    parameter: String,
}

impl RpcExecutor {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let url = rpc_url(config.endpoint(), config.rpc_function())?;
        let client = Client::builder().timeout(config.timeout()).build()?;

        tracing::debug!("RPC target: {}", url);

        Ok(Self {
            client,
            url,
            api_key: config.api_key().to_string(),
            parameter: config.rpc_parameter().to_string(),
        })
    }
}

fn rpc_url(endpoint: &str, function: &str) -> Result<Url> {
    let base = format!("{}/", endpoint.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|u| u.join(&format!("rest/v1/rpc/{}", function)))
        .map_err(|e| RunnerError::InvalidConfigValueError {
            field: "endpoint".to_string(),
            value: endpoint.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })
}

#[async_trait::async_trait]
impl SqlExecutor for RpcExecutor {
    async fn execute(&self, sql: &str) -> Result<()> {
        let mut body = Map::new();
        body.insert(self.parameter.clone(), Value::String(sql.to_string()));

        let response = self
            .client
            .post(self.url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::remote(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        tracing::debug!("RPC response status: {}", status);

        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(RunnerError::remote(
            Some(status.as_u16()),
            error_message(status, &text),
        ))
    }
}

/// Pulls the human-readable message out of an error response body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "hint"] {
            if let Some(msg) = obj.get(key).and_then(Value::as_str) {
                if !msg.trim().is_empty() {
                    return msg.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
