use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;
use tracing::debug;

const DEFAULT_REGION: &str = "us-east-1";
const API_KEY_VAR: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// Connection settings for the Bedrock control and runtime APIs.
///
/// Built once at startup and handed to [`super::BedrockClient::new`]; nothing
/// reads the environment after that.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub region: String,
    pub api_key: String,
    pub control_endpoint: String,
    pub runtime_endpoint: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn new(region: impl Into<String>, api_key: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            control_endpoint: control_endpoint_for(&region),
            runtime_endpoint: runtime_endpoint_for(&region),
            region,
            api_key: api_key.into(),
            timeout: Duration::from_secs(120),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }

    /// Reads `.env` (if any) and the process environment.
    pub fn from_env() -> Result<Self> {
        match dotenv::dotenv() {
            Ok(path) => debug!(path = ?path, "environment loaded from file"),
            Err(err) => debug!(%err, "no .env file loaded"),
        }

        let region = env::var("AWS_REGION")
            .or_else(|_| env::var("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let api_key = env::var(API_KEY_VAR)
            .map_err(|_| anyhow!("environment variable {} is not set", API_KEY_VAR))?;

        let mut config = Self::new(region, api_key);
        if let Ok(endpoint) = env::var("BEDROCK_ENDPOINT") {
            config = config.with_control_endpoint(endpoint);
        }
        if let Ok(endpoint) = env::var("BEDROCK_RUNTIME_ENDPOINT") {
            config = config.with_runtime_endpoint(endpoint);
        }
        Ok(config)
    }

    /// Changes the region and re-derives both default endpoints.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self.control_endpoint = control_endpoint_for(&self.region);
        self.runtime_endpoint = runtime_endpoint_for(&self.region);
        self
    }

    pub fn with_control_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.control_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_runtime_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.runtime_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }
}

fn control_endpoint_for(region: &str) -> String {
    format!("https://bedrock.{}.amazonaws.com", region)
}

fn runtime_endpoint_for(region: &str) -> String {
    format!("https://bedrock-runtime.{}.amazonaws.com", region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_follow_region() {
        let config = ProviderConfig::new("us-east-1", "key").with_region("eu-west-3");
        assert_eq!(config.control_endpoint, "https://bedrock.eu-west-3.amazonaws.com");
        assert_eq!(
            config.runtime_endpoint,
            "https://bedrock-runtime.eu-west-3.amazonaws.com"
        );
    }

    #[test]
    fn overrides_drop_trailing_slash() {
        let config = ProviderConfig::new("us-east-1", "key")
            .with_runtime_endpoint("http://127.0.0.1:4000/")
            .with_temperature(3.0)
            .with_max_tokens(0);
        assert_eq!(config.runtime_endpoint, "http://127.0.0.1:4000");
        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.max_tokens, 1);
    }
}
