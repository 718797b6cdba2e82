use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::{
    config::HubConfig,
    error::{HubError, Result},
};

const READY: &str = "ready";

/// Where to fetch an artifact and the SHA-256 it must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub url: String,
    pub expected_checksum: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistryRequest<'a> {
    model_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_secret: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryResponse {
    status: String,
    #[serde(default)]
    project_secret_needed: bool,
    #[serde(default)]
    signed_url: Option<String>,
    #[serde(default)]
    hash: Option<String>,
}

/// Looks model keys up in the hub registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    endpoint: String,
    client: Client,
}

impl RegistryClient {
    pub fn new(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn from_config(config: &HubConfig) -> Result<Self> {
        Ok(Self::new(config.endpoint.clone(), config.http_client()?))
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    pub fn resolve(&self, model_key: &str, project_secret: Option<&str>) -> Result<ResolvedSource> {
        tracing::debug!(model_key, endpoint = %self.endpoint, "resolving model");
        let response: RegistryResponse = self
            .client
            .post(&self.endpoint)
            .json(&RegistryRequest {
                model_key,
                project_secret,
            })
            .send()
            .map_err(|err| HubError::transport("contact model registry", err))?
            .error_for_status()
            .map_err(|err| HubError::transport("model registry rejected the request", err))?
            .json()
            .map_err(|err| HubError::MalformedResponse(err.to_string()))?;

        if response.status != READY {
            return Err(HubError::NotReady {
                model_key: model_key.to_string(),
                status: response.status,
            });
        }

        if !response.project_secret_needed && project_secret.is_some() {
            tracing::warn!(
                model_key,
                "project secret unnecessarily supplied when downloading public model"
            );
        }

        let url = response
            .signed_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| HubError::MalformedResponse("ready model without signedUrl".into()))?;
        let expected_checksum = response
            .hash
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| HubError::MalformedResponse("ready model without hash".into()))?;

        Ok(ResolvedSource {
            url,
            expected_checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_absent_secret() {
        let body = serde_json::to_value(RegistryRequest {
            model_key: "abc",
            project_secret: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "modelKey": "abc" }));

        let body = serde_json::to_value(RegistryRequest {
            model_key: "abc",
            project_secret: Some("s3cret"),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "modelKey": "abc", "projectSecret": "s3cret" })
        );
    }

    #[test]
    fn pending_response_parses_without_url() {
        let response: RegistryResponse =
            serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
        assert_eq!(response.status, "pending");
        assert!(response.signed_url.is_none());
        assert!(!response.project_secret_needed);
    }
}
