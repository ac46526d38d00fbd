//! Best-effort display labels for wallet addresses

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Name service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Name service unavailable: {0}")]
    Unavailable(String),
}

/// Looks up a human readable name for an address
#[async_trait]
pub trait LabelResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Option<String>, LabelError>;
}

/// Resolver used when no naming service is configured
pub struct NoLabelResolver;

#[async_trait]
impl LabelResolver for NoLabelResolver {
    async fn resolve(&self, _address: &str) -> Result<Option<String>, LabelError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct FavoriteDomainResponse {
    result: Option<FavoriteDomain>,
}

#[derive(Debug, Deserialize)]
struct FavoriteDomain {
    reverse: Option<String>,
    domain: Option<String>,
}

/// Reverse lookup against an HTTP naming service
pub struct NameServiceResolver {
    base_url: String,
    client: Client,
}

impl NameServiceResolver {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, LabelError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl LabelResolver for NameServiceResolver {
    async fn resolve(&self, address: &str) -> Result<Option<String>, LabelError> {
        let url = format!("{}/favorite-domain/{}", self.base_url, address);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LabelError::Unavailable(status.to_string()));
        }

        let body: FavoriteDomainResponse = response.json().await?;
        Ok(body.result.and_then(domain_label))
    }
}

fn domain_label(found: FavoriteDomain) -> Option<String> {
    let name = found
        .reverse
        .or(found.domain)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    if name.ends_with(".sol") {
        Some(name)
    } else {
        Some(format!("{}.sol", name))
    }
}
