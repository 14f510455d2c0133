use crate::api::Fetcher;
use crate::core::error::RefreshError;
use crate::core::identity::IdentityProvider;
use crate::core::models::{Identity, Resource};
use crate::core::settings::ApiSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// REST client for the marketplace backend.
#[derive(Clone)]
pub struct MarketplaceClient {
    http: reqwest::Client,
    base_url: String,
}

impl MarketplaceClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, resource: Resource, identity: &Identity) -> String {
        format!("{}{}", self.base_url, resource.path(identity))
    }

    pub async fn get<T: DeserializeOwned>(&self, resource: Resource, identity: &Identity) -> Result<T> {
        let url = self.url_for(resource, identity);
        let mut request = self.http.get(&url);
        if let Some(token) = &identity.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", resource.name()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Marketplace API error: {} - {}", status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {} response", resource.name()))
    }

    /// A fetcher for one resource that authenticates as whoever is signed in
    /// at the time of each fetch.
    pub fn fetcher<T>(
        &self,
        resource: Resource,
        identity: Arc<dyn IdentityProvider>,
    ) -> ResourceFetcher<T> {
        ResourceFetcher {
            client: self.clone(),
            resource,
            identity,
            _payload: PhantomData,
        }
    }
}

pub struct ResourceFetcher<T> {
    client: MarketplaceClient,
    resource: Resource,
    identity: Arc<dyn IdentityProvider>,
    _payload: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T> Fetcher<T> for ResourceFetcher<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self) -> Result<T> {
        let identity = self
            .identity
            .current()
            .ok_or(RefreshError::MissingIdentity)?;

        tracing::debug!(resource = self.resource.name(), user = %identity.key, "Fetching resource");
        self.client.get(self.resource, &identity).await
    }
}
