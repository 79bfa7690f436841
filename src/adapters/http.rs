use crate::domain::model::SubscriptionSnapshot;
use crate::domain::ports::SubscriptionSource;
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::validate_url;
use reqwest::Client;
use std::time::Duration;

pub const ENHANCED_SUBSCRIPTION_PATH: &str = "/api/school/admin/subscription/enhanced";

#[derive(Clone)]
pub struct HttpSubscriptionSource {
    client: Client,
    url: String,
    token: String,
}

impl HttpSubscriptionSource {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        validate_url("server.base_url", base_url)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: format!(
                "{}{}",
                base_url.trim_end_matches('/'),
                ENHANCED_SUBSCRIPTION_PATH
            ),
            token: token.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SubscriptionSource for HttpSubscriptionSource {
    async fn fetch(&self) -> Result<SubscriptionSnapshot> {
        tracing::debug!("Making API request to: {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        tracing::debug!("API response status: {}", response.status());
        if !response.status().is_success() {
            return Err(RelayError::HttpStatusError {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let snapshot: SubscriptionSnapshot = response.json().await?;
        Ok(snapshot)
    }
}
