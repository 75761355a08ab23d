use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use shared::domain::Theme;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DARK_FORM_ID: u64 = 4917152;
pub const LIGHT_FORM_ID: u64 = 4917153;
pub const DEFAULT_API_URL: &str = "https://api.convertkit.com";

/// Signup form the subscriber lands in; each site theme has its own form.
pub fn form_id(theme: Theme) -> u64 {
    match theme {
        Theme::Dark => DARK_FORM_ID,
        Theme::Light => LIGHT_FORM_ID,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeData {
    pub email: String,
    pub theme: Theme,
}

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("invalid newsletter api url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("newsletter request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("newsletter provider rejected form {form_id} subscription with status {status}")]
    Rejected { form_id: u64, status: u16 },
}

#[async_trait]
pub trait NewsletterGateway: Send + Sync {
    async fn subscribe(&self, data: &SubscribeData) -> Result<(), NewsletterError>;
}

#[derive(Debug, Clone)]
pub struct ConvertKitConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for ConvertKitConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct SubscribeBody<'a> {
    api_key: &'a str,
    email: &'a str,
}

/// Forwards signups to the ConvertKit v3 form subscribe endpoint.
#[derive(Debug, Clone)]
pub struct ConvertKitClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl ConvertKitClient {
    pub fn new(config: ConvertKitConfig) -> Result<Self, NewsletterError> {
        let mut base_url =
            Url::parse(&config.api_url).map_err(|source| NewsletterError::InvalidUrl {
                url: config.api_url.clone(),
                source,
            })?;
        // `Url::join` replaces the last segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        if config.api_key.is_empty() {
            warn!("newsletter api key is empty; provider will reject subscriptions");
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
        })
    }

    pub fn endpoint(&self, form_id: u64) -> Result<Url, NewsletterError> {
        let path = format!("v3/forms/{form_id}/subscribe");
        self.base_url
            .join(&path)
            .map_err(|source| NewsletterError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }
}

#[async_trait]
impl NewsletterGateway for ConvertKitClient {
    async fn subscribe(&self, data: &SubscribeData) -> Result<(), NewsletterError> {
        let form_id = form_id(data.theme);
        let endpoint = self.endpoint(form_id)?;
        let response = self
            .http
            .post(endpoint)
            .json(&SubscribeBody {
                api_key: &self.api_key,
                email: &data.email,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsletterError::Rejected {
                form_id,
                status: status.as_u16(),
            });
        }
        debug!(form_id, "newsletter subscription forwarded");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
