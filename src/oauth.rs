use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::OAuthConfig;

/// What the hosted identity provider returns for a session handle.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSession {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub session_token: String,
}

#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Exchange an opaque provider session id for the user's identity data.
    async fn exchange(&self, session_id: &str) -> anyhow::Result<ProviderSession>;
    /// Hosted login page the frontend should redirect to.
    fn auth_url(&self) -> String;
}

pub struct HostedOAuth {
    http: reqwest::Client,
    provider_url: String,
    redirect_url: String,
}

impl HostedOAuth {
    pub fn new(config: &OAuthConfig) -> anyhow::Result<Self> {
        // Bounded timeout: a stalled provider must fail the request, not hang it.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("build oauth http client")?;
        Ok(Self {
            http,
            provider_url: config.provider_url.clone(),
            redirect_url: config.redirect_url.clone(),
        })
    }
}

#[async_trait]
impl OAuthClient for HostedOAuth {
    async fn exchange(&self, session_id: &str) -> anyhow::Result<ProviderSession> {
        let url = format!("{}/auth/v1/env/oauth/session-data", self.provider_url);
        let resp = self
            .http
            .get(&url)
            .header("X-Session-ID", session_id)
            .send()
            .await
            .context("oauth session-data request")?;

        if !resp.status().is_success() {
            anyhow::bail!("oauth provider returned {}", resp.status());
        }

        let session = resp
            .json::<ProviderSession>()
            .await
            .context("decode oauth session-data")?;
        Ok(session)
    }

    fn auth_url(&self) -> String {
        format!("{}/?redirect={}", self.provider_url, self.redirect_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OAuthConfig {
        OAuthConfig {
            provider_url: "https://auth.example.com".into(),
            redirect_url: "http://localhost:3000/dashboard".into(),
            timeout_seconds: 10,
        }
    }

    #[test]
    fn auth_url_carries_redirect() {
        let client = HostedOAuth::new(&test_config()).expect("client builds");
        assert_eq!(
            client.auth_url(),
            "https://auth.example.com/?redirect=http://localhost:3000/dashboard"
        );
    }

    #[test]
    fn provider_session_decodes_without_picture() {
        let session: ProviderSession = serde_json::from_str(
            r#"{"id":"g-123","email":"a@b.com","name":"A B","session_token":"tok"}"#,
        )
        .expect("decodes");
        assert_eq!(session.email, "a@b.com");
        assert!(session.picture.is_none());
    }
}
