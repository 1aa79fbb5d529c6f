// Identity provider boundary: where the browser signs in, and who a credential belongs to
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::config::IdentityConfig;
use crate::model::Principal;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Credential rejected: {0}")]
    Rejected(String),

    #[error("No identity provider configured; set identity.url or pass --dev-identity")]
    NotConfigured,
}

/// An authenticated principal plus the credential the backend accepts for it.
#[derive(Debug, Clone)]
pub struct Identity {
    pub principal: Principal,
    pub credential: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to sign in. The provider redirects back to
    /// `callback` with a `credential` query parameter.
    fn login_url(&self, callback: &Url, hint: Option<&str>) -> Result<Url, IdentityError>;

    /// Resolve a credential returned to the callback into an identity.
    async fn resolve(&self, credential: &str) -> Result<Identity, IdentityError>;
}

/// Pick the provider for `config`. The development provider is never chosen
/// unless it was asked for.
pub fn from_config(config: &IdentityConfig) -> Result<Arc<dyn IdentityProvider>, IdentityError> {
    match (&config.url, config.dev) {
        (Some(url), _) => {
            tracing::info!("Identity provider: {}", url);
            Ok(Arc::new(HttpIdentityProvider::new(url)?))
        }
        (None, true) => {
            tracing::warn!("Development sign-in enabled: any credential is accepted");
            Ok(Arc::new(DevIdentityProvider))
        }
        (None, false) => Err(IdentityError::NotConfigured),
    }
}

/// External identity provider reached over HTTP.
pub struct HttpIdentityProvider {
    client: Client,
    base_url: Url,
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    credential: &'a str,
}

#[derive(Deserialize)]
struct ResolveResponse {
    principal: Principal,
}

impl HttpIdentityProvider {
    /// Endpoints are resolved under `base_url`, so a path prefix such as
    /// `/idp` is kept whether or not it ends in a slash.
    pub fn new(base_url: &str) -> Result<Self, IdentityError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn login_url(&self, callback: &Url, hint: Option<&str>) -> Result<Url, IdentityError> {
        let mut url = self.base_url.join("authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("callback", callback.as_str());
            if let Some(hint) = hint {
                query.append_pair("login_hint", hint);
            }
        }
        Ok(url)
    }

    async fn resolve(&self, credential: &str) -> Result<Identity, IdentityError> {
        let url = self.base_url.join("resolve")?;
        let response = self
            .client
            .post(url)
            .json(&ResolveRequest { credential })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::Rejected(format!(
                "identity provider returned {}",
                response.status()
            )));
        }

        let ResolveResponse { principal } = response.json().await?;
        Ok(Identity {
            principal,
            credential: credential.to_string(),
        })
    }
}

/// Local development provider: the credential is the principal text.
pub struct DevIdentityProvider;

const DEV_DEFAULT_PRINCIPAL: &str = "dev-user";

#[async_trait]
impl IdentityProvider for DevIdentityProvider {
    fn login_url(&self, callback: &Url, hint: Option<&str>) -> Result<Url, IdentityError> {
        let mut url = callback.clone();
        let principal = hint
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(DEV_DEFAULT_PRINCIPAL);
        url.query_pairs_mut().append_pair("credential", principal);
        Ok(url)
    }

    async fn resolve(&self, credential: &str) -> Result<Identity, IdentityError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(IdentityError::Rejected("empty credential".into()));
        }
        Ok(Identity {
            principal: Principal::new(credential),
            credential: credential.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback() -> Url {
        Url::parse("http://localhost:3000/auth/callback").unwrap()
    }

    #[test]
    fn http_login_url_carries_callback() {
        let provider = HttpIdentityProvider::new("http://identity.localhost:4943/").unwrap();
        let url = provider.login_url(&callback(), None).unwrap();
        assert_eq!(url.path(), "/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![(
                "callback".to_string(),
                "http://localhost:3000/auth/callback".to_string()
            )]
        );
    }

    #[test]
    fn http_endpoints_stay_under_the_base_path() {
        for base in ["http://auth.example/idp", "http://auth.example/idp/"] {
            let provider = HttpIdentityProvider::new(base).unwrap();
            let url = provider.login_url(&callback(), Some("alice")).unwrap();
            assert_eq!(url.path(), "/idp/authorize");
            let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
            let hint = ("login_hint".to_string(), "alice".to_string());
            assert!(pairs.contains(&hint));
        }
    }

    #[test]
    fn dev_login_url_returns_straight_to_callback() {
        let url = DevIdentityProvider
            .login_url(&callback(), Some("alice"))
            .unwrap();
        assert_eq!(url.path(), "/auth/callback");
        assert_eq!(url.query(), Some("credential=alice"));

        let url = DevIdentityProvider.login_url(&callback(), None).unwrap();
        assert_eq!(url.query(), Some("credential=dev-user"));
    }

    #[test]
    fn unconfigured_identity_is_refused() {
        let config = IdentityConfig::default();
        assert!(matches!(from_config(&config), Err(IdentityError::NotConfigured)));
    }

    #[tokio::test]
    async fn dev_provider_only_when_requested() {
        let config = IdentityConfig {
            url: None,
            dev: true,
        };
        let provider = from_config(&config).unwrap();
        let identity = provider.resolve("alice").await.unwrap();
        assert_eq!(identity.principal, Principal::new("alice"));

        let config = IdentityConfig {
            url: Some("http://auth.example/idp".to_string()),
            dev: true,
        };
        let provider = from_config(&config).unwrap();
        let url = provider.login_url(&callback(), None).unwrap();
        assert_eq!(url.path(), "/idp/authorize");
    }

    #[tokio::test]
    async fn dev_resolve_uses_credential_as_principal() {
        let identity = DevIdentityProvider.resolve("alice").await.unwrap();
        assert_eq!(identity.principal, Principal::new("alice"));
        assert!(DevIdentityProvider.resolve("  ").await.is_err());
    }
}
