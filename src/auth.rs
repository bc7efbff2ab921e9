//! Access token acquisition for Google APIs.
//!
//! Tokens come from one of three sources: installed-app user credentials
//! (stored and refreshed on disk), a service account key, or a bearer token
//! supplied up front.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{DriveError, Result};
use crate::models::{default_token_uri, ServiceAccountCredentials, TokenResponse};
use crate::oauth::{ConsentOptions, InstalledAppFlow, DRIVE_READONLY_SCOPE};
use crate::token_store::{unix_now, StoredCredentials, TokenStore};

/// Tokens this close to expiry are treated as expired.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Lifetime given to bearer tokens supplied up front.
const STATIC_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 3600);

/// JWT claims for service account authentication.
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,   // Issuer (service account email)
    scope: String, // OAuth scope
    aud: String,   // Audience (token endpoint)
    exp: u64,      // Expiration time
    iat: u64,      // Issued at
}

/// Cached access token with expiration.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at > SystemTime::now() + EXPIRY_BUFFER
    }
}

enum TokenSource {
    InstalledApp {
        flow: InstalledAppFlow,
        store: TokenStore,
        consent: ConsentOptions,
    },
    ServiceAccount(ServiceAccountCredentials),
    Static,
}

/// Authenticator for Google APIs.
#[derive(Clone)]
pub struct Authenticator {
    source: Arc<TokenSource>,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl Authenticator {
    /// Authenticate as the user through stored or freshly consented tokens.
    pub fn installed_app(
        flow: InstalledAppFlow,
        store: TokenStore,
        consent: ConsentOptions,
    ) -> Self {
        Self::with_source(TokenSource::InstalledApp {
            flow,
            store,
            consent,
        })
    }

    /// Create a new authenticator from a service account JSON file.
    pub fn from_service_account_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let credentials: ServiceAccountCredentials = serde_json::from_str(&content)?;
        Ok(Self::service_account(credentials))
    }

    pub fn service_account(credentials: ServiceAccountCredentials) -> Self {
        Self::with_source(TokenSource::ServiceAccount(credentials))
    }

    /// Use a bearer token obtained elsewhere. It is never refreshed.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        let cached = CachedToken {
            access_token: token.into(),
            expires_at: SystemTime::now() + STATIC_TOKEN_LIFETIME,
        };
        Self {
            source: Arc::new(TokenSource::Static),
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(Some(cached))),
        }
    }

    fn with_source(source: TokenSource) -> Self {
        Self {
            source: Arc::new(source),
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Make sure a token is available, running the consent flow if needed.
    pub async fn authorize(&self) -> Result<()> {
        self.get_access_token().await.map(|_| ())
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.access_token.clone());
            }
        }

        let new_token = self.fetch_token().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        match self.source.as_ref() {
            TokenSource::InstalledApp {
                flow,
                store,
                consent,
            } => self.user_token(flow, store, consent).await,
            TokenSource::ServiceAccount(credentials) => {
                self.service_account_token(credentials).await
            }
            TokenSource::Static => Err(DriveError::TokenRefreshError(
                "the supplied access token cannot be refreshed".to_string(),
            )),
        }
    }

    async fn user_token(
        &self,
        flow: &InstalledAppFlow,
        store: &TokenStore,
        consent: &ConsentOptions,
    ) -> Result<CachedToken> {
        let stored = store.load()?;

        if let Some(stored) = stored {
            let cached = CachedToken {
                access_token: stored.access_token.clone(),
                expires_at: stored.expires_at(),
            };
            if cached.is_fresh() {
                debug!("Using stored credentials from {}", store.path().display());
                return Ok(cached);
            }

            if let Some(refresh_token) = stored.refresh_token {
                match flow.refresh(&refresh_token).await {
                    Ok(response) => {
                        let refreshed =
                            StoredCredentials::from_response(response, Some(refresh_token));
                        store.save(&refreshed)?;
                        return Ok(cached_from_stored(&refreshed));
                    }
                    Err(DriveError::TokenRefreshError(reason)) => {
                        warn!("Stored refresh token was rejected ({}), re-authorizing", reason);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let response = flow.run(consent).await?;
        let credentials = StoredCredentials::from_response(response, None);
        store.save(&credentials)?;
        Ok(cached_from_stored(&credentials))
    }

    /// Exchange a signed JWT assertion for an access token.
    async fn service_account_token(
        &self,
        credentials: &ServiceAccountCredentials,
    ) -> Result<CachedToken> {
        let token_uri = credentials
            .token_uri
            .clone()
            .unwrap_or_else(default_token_uri);
        let now = unix_now();

        let claims = Claims {
            iss: credentials.client_email.clone(),
            scope: DRIVE_READONLY_SCOPE.to_string(),
            aud: token_uri.clone(),
            iat: now,
            exp: now + 3600, // 1 hour
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
        let jwt = encode(&header, &claims, &key)?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ];

        let response = self.client.post(&token_uri).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefreshError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at: SystemTime::now() + Duration::from_secs(token_response.expires_in),
        })
    }
}

fn cached_from_stored(credentials: &StoredCredentials) -> CachedToken {
    CachedToken {
        access_token: credentials.access_token.clone(),
        expires_at: credentials.expires_at(),
    }
}
