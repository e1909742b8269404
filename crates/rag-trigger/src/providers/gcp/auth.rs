//! GCP authentication for the Vertex AI REST API
//!
//! Uses a service account key when one is configured (JWT bearer grant),
//! otherwise the metadata server of the runtime (Cloud Run, Cloud Functions, GCE).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Where access tokens come from
#[derive(Debug, Clone)]
enum TokenSource {
    ServiceAccount(PathBuf),
    MetadataServer,
}

/// GCP authentication manager
pub struct GcpAuth {
    source: TokenSource,
    /// Project ID
    project_id: String,
    /// Cached access token
    token: Arc<RwLock<Option<CachedToken>>>,
    http: reqwest::Client,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl GcpAuth {
    /// Create from service account JSON key file
    pub fn from_service_account(key_path: impl AsRef<Path>, project_id: String) -> Result<Self> {
        let key_path = key_path.as_ref();
        if !key_path.exists() {
            return Err(Error::Config(format!(
                "Service account key not found: {}",
                key_path.display()
            )));
        }

        Ok(Self {
            source: TokenSource::ServiceAccount(key_path.to_path_buf()),
            project_id,
            token: Arc::new(RwLock::new(None)),
            http: reqwest::Client::new(),
        })
    }

    /// Use the runtime's attached service account
    pub fn from_metadata_server(project_id: String) -> Self {
        Self {
            source: TokenSource::MetadataServer,
            project_id,
            token: Arc::new(RwLock::new(None)),
            http: reqwest::Client::new(),
        }
    }

    /// Pick the key file when configured, the metadata server otherwise
    pub fn from_config(config: &crate::config::GcpConfig) -> Result<Self> {
        match &config.service_account_key_path {
            Some(path) => Self::from_service_account(path, config.project_id.clone()),
            None => Ok(Self::from_metadata_server(config.project_id.clone())),
        }
    }

    /// Get project ID
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Get a valid access token (refreshing if needed)
    pub async fn get_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if let Some(ref cached) = *token {
                // Token valid for at least 60 more seconds
                if cached.expires_at > Instant::now() + Duration::from_secs(60) {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let response = match &self.source {
            TokenSource::ServiceAccount(path) => self.exchange_service_account(path).await?,
            TokenSource::MetadataServer => self.fetch_metadata_token().await?,
        };

        // Tokens are typically valid for 1 hour; assume 55 minutes when unspecified
        let lifetime = response.expires_in.unwrap_or(55 * 60);
        {
            let mut token = self.token.write().await;
            *token = Some(CachedToken {
                access_token: response.access_token.clone(),
                expires_at: Instant::now() + Duration::from_secs(lifetime),
            });
        }

        Ok(response.access_token)
    }

    async fn fetch_metadata_token(&self) -> Result<TokenResponse> {
        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Metadata server request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "Metadata server token request failed ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Failed to parse metadata token: {}", e)))
    }

    /// Exchange a signed JWT for an access token
    async fn exchange_service_account(&self, key_path: &Path) -> Result<TokenResponse> {
        let key_content = tokio::fs::read_to_string(key_path).await.map_err(|e| {
            Error::Config(format!(
                "Failed to read service account key {}: {}",
                key_path.display(),
                e
            ))
        })?;

        #[derive(serde::Deserialize)]
        struct ServiceAccountKey {
            client_email: String,
            private_key: String,
            token_uri: String,
        }

        let key: ServiceAccountKey = serde_json::from_str(&key_content).map_err(|e| {
            Error::Config(format!("Invalid service account key format: {}", e))
        })?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| Error::internal(format!("System clock before epoch: {}", e)))?
            .as_secs() as i64;

        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": CLOUD_PLATFORM_SCOPE,
            "aud": key.token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        let jwt = sign_jwt(&claims, &key.private_key)?;

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Failed to parse token response: {}", e)))
    }

    /// Create HTTP client with auth headers
    pub async fn authorized_client(&self) -> Result<reqwest::Client> {
        let token = self.get_token().await?;
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", token)
                .parse::<reqwest::header::HeaderValue>()
                .map_err(|e| Error::Auth(format!("Access token is not a valid header: {}", e)))?,
        );

        reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))
    }
}

/// RS256-sign a claim set
fn sign_jwt(claims: &serde_json::Value, private_key_pem: &str) -> Result<String> {
    use base64::Engine;
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = engine.encode(r#"{"alg":"RS256","typ":"JWT"}"#.as_bytes());
    let payload = engine.encode(claims.to_string().as_bytes());
    let signing_input = format!("{}.{}", header, payload);

    let private_key = private_key_pem.replace("\\n", "\n");
    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(
        pem::parse(&private_key)
            .map_err(|e| Error::Config(format!("Failed to parse private key PEM: {}", e)))?
            .contents(),
    )
    .map_err(|e| Error::Config(format!("Failed to parse private key: {:?}", e)))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            signing_input.as_bytes(),
            &mut signature,
        )
        .map_err(|e| Error::Auth(format!("Failed to sign JWT: {:?}", e)))?;

    Ok(format!("{}.{}", signing_input, engine.encode(&signature)))
}
