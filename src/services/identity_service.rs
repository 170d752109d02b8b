use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Chaves públicas que assinam os ID tokens do Firebase Auth
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const DEFAULT_KEYS_TTL: Duration = Duration::from_secs(3600);
/// Intervalo mínimo entre buscas disparadas por um `kid` desconhecido
const REFETCH_COOLDOWN: Duration = Duration::from_secs(60);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const LEEWAY_SECS: u64 = 60;

/// Claims verificados de um ID token Firebase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub auth_time: Option<i64>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credential")]
    MissingCredential,

    #[error("Malformed authorization header")]
    MalformedHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Unsupported token: {0}")]
    UnsupportedToken(String),

    #[error("Unknown signing key {0}")]
    UnknownKey(String),

    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

/// Troca um token (header Bearer ou cookie de sessão) por claims verificados.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<FirebaseClaims, AuthError>;
}

struct CachedKeys {
    keys: JwkSet,
    /// `None` para chaves fixas
    expires_at: Option<Instant>,
    fetched_at: Instant,
}

impl CachedKeys {
    /// `None` quando é preciso buscar de novo.
    fn lookup(&self, kid: &str) -> Option<Result<DecodingKey, AuthError>> {
        let now = Instant::now();
        let expired = self.expires_at.is_some_and(|at| at <= now);
        if expired {
            return None;
        }

        match self.keys.find(kid) {
            Some(jwk) => Some(DecodingKey::from_jwk(jwk).map_err(AuthError::from)),
            None if self.expires_at.is_none() => Some(Err(AuthError::UnknownKey(kid.to_string()))),
            None if now.duration_since(self.fetched_at) < REFETCH_COOLDOWN => {
                log::debug!("🔑 Unknown kid {} within refetch cooldown", kid);
                Some(Err(AuthError::UnknownKey(kid.to_string())))
            }
            None => None,
        }
    }
}

pub struct FirebaseVerifier {
    project_id: String,
    http: reqwest::Client,
    keys_url: String,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        FirebaseVerifier {
            project_id: project_id.into(),
            http: reqwest::Client::new(),
            keys_url: FIREBASE_JWKS_URL.to_string(),
            keys: RwLock::new(None),
        }
    }

    /// Busca as chaves em outro endpoint JWKS.
    pub fn with_keys_url(self, keys_url: impl Into<String>) -> Self {
        FirebaseVerifier {
            keys_url: keys_url.into(),
            ..self
        }
    }

    /// Verificador com chaves fixas (sem buscar no Google).
    pub fn with_keys(project_id: impl Into<String>, keys: JwkSet) -> Self {
        let verifier = Self::new(project_id);
        FirebaseVerifier {
            keys: RwLock::new(Some(CachedKeys {
                keys,
                expires_at: None,
                fetched_at: Instant::now(),
            })),
            ..verifier
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = LEEWAY_SECS;
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);
        validation
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.keys.read().await.as_ref().and_then(|cached| cached.lookup(kid)) {
            return key;
        }

        // Um único fetch por vez; quem esperava o lock reaproveita o resultado
        let mut cache = self.keys.write().await;
        if let Some(key) = cache.as_ref().and_then(|cached| cached.lookup(kid)) {
            return key;
        }

        // Cache vazio, expirado, ou o Google rotacionou as chaves
        let refreshed = self.fetch_keys().await?;
        let key = refreshed
            .keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()?
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()));

        *cache = Some(refreshed);
        key
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, AuthError> {
        log::debug!("🔑 Fetching Firebase signing keys");

        let response = tokio::time::timeout(FETCH_TIMEOUT, self.http.get(&self.keys_url).send())
            .await
            .map_err(|_| AuthError::KeyFetch(format!("timed out after {}s", FETCH_TIMEOUT.as_secs())))?
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetch(format!("HTTP {}", response.status())));
        }

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(max_age)
            .unwrap_or(DEFAULT_KEYS_TTL);

        let keys: JwkSet = tokio::time::timeout(FETCH_TIMEOUT, response.json())
            .await
            .map_err(|_| AuthError::KeyFetch(format!("timed out after {}s", FETCH_TIMEOUT.as_secs())))?
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        log::info!("🔑 Loaded {} Firebase signing keys (ttl {}s)", keys.keys.len(), ttl.as_secs());

        let fetched_at = Instant::now();
        Ok(CachedKeys {
            keys,
            expires_at: Some(fetched_at + ttl),
            fetched_at,
        })
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<FirebaseClaims, AuthError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::UnsupportedToken(format!("alg {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::UnsupportedToken("missing kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;
        let claims = decode::<FirebaseClaims>(token, &key, &self.validation())?.claims;

        if claims.sub.is_empty() {
            return Err(AuthError::UnsupportedToken("empty sub".to_string()));
        }
        let now = chrono::Utc::now().timestamp();
        if let Some(auth_time) = claims.auth_time {
            if auth_time > now + LEEWAY_SECS as i64 {
                return Err(AuthError::UnsupportedToken("auth_time in the future".to_string()));
            }
        }

        Ok(claims)
    }
}

/// `public, max-age=19204, must-revalidate` → 19204s
fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Extrai o token de `Authorization: Bearer <token>`.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MalformedHeader)
}
