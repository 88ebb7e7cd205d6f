use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::config::AppConfig;

/// Name of the cookie carrying the platform access token.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Claims
///
/// Payload of the access tokens issued by the auth platform. Tokens are HS256-signed
/// with the project's JWT secret and carry the `authenticated` audience.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the auth user id, equal to `profiles.id`.
    pub sub: Uuid,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
    #[serde(default)]
    pub email: Option<String>,
}

/// AuthIdentity
///
/// An authenticated platform user, before any profile or role lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub id: Uuid,
    #[serde(default)]
    pub email: String,
}

/// AuthSession
///
/// Result of a successful password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    pub user: AuthIdentity,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Session is invalid or expired")]
    InvalidToken,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Authentication service error: {0}")]
    Provider(String),

    #[error("Authentication service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// AuthProvider Trait
///
/// The hosted auth platform: password sign-in, token resolution, sign-out and
/// server-side user creation. Held as `Arc<dyn AuthProvider>` so tests can swap in
/// `MockAuthProvider`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Resolves an access token to its user. Expired or forged tokens are `InvalidToken`.
    async fn current_user(&self, access_token: &str) -> Result<AuthIdentity, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn create_user(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;
}

pub type AuthState = Arc<dyn AuthProvider>;

/// access_token
///
/// Reads the access token from the session cookie, falling back to an
/// `Authorization: Bearer` header for API clients.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

// --- Supabase implementation ---

/// SupabaseAuthClient
///
/// Talks to the platform's GoTrue REST API. Token resolution is done locally by
/// verifying the JWT signature, expiry and audience, so the gate needs no network call.
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
    decoding_key: DecodingKey,
    validation: Validation,
}

#[derive(Deserialize)]
struct ProviderError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ProviderError {
    fn into_message(self) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| "unexpected response".to_string())
    }
}

impl SupabaseAuthClient {
    pub fn new(config: &AppConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&["authenticated"]);

        Self {
            http: reqwest::Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            service_role_key: config.supabase_service_role_key.clone(),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn provider_error(response: reqwest::Response) -> AuthError {
        let status = response.status();
        let message = match response.json::<ProviderError>().await {
            Ok(body) => body.into_message(),
            Err(_) => status.to_string(),
        };
        AuthError::Provider(message)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .http
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<AuthSession>().await?),
            // GoTrue answers 400 `invalid_grant` for a wrong password or unknown email.
            reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNAUTHORIZED => {
                Err(AuthError::InvalidCredentials)
            }
            _ => Err(Self::provider_error(response).await),
        }
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthIdentity, AuthError> {
        let data = decode::<Claims>(access_token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "access token rejected");
                AuthError::InvalidToken
            })?;

        Ok(AuthIdentity {
            id: data.claims.sub,
            email: data.claims.email.unwrap_or_default(),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // An already-expired session is as good as signed out.
        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(Self::provider_error(response).await)
        }
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let service_key = self
            .service_role_key
            .as_deref()
            .ok_or(AuthError::NotConfigured("SUPABASE_SERVICE_ROLE_KEY"))?;

        let response = self
            .http
            .post(self.endpoint("admin/users"))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json::<AuthIdentity>().await?)
        } else {
            Err(Self::provider_error(response).await)
        }
    }
}

// --- Mock implementation (tests and local demos) ---

/// MockAuthProvider
///
/// In-memory stand-in for the auth platform. Tokens are opaque strings handed out by
/// `sign_in` or `issue_token`; `set_unavailable(true)` makes every call fail as if the
/// platform were down.
#[derive(Default)]
pub struct MockAuthProvider {
    users: RwLock<HashMap<String, (String, Uuid)>>,
    tokens: RwLock<HashMap<String, AuthIdentity>>,
    unavailable: AtomicBool,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user that can sign in with `password`.
    pub fn add_user(&self, id: Uuid, email: &str, password: &str) {
        self.users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(email.to_lowercase(), (password.to_string(), id));
    }

    /// Hands out a valid token for `id` without a password round-trip.
    pub fn issue_token(&self, id: Uuid, email: &str) -> String {
        let token = format!("mock-token-{}", Uuid::new_v4());
        self.tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                token.clone(),
                AuthIdentity {
                    id,
                    email: email.to_string(),
                },
            );
        token
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn is_token_active(&self, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(token)
    }

    fn guard(&self) -> Result<(), AuthError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::Provider("service unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.guard()?;
        let email = email.to_lowercase();
        let id = {
            let users = self.users.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            match users.get(&email) {
                Some((expected, id)) if expected == password => *id,
                _ => return Err(AuthError::InvalidCredentials),
            }
        };

        Ok(AuthSession {
            access_token: self.issue_token(id, &email),
            expires_in: default_expires_in(),
            user: AuthIdentity { id, email },
        })
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthIdentity, AuthError> {
        self.guard()?;
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(access_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.guard()?;
        self.tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(access_token);
        Ok(())
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        self.guard()?;
        let email = email.to_lowercase();
        let mut users = self.users.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if users.contains_key(&email) {
            return Err(AuthError::Provider(
                "A user with this email address has already been registered".to_string(),
            ));
        }
        let id = Uuid::new_v4();
        users.insert(email.clone(), (password.to_string(), id));
        Ok(AuthIdentity { id, email })
    }
}
