//! Managed identity provider backed by the Supabase Auth (GoTrue) REST API.

use crate::error::{AuthError, AuthResult};
use crate::provider::{AuthChange, AuthProvider, ProviderSession};
use crate::session::SessionProvider;
use async_trait::async_trait;
use prodos_storage::{PersistentStore, StorageKeys};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::broadcast;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Token grant response from `POST /auth/v1/token`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: ProviderUser,
}

/// User payload from GoTrue responses.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    email: Option<String>,
}

/// Provider-internal token cache, persisted under its own storage key so an
/// existing remote session survives client restarts. Not part of the
/// session/rate-limit schema.
#[derive(Debug, Serialize, Deserialize)]
struct TokenCache {
    access_token: String,
    refresh_token: String,
    user_id: String,
    email: Option<String>,
    /// Access token expiry as epoch milliseconds.
    expires_at: i64,
}

/// Client for the hosted identity service.
pub struct ManagedProvider {
    http_client: reqwest::Client,
    api_url: String,
    publishable_key: String,
    store: Arc<dyn PersistentStore>,
    changes: broadcast::Sender<AuthChange>,
}

impl ManagedProvider {
    /// Create a new managed provider.
    ///
    /// # Arguments
    /// * `api_url` - The Supabase project API URL (e.g., `https://xyz.supabase.co`)
    /// * `publishable_key` - The project's publishable API key
    /// * `store` - Profile store used for the provider's private token cache
    pub fn new(
        api_url: impl Into<String>,
        publishable_key: impl Into<String>,
        store: Arc<dyn PersistentStore>,
    ) -> Self {
        let (changes, _) = broadcast::channel(8);
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.into(),
            publishable_key: publishable_key.into(),
            store,
            changes,
        }
    }

    /// Build the auth API URL for an endpoint.
    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, endpoint)
    }

    /// Map a credential rejection body to a user-facing message.
    ///
    /// GoTrue reports rejections as `error_description`, `msg`, or `error`
    /// depending on the endpoint and version.
    fn rejection_message(body: &str) -> String {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            for key in ["error_description", "msg", "error"] {
                if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                    return message.to_string();
                }
            }
        }
        "Invalid login credentials".to_string()
    }

    /// Translate a non-success token response into the error taxonomy.
    fn map_rejection(status: reqwest::StatusCode, body: &str) -> AuthError {
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            AuthError::Credentials {
                message: Self::rejection_message(body),
                remaining_attempts: 0,
            }
        } else {
            AuthError::Provider(format!(
                "Sign-in request failed: {} ({})",
                status,
                summarize_response_body(body)
            ))
        }
    }

    fn read_token_cache(&self) -> Option<TokenCache> {
        let raw = self.store.get(StorageKeys::PROVIDER_TOKENS)?;
        match serde_json::from_str(&raw) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable provider token cache, discarding");
                self.store.delete(StorageKeys::PROVIDER_TOKENS);
                None
            }
        }
    }

    fn write_token_cache(&self, cache: &TokenCache) {
        match serde_json::to_string(cache) {
            Ok(raw) => self.store.set(StorageKeys::PROVIDER_TOKENS, &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to encode provider token cache"),
        }
    }

    fn clear_token_cache(&self) {
        self.store.delete(StorageKeys::PROVIDER_TOKENS);
    }
}

#[async_trait]
impl AuthProvider for ManagedProvider {
    fn kind(&self) -> SessionProvider {
        SessionProvider::Managed
    }

    async fn sign_in(&self, identifier: &str, secret: &str) -> AuthResult<ProviderSession> {
        let url = format!("{}?grant_type=password", self.auth_url("token"));

        tracing::debug!("Requesting password grant from identity service");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&serde_json::json!({
                "email": identifier,
                "password": secret,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Sign-in request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                body_summary = %summarize_response_body(&body),
                "Identity service rejected sign-in"
            );
            return Err(Self::map_rejection(status, &body));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("Malformed token response: {e}")))?;

        let identity = tokens.user.email.clone().unwrap_or_else(|| tokens.user.id.clone());
        let session = ProviderSession {
            principal_id: tokens.user.id.clone(),
            identity,
        };

        self.write_token_cache(&TokenCache {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user_id: tokens.user.id,
            email: tokens.user.email,
            expires_at: chrono::Utc::now().timestamp_millis() + tokens.expires_in * 1000,
        });

        tracing::info!(principal = %session.principal_id, "Managed sign-in succeeded");
        let _ = self.changes.send(AuthChange::SignedIn(session.clone()));

        Ok(session)
    }

    async fn current_session(&self) -> AuthResult<Option<ProviderSession>> {
        let cache = match self.read_token_cache() {
            Some(cache) => cache,
            None => return Ok(None),
        };

        tracing::debug!("Checking identity service for an existing session");

        let response = self
            .http_client
            .get(self.auth_url("user"))
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", cache.access_token))
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Session check failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            tracing::info!("Cached provider tokens are no longer valid, discarding");
            self.clear_token_cache();
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "Session check failed: {} ({})",
                status,
                summarize_response_body(&body)
            )));
        }

        let user: ProviderUser = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("Malformed user response: {e}")))?;

        Ok(Some(ProviderSession {
            identity: user.email.unwrap_or_else(|| user.id.clone()),
            principal_id: user.id,
        }))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(cache) = self.read_token_cache() {
            let result = self
                .http_client
                .post(self.auth_url("logout"))
                .header("apikey", &self.publishable_key)
                .header("Authorization", format!("Bearer {}", cache.access_token))
                .send()
                .await;

            // Remote sign-out is best-effort; local state is cleared regardless.
            match result {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(status = %response.status(), "Remote sign-out rejected");
                }
                Err(e) => tracing::warn!(error = %e, "Remote sign-out failed"),
                Ok(_) => {}
            }
        }

        self.clear_token_cache();
        let _ = self.changes.send(AuthChange::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodos_storage::MemoryStore;

    fn provider() -> ManagedProvider {
        ManagedProvider::new(
            "https://test.supabase.co",
            "test-key",
            Arc::new(MemoryStore::new()),
        )
    }

    #[test]
    fn test_auth_url() {
        let provider = provider();
        assert_eq!(
            provider.auth_url("token"),
            "https://test.supabase.co/auth/v1/token"
        );
        assert_eq!(
            provider.auth_url("logout"),
            "https://test.supabase.co/auth/v1/logout"
        );
    }

    #[test]
    fn test_rejection_message_variants() {
        assert_eq!(
            ManagedProvider::rejection_message(
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            ),
            "Invalid login credentials"
        );
        assert_eq!(
            ManagedProvider::rejection_message(r#"{"msg":"Email not confirmed"}"#),
            "Email not confirmed"
        );
        assert_eq!(
            ManagedProvider::rejection_message("not json"),
            "Invalid login credentials"
        );
    }

    #[test]
    fn test_map_rejection_taxonomy() {
        let credential = ManagedProvider::map_rejection(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error_description":"Invalid login credentials"}"#,
        );
        assert!(matches!(credential, AuthError::Credentials { .. }));

        let outage =
            ManagedProvider::map_rejection(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(outage, AuthError::Provider(_)));

        // Provider-side throttling is a service condition, not a credential one.
        let throttled =
            ManagedProvider::map_rejection(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(throttled, AuthError::Provider(_)));
    }

    #[test]
    fn test_token_cache_roundtrip() {
        let provider = provider();
        assert!(provider.read_token_cache().is_none());

        provider.write_token_cache(&TokenCache {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            user_id: "user-1".to_string(),
            email: Some("a@x.com".to_string()),
            expires_at: 42,
        });

        let cache = provider.read_token_cache().unwrap();
        assert_eq!(cache.access_token, "at");
        assert_eq!(cache.user_id, "user-1");

        provider.clear_token_cache();
        assert!(provider.read_token_cache().is_none());
    }

    #[test]
    fn test_corrupt_token_cache_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        store.set(StorageKeys::PROVIDER_TOKENS, "{nope");
        let provider = ManagedProvider::new("https://test.supabase.co", "k", store.clone());

        assert!(provider.read_token_cache().is_none());
        assert!(store.get(StorageKeys::PROVIDER_TOKENS).is_none());
    }
}
