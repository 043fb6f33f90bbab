//! Identity and admin authorization.
//!
//! Identity is a capability: requests carry a bearer session token issued at
//! login, and resolving it yields a stable user email or fails. Admin rights
//! come from configuration, never from identities baked into the code.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use rand::Rng;
use tokio::sync::RwLock;

use crate::error::GameError;
use crate::state::AppState;
use crate::types::UserEmail;

/// Safe character set for session tokens (excludes 0/O, 1/I/L to avoid confusion)
const TOKEN_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const TOKEN_LENGTH: usize = 24;

fn generate_session_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_CHARS[rng.random_range(0..TOKEN_CHARS.len())] as char)
        .collect()
}

/// Authorization configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Emails allowed to administer rounds, lowercased.
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    /// Load admin emails from the ADMIN_EMAILS environment variable
    /// (comma-separated, case-insensitive).
    pub fn from_env() -> Self {
        let admin_emails: Vec<String> = std::env::var("ADMIN_EMAILS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if admin_emails.is_empty() {
            tracing::warn!(
                "No ADMIN_EMAILS configured - round administration is DISABLED for everyone!"
            );
        } else {
            tracing::info!("Round administration enabled for {} admin(s)", admin_emails.len());
        }

        Self { admin_emails }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.admin_emails.iter().any(|a| *a == email)
    }
}

/// Issued session tokens mapped to the email they authenticate.
#[derive(Clone, Default)]
pub struct SessionStore {
    tokens: Arc<RwLock<HashMap<String, UserEmail>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for an email. Collisions are retried (vanishingly
    /// rare at 24 characters).
    pub async fn issue(&self, email: &str) -> String {
        let mut tokens = self.tokens.write().await;
        let token = loop {
            let candidate = generate_session_token();
            if !tokens.contains_key(&candidate) {
                break candidate;
            }
        };
        tokens.insert(token.clone(), email.to_lowercase());
        token
    }

    pub async fn resolve(&self, token: &str) -> Option<UserEmail> {
        self.tokens.read().await.get(token).cloned()
    }
}

/// Extractor for the authenticated user's email.
pub struct CurrentUser(pub UserEmail);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = GameError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(GameError::Unauthorized)?;

        match state.sessions.resolve(token).await {
            Some(email) => Ok(CurrentUser(email)),
            None => Err(GameError::Unauthorized),
        }
    }
}

/// Extractor for an authenticated admin.
pub struct AdminUser(pub UserEmail);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = GameError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(email) = CurrentUser::from_request_parts(parts, state).await?;
        if !state.auth.is_admin(&email) {
            return Err(GameError::Unauthorized);
        }
        Ok(AdminUser(email))
    }
}
