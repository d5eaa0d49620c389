use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

use super::{is_unique_violation, with_timeout, IdentityProvider};
use crate::error::{Error, Result};
use crate::models::account::Identity;
use crate::utils::crypto::{hash_password_blocking, verify_password_blocking};

/// Credentials kept in the service's own `accounts` table as argon2 hashes.
#[derive(Clone)]
pub struct LocalIdentityProvider {
    pool: PgPool,
    timeout: Duration,
}

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    is_admin: bool,
}

impl LocalIdentityProvider {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let password_hash = hash_password_blocking(password).await?;
        let row = with_timeout(self.timeout, Error::Write, async {
            sqlx::query_as::<_, (Uuid, String, bool)>(
                r#"
                INSERT INTO accounts (id, email, password_hash, is_admin)
                VALUES ($1, lower($2), $3, FALSE)
                RETURNING id, email, is_admin
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(&password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::DuplicateAccount
                } else {
                    Error::Write(e.to_string())
                }
            })
        })
        .await?;

        Ok(Identity {
            user_id: row.0.to_string(),
            email: row.1,
            is_admin: row.2,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let row = with_timeout(self.timeout, Error::Fetch, async {
            sqlx::query_as::<_, AccountRow>(
                "SELECT id, email, password_hash, is_admin FROM accounts WHERE email = lower($1)",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))
        })
        .await?;

        let stored_hash = row.as_ref().map(|r| r.password_hash.as_str());
        let verified = verify_password_blocking(password, stored_hash).await?;
        let Some(row) = row.filter(|_| verified) else {
            return Err(Error::InvalidCredential);
        };
        Ok(Identity {
            user_id: row.id.to_string(),
            email: row.email,
            is_admin: row.is_admin,
        })
    }
}

/// Hosted identity service (Supabase GoTrue REST API). Credential storage
/// and hashing happen on the provider side.
#[derive(Clone)]
pub struct ManagedIdentityProvider {
    client: Client,
    base_url: String,
    anon_key: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    app_metadata: JsonValue,
    identities: Option<Vec<JsonValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    WithSession { user: AuthUser },
    UserOnly(AuthUser),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user: AuthUser,
}

impl AuthUser {
    fn into_identity(self, fallback_email: &str) -> Identity {
        let is_admin = self
            .app_metadata
            .get("role")
            .and_then(|r| r.as_str())
            .map(|r| r.eq_ignore_ascii_case("admin"))
            .unwrap_or(false);
        Identity {
            user_id: self.id,
            email: self
                .email
                .unwrap_or_else(|| fallback_email.to_string())
                .to_lowercase(),
            is_admin,
        }
    }
}

impl ManagedIdentityProvider {
    pub fn new(client: Client, base_url: &str, anon_key: String, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            timeout,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}

fn mentions_existing_user(body: &str) -> bool {
    let lowered = body.to_lowercase();
    lowered.contains("already registered") || lowered.contains("user_already_exists")
}

#[async_trait]
impl IdentityProvider for ManagedIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let response = with_timeout(self.timeout, Error::Write, async {
            self.client
                .post(self.endpoint("signup"))
                .header("apikey", &self.anon_key)
                .bearer_auth(&self.anon_key)
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await
                .map_err(|e| Error::Write(format!("identity service unreachable: {}", e)))
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if mentions_existing_user(&body) {
                return Err(Error::DuplicateAccount);
            }
            tracing::warn!(%status, body = %body, "identity sign-up rejected");
            return Err(Error::Write(format!("identity service returned {}", status)));
        }

        let user = match response.json::<SignUpResponse>().await? {
            SignUpResponse::WithSession { user } => user,
            SignUpResponse::UserOnly(user) => user,
        };
        // With email confirmation on, a repeated sign-up answers 200 with an
        // obfuscated user that has no identities.
        if matches!(&user.identities, Some(ids) if ids.is_empty()) {
            return Err(Error::DuplicateAccount);
        }
        Ok(user.into_identity(email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let response = with_timeout(self.timeout, Error::Fetch, async {
            self.client
                .post(self.endpoint("token?grant_type=password"))
                .header("apikey", &self.anon_key)
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await
                .map_err(|e| Error::Fetch(format!("identity service unreachable: {}", e)))
        })
        .await?;

        match response.status() {
            s if s.is_success() => {
                let token = response.json::<TokenResponse>().await?;
                Ok(token.user.into_identity(email))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(Error::InvalidCredential),
            other => Err(Error::Fetch(format!("identity service returned {}", other))),
        }
    }
}
