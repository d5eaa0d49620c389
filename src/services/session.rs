use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::account::Identity;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Option<String>,
    pub sid: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// The authenticated caller, handed to every guarded handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs session tokens and tracks which of them are still live, so a
/// logout takes effect before `exp`.
#[derive(Clone)]
pub struct SessionManager {
    secret: Arc<String>,
    ttl: Duration,
    live: Arc<Mutex<HashMap<Uuid, DateTime<Utc>>>>,
}

impl SessionManager {
    pub fn new(secret: String, ttl: Duration) -> Self {
        Self {
            secret: Arc::new(secret),
            ttl,
            live: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn issue(&self, identity: &Identity, is_admin: bool) -> Result<(IssuedSession, SessionContext)> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let sid = Uuid::new_v4();
        let claims = Claims {
            sub: identity.user_id.clone(),
            email: identity.email.clone(),
            role: Some(if is_admin { ROLE_ADMIN } else { ROLE_USER }.to_string()),
            sid,
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::Internal(format!("could not sign session token: {}", e)))?;

        {
            let mut live = self.live.lock().expect("session registry mutex poisoned");
            live.retain(|_, exp| *exp > now);
            live.insert(sid, expires_at);
        }

        let context = context_from_claims(&claims);
        Ok((IssuedSession { token, expires_at }, context))
    }

    pub fn verify(&self, token: &str) -> Result<SessionContext> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| Error::Unauthorized("invalid_token".to_string()))?;

        let live = self.live.lock().expect("session registry mutex poisoned");
        match live.get(&data.claims.sid) {
            Some(exp) if *exp > Utc::now() => Ok(context_from_claims(&data.claims)),
            _ => Err(Error::Unauthorized("session_ended".to_string())),
        }
    }

    /// Returns whether the session was still live.
    pub fn revoke(&self, session_id: Uuid) -> bool {
        self.live
            .lock()
            .expect("session registry mutex poisoned")
            .remove(&session_id)
            .is_some()
    }
}

fn context_from_claims(claims: &Claims) -> SessionContext {
    SessionContext {
        user_id: claims.sub.clone(),
        email: claims.email.clone(),
        is_admin: claims
            .role
            .as_deref()
            .map(|r| r.eq_ignore_ascii_case(ROLE_ADMIN))
            .unwrap_or(false),
        session_id: claims.sid,
        expires_at: Utc
            .timestamp_opt(claims.exp as i64, 0)
            .single()
            .unwrap_or_else(Utc::now),
    }
}
