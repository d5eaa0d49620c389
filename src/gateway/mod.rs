//! Capability interfaces for the hosted database, identity service and
//! object store, plus their production implementations.
//!
//! Services only ever hold `Arc<dyn Trait>`; the concrete types live in
//! the submodules and are wired together in [`crate::AppState::new`].

pub mod approvals;
pub mod identity;
pub mod stones;
pub mod storage;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::account::{ApprovalFilter, ApprovalRequest, Decision, Identity};
use crate::models::change_log::ChangeLogEntry;
use crate::models::material::Material;
use crate::models::stone::{StoneData, StoneRecord};

#[async_trait]
pub trait StoneGateway: Send + Sync {
    async fn list_stones(&self) -> Result<Vec<StoneRecord>>;

    async fn get_stone(&self, id: i64) -> Result<Option<StoneRecord>>;

    async fn create_stone(&self, data: &StoneData) -> Result<i64>;

    async fn update_stone(&self, id: i64, data: &StoneData) -> Result<()>;

    async fn delete_stone(&self, id: i64) -> Result<()>;

    async fn list_materials(&self) -> Result<Vec<Material>>;

    async fn append_change_log(&self, entry: &ChangeLogEntry) -> Result<()>;
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Fails with [`Error::DuplicateAccount`] if the user or email already
    /// has a request.
    async fn create_pending(&self, user_id: &str, email: &str) -> Result<ApprovalRequest>;

    async fn find_by_user(&self, user_id: &str) -> Result<Option<ApprovalRequest>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<ApprovalRequest>>;

    async fn list(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRequest>>;

    async fn decide(&self, id: Uuid, decision: Decision, admin: &str) -> Result<ApprovalRequest>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates the credential. Fails with [`Error::DuplicateAccount`] when
    /// the email is taken.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity>;

    /// Fails with [`Error::InvalidCredential`] on unknown email or bad password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` at `path` and returns the object's public URL.
    async fn upload(&self, bytes: Vec<u8>, path: &str, content_type: &str) -> Result<String>;

    /// Public URL for an object path. Never touches the network.
    fn public_url(&self, path: &str) -> String;
}

/// Runs a gateway call under a deadline. `on_timeout` picks the error kind
/// the caller reports (fetch, write or upload).
pub async fn with_timeout<T, F>(
    limit: Duration,
    on_timeout: fn(String) -> Error,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(on_timeout(format!(
            "external service did not answer within {}s",
            limit.as_secs()
        ))),
    }
}

/// Postgres unique_violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
