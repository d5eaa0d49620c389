use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::{is_unique_violation, with_timeout, ApprovalStore};
use crate::error::{Error, Result};
use crate::models::account::{ApprovalFilter, ApprovalRequest, ApprovalStatus, Decision};

const APPROVAL_COLUMNS: &str =
    "id, user_id, email, status, requested_at, decided_at, decided_by";

/// Side table holding the approval state of every registered user, keyed by
/// the identity provider's user id.
#[derive(Clone)]
pub struct PgApprovalStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgApprovalStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl ApprovalStore for PgApprovalStore {
    async fn create_pending(&self, user_id: &str, email: &str) -> Result<ApprovalRequest> {
        let sql = format!(
            r#"
            INSERT INTO approval_requests (id, user_id, email, status, requested_at)
            VALUES ($1, $2, lower($3), $4, NOW())
            RETURNING {}
            "#,
            APPROVAL_COLUMNS
        );
        with_timeout(self.timeout, Error::Write, async {
            sqlx::query_as::<_, ApprovalRequest>(&sql)
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(email)
                .bind(ApprovalStatus::Pending.as_str())
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
        .await
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<ApprovalRequest>> {
        let sql = format!(
            "SELECT {} FROM approval_requests WHERE user_id = $1",
            APPROVAL_COLUMNS
        );
        with_timeout(self.timeout, Error::Fetch, async {
            sqlx::query_as::<_, ApprovalRequest>(&sql)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Fetch(e.to_string()))
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<ApprovalRequest>> {
        let sql = format!(
            "SELECT {} FROM approval_requests WHERE email = lower($1)",
            APPROVAL_COLUMNS
        );
        with_timeout(self.timeout, Error::Fetch, async {
            sqlx::query_as::<_, ApprovalRequest>(&sql)
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Fetch(e.to_string()))
        })
        .await
    }

    async fn list(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRequest>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM approval_requests
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY requested_at DESC
            "#,
            APPROVAL_COLUMNS
        );
        with_timeout(self.timeout, Error::Fetch, async {
            sqlx::query_as::<_, ApprovalRequest>(&sql)
                .bind(filter.status().map(|s| s.as_str()))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::Fetch(e.to_string()))
        })
        .await
    }

    async fn decide(&self, id: Uuid, decision: Decision, admin: &str) -> Result<ApprovalRequest> {
        let sql = format!(
            r#"
            UPDATE approval_requests
            SET status = $2, decided_at = NOW(), decided_by = $3
            WHERE id = $1
            RETURNING {}
            "#,
            APPROVAL_COLUMNS
        );
        let status = ApprovalStatus::from(decision);
        let row = with_timeout(self.timeout, Error::Write, async {
            sqlx::query_as::<_, ApprovalRequest>(&sql)
                .bind(id)
                .bind(status.as_str())
                .bind(admin)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Write(e.to_string()))
        })
        .await?;
        row.ok_or_else(|| Error::NotFound(format!("Approval request {} not found", id)))
    }
}
