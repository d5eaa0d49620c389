//! Approval-gated authentication: registration, the pending-state gate,
//! administrator decisions and session handling.

use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::RejectedRoute;
use crate::dto::auth_dto::{Notice, NoticeLevel, Route};
use crate::error::{Error, Result};
use crate::gateway::{ApprovalStore, IdentityProvider};
use crate::models::account::{
    Account, ApprovalFilter, ApprovalRequest, ApprovalStatus, Decision, Identity,
};
use crate::services::session::{IssuedSession, SessionContext, SessionManager};

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub session_ttl: Duration,
    /// Lower-cased emails that skip the approval stage.
    pub admin_emails: Vec<String>,
    pub rejected_route: RejectedRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Administrator,
    Approved,
}

#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub account: Account,
    pub route: Route,
    pub notice: Notice,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: Account,
    pub route: Route,
    /// Only present for administrators and approved accounts.
    pub session: Option<IssuedSession>,
    pub notice: Notice,
}

type QueueCache = HashMap<ApprovalFilter, Vec<ApprovalRequest>>;

#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    approvals: Arc<dyn ApprovalStore>,
    sessions: SessionManager,
    settings: Arc<AuthSettings>,
    queue_cache: Arc<RwLock<QueueCache>>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        approvals: Arc<dyn ApprovalStore>,
        settings: AuthSettings,
    ) -> Self {
        let sessions = SessionManager::new(settings.jwt_secret.clone(), settings.session_ttl);
        Self {
            identity,
            approvals,
            sessions,
            settings: Arc::new(settings),
            queue_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn is_admin(&self, identity: &Identity) -> bool {
        identity.is_admin
            || self
                .settings
                .admin_emails
                .iter()
                .any(|e| *e == normalize_email(&identity.email))
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<RegisterOutcome> {
        let email = normalize_email(email);
        let admin_email = self.settings.admin_emails.contains(&email);

        if !admin_email && self.approvals.find_by_email(&email).await?.is_some() {
            tracing::info!(email = %email, "registration refused: duplicate email");
            return Err(Error::DuplicateAccount);
        }

        let identity = self.identity.sign_up(&email, password).await?;

        if self.is_admin(&identity) {
            tracing::info!(email = %identity.email, "administrator registered");
            return Ok(RegisterOutcome {
                account: Account::new(identity, ApprovalStatus::Approved),
                route: Route::AdminPanel,
                notice: Notice::new(NoticeLevel::Success, "Administrator account created."),
            });
        }

        // Orphaned identities (approval insert failed) are repaired on login.
        let request = self
            .approvals
            .create_pending(&identity.user_id, &identity.email)
            .await?;
        self.invalidate_queue().await;

        tracing::info!(email = %identity.email, request_id = %request.id, "registration pending approval");
        Ok(RegisterOutcome {
            account: Account::new(identity, request.status),
            route: Route::AwaitingApproval,
            notice: Notice::new(
                NoticeLevel::Success,
                "Registration received. An administrator must approve your account before you can sign in.",
            ),
        })
    }

    /// The approval gate. A non-approved account yields
    /// [`Error::ApprovalPending`], which `login` turns into a route.
    pub async fn check_access(&self, identity: &Identity) -> Result<Access> {
        if self.is_admin(identity) {
            return Ok(Access::Administrator);
        }

        let status = match self.approvals.find_by_user(&identity.user_id).await? {
            Some(request) => request.status,
            None => {
                tracing::warn!(user_id = %identity.user_id, "account without approval request; queuing it");
                match self
                    .approvals
                    .create_pending(&identity.user_id, &identity.email)
                    .await
                {
                    Ok(_) | Err(Error::DuplicateAccount) => {}
                    Err(e) => return Err(e),
                }
                self.invalidate_queue().await;
                ApprovalStatus::Pending
            }
        };

        match status {
            ApprovalStatus::Approved => Ok(Access::Approved),
            status => Err(Error::ApprovalPending { status }),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let email = normalize_email(email);
        let identity = match self.identity.sign_in(&email, password).await {
            Ok(identity) => identity,
            Err(Error::InvalidCredential) => {
                tracing::info!(email = %email, "login failed: invalid credential");
                return Err(Error::InvalidCredential);
            }
            Err(e) => return Err(e),
        };

        match self.check_access(&identity).await {
            Ok(access) => {
                let is_admin = access == Access::Administrator;
                let (session, _) = self.sessions.issue(&identity, is_admin)?;
                let route = if is_admin {
                    Route::AdminPanel
                } else {
                    Route::Catalog
                };
                tracing::info!(email = %identity.email, ?route, "login succeeded");
                Ok(LoginOutcome {
                    account: Account::new(identity, ApprovalStatus::Approved),
                    route,
                    session: Some(session),
                    notice: Notice::new(NoticeLevel::Success, "Signed in."),
                })
            }
            Err(Error::ApprovalPending { status }) => {
                let (route, notice) = self.gate_outcome(status);
                tracing::info!(email = %identity.email, %status, ?route, "login held at approval gate");
                Ok(LoginOutcome {
                    account: Account::new(identity, status),
                    route,
                    session: None,
                    notice,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn gate_outcome(&self, status: ApprovalStatus) -> (Route, Notice) {
        match (status, self.settings.rejected_route) {
            (ApprovalStatus::Rejected, RejectedRoute::AccessDenied) => (
                Route::AccessDenied,
                Notice::new(
                    NoticeLevel::Error,
                    "Your registration was not approved. Contact an administrator.",
                ),
            ),
            _ => (
                Route::AwaitingApproval,
                Notice::new(
                    NoticeLevel::Warning,
                    "Your account is awaiting administrator approval.",
                ),
            ),
        }
    }

    pub async fn decide(
        &self,
        request_id: Uuid,
        decision: Decision,
        admin: &SessionContext,
    ) -> Result<ApprovalRequest> {
        if !admin.is_admin {
            return Err(Error::Forbidden("administrator only".to_string()));
        }
        let request = self
            .approvals
            .decide(request_id, decision, &admin.email)
            .await?;
        self.invalidate_queue().await;
        tracing::info!(
            request_id = %request.id,
            email = %request.email,
            status = %request.status,
            admin = %admin.email,
            "approval decided"
        );
        Ok(request)
    }

    pub async fn pending_queue(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRequest>> {
        if let Some(cached) = self.queue_cache.read().await.get(&filter) {
            return Ok(cached.clone());
        }
        // Load under the write lock so a concurrent invalidation cannot be
        // overwritten by a snapshot taken before it.
        let mut guard = self.queue_cache.write().await;
        if let Some(cached) = guard.get(&filter) {
            return Ok(cached.clone());
        }
        let items = self.approvals.list(filter).await?;
        guard.insert(filter, items.clone());
        Ok(items)
    }

    async fn invalidate_queue(&self) {
        self.queue_cache.write().await.clear();
    }

    pub fn logout(&self, session: &SessionContext) -> bool {
        let ended = self.sessions.revoke(session.session_id);
        tracing::info!(email = %session.email, ended, "logout");
        ended
    }

    /// Verifies a bearer token and re-checks the approval status, so an
    /// account rejected after login loses access on its next request.
    pub async fn authorize(&self, token: &str) -> Result<SessionContext> {
        let context = self.sessions.verify(token)?;
        if context.is_admin {
            return Ok(context);
        }
        let status = self
            .approvals
            .find_by_user(&context.user_id)
            .await?
            .map(|r| r.status)
            .unwrap_or(ApprovalStatus::Pending);
        match status {
            ApprovalStatus::Approved => Ok(context),
            status => Err(Error::ApprovalPending { status }),
        }
    }
}
