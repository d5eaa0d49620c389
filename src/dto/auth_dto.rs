use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::account::{Account, ApprovalFilter, ApprovalRequest, ApprovalStatus, Decision};
use crate::services::auth_service::{LoginOutcome, RegisterOutcome};
use crate::services::session::{IssuedSession, SessionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Message the client shows as a toast after an auth action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Screen the client should show next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Entry,
    AdminPanel,
    Catalog,
    AwaitingApproval,
    AccessDenied,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub user_id: String,
    pub email: String,
    pub status: ApprovalStatus,
    pub is_admin: bool,
}

impl From<Account> for AccountResponse {
    fn from(value: Account) -> Self {
        Self {
            user_id: value.user_id,
            email: value.email,
            status: value.status,
            is_admin: value.is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub account: AccountResponse,
    pub route: Route,
    pub notice: Notice,
}

impl From<RegisterOutcome> for RegisterResponse {
    fn from(value: RegisterOutcome) -> Self {
        Self {
            account: value.account.into(),
            route: value.route,
            notice: value.notice,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub account: AccountResponse,
    pub route: Route,
    pub session: Option<IssuedSession>,
    pub notice: Notice,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(value: LoginOutcome) -> Self {
        Self {
            account: value.account.into(),
            route: value.route,
            session: value.session,
            notice: value.notice,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub route: Route,
    pub notice: Notice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
    pub expires_at: DateTime<Utc>,
    pub route: Route,
}

impl From<SessionContext> for SessionResponse {
    fn from(value: SessionContext) -> Self {
        let route = if value.is_admin {
            Route::AdminPanel
        } else {
            Route::Catalog
        };
        Self {
            user_id: value.user_id,
            email: value.email,
            is_admin: value.is_admin,
            expires_at: value.expires_at,
            route,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApprovalListQuery {
    pub status: Option<ApprovalFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub outcome: Decision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalListResponse {
    pub items: Vec<ApprovalRequest>,
    pub total: usize,
}
