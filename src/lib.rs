pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::{AuthMode, Config};
use crate::error::{Error, Result};
use crate::gateway::{
    approvals::PgApprovalStore,
    identity::{LocalIdentityProvider, ManagedIdentityProvider},
    stones::PgStoneGateway,
    storage::SupabaseStorage,
    IdentityProvider,
};
use crate::services::{
    auth_service::{AuthService, AuthSettings},
    catalog_service::{CatalogService, CatalogSettings},
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
}

impl AppState {
    /// Wires the production gateways from configuration.
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.gateway_timeout_secs);
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("http client: {}", e)))?;

        let identity: Arc<dyn IdentityProvider> = match config.auth_mode {
            AuthMode::Local => Arc::new(LocalIdentityProvider::new(pool.clone(), timeout)),
            AuthMode::Managed => Arc::new(ManagedIdentityProvider::new(
                http_client.clone(),
                &config.supabase_url,
                config.supabase_anon_key.clone().unwrap_or_default(),
                timeout,
            )),
        };
        let approvals = Arc::new(PgApprovalStore::new(pool.clone(), timeout));
        let stones = Arc::new(PgStoneGateway::new(pool, timeout));
        let storage = Arc::new(SupabaseStorage::new(
            http_client,
            &config.supabase_url,
            config.storage_bucket.clone(),
            config.supabase_service_key.clone(),
            timeout,
        )?);

        let auth_service = AuthService::new(
            identity,
            approvals,
            AuthSettings {
                jwt_secret: config.jwt_secret.clone(),
                session_ttl: chrono::Duration::minutes(config.session_ttl_minutes),
                admin_emails: config.admin_emails.clone(),
                rejected_route: config.rejected_route,
            },
        );
        let catalog_service = CatalogService::new(
            stones,
            storage,
            CatalogSettings {
                page_size: config.catalog_page_size,
                placeholder_image_url: config.placeholder_image_url.clone(),
                max_upload_bytes: config.max_upload_bytes,
            },
        );

        Ok(Self::from_services(auth_service, catalog_service))
    }

    pub fn from_services(auth_service: AuthService, catalog_service: CatalogService) -> Self {
        Self {
            auth_service,
            catalog_service,
        }
    }
}
