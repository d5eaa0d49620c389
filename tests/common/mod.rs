#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use stone_catalog::config::RejectedRoute;
use stone_catalog::error::{Error, Result};
use stone_catalog::gateway::{ApprovalStore, IdentityProvider, ObjectStorage, StoneGateway};
use stone_catalog::models::account::{
    ApprovalFilter, ApprovalRequest, ApprovalStatus, Decision, Identity,
};
use stone_catalog::models::change_log::ChangeLogEntry;
use stone_catalog::models::material::Material;
use stone_catalog::models::stone::{StoneData, StoneRecord};
use stone_catalog::services::auth_service::{AuthService, AuthSettings};
use stone_catalog::services::catalog_service::{CatalogService, CatalogSettings};
use stone_catalog::utils::crypto::{hash_password_blocking, verify_password_blocking};
use stone_catalog::AppState;

pub const ADMIN_EMAIL: &str = "admin@stone.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PLACEHOLDER: &str = "/static/placeholder.png";

struct StoredIdentity {
    user_id: String,
    password_hash: String,
}

#[derive(Default)]
pub struct MemoryIdentity {
    users: Mutex<HashMap<String, StoredIdentity>>,
}

impl MemoryIdentity {
    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        if self.users.lock().unwrap().contains_key(email) {
            return Err(Error::DuplicateAccount);
        }
        let password_hash = hash_password_blocking(password).await?;
        let user_id = Uuid::new_v4().to_string();
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(Error::DuplicateAccount);
        }
        users.insert(
            email.to_string(),
            StoredIdentity {
                user_id: user_id.clone(),
                password_hash,
            },
        );
        Ok(Identity {
            user_id,
            email: email.to_string(),
            is_admin: false,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let stored = self
            .users
            .lock()
            .unwrap()
            .get(email)
            .map(|s| (s.user_id.clone(), s.password_hash.clone()));
        let hash = stored.as_ref().map(|(_, h)| h.as_str());
        if !verify_password_blocking(password, hash).await? {
            return Err(Error::InvalidCredential);
        }
        let (user_id, _) = stored.ok_or(Error::InvalidCredential)?;
        Ok(Identity {
            user_id,
            email: email.to_string(),
            is_admin: false,
        })
    }
}

#[derive(Default)]
pub struct MemoryApprovals {
    rows: Mutex<Vec<ApprovalRequest>>,
    pub list_calls: AtomicUsize,
}

impl MemoryApprovals {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn by_email(&self, email: &str) -> Option<ApprovalRequest> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.email == email)
            .cloned()
    }
}

#[async_trait]
impl ApprovalStore for MemoryApprovals {
    async fn create_pending(&self, user_id: &str, email: &str) -> Result<ApprovalRequest> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.user_id == user_id || r.email == email) {
            return Err(Error::DuplicateAccount);
        }
        let request = ApprovalRequest {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            email: email.to_lowercase(),
            status: ApprovalStatus::Pending,
            requested_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        };
        rows.push(request.clone());
        Ok(request)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<ApprovalRequest>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<ApprovalRequest>> {
        Ok(self.by_email(&email.to_lowercase()))
    }

    async fn list(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRequest>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut items: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.status().map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(items)
    }

    async fn decide(&self, id: Uuid, decision: Decision, admin: &str) -> Result<ApprovalRequest> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("Approval request {} not found", id)))?;
        row.status = decision.into();
        row.decided_at = Some(Utc::now());
        row.decided_by = Some(admin.to_string());
        Ok(row.clone())
    }
}

#[derive(Default)]
pub struct MemoryStones {
    rows: Mutex<BTreeMap<i64, StoneData>>,
    next_id: AtomicUsize,
    pub materials: Mutex<Vec<Material>>,
    pub change_log: Mutex<Vec<ChangeLogEntry>>,
    pub list_calls: AtomicUsize,
    pub fail_updates: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryStones {
    pub fn seeded(records: Vec<StoneData>) -> Self {
        let stones = Self::default();
        {
            let mut rows = stones.rows.lock().unwrap();
            for data in records {
                let id = stones.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
                rows.insert(id, data);
            }
        }
        stones
    }

    pub fn stored(&self, id: i64) -> Option<StoneData> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl StoneGateway for MemoryStones {
    async fn list_stones(&self) -> Result<Vec<StoneRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Fetch("connection reset".into()));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(id, data)| StoneRecord {
                id: *id,
                data: data.clone(),
            })
            .collect())
    }

    async fn get_stone(&self, id: i64) -> Result<Option<StoneRecord>> {
        Ok(self
            .stored(id)
            .map(|data| StoneRecord { id, data }))
    }

    async fn create_stone(&self, data: &StoneData) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        self.rows.lock().unwrap().insert(id, data.clone());
        Ok(id)
    }

    async fn update_stone(&self, id: i64, data: &StoneData) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::Write("permission denied for table stones".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Stone {} not found", id)))?;
        *row = data.clone();
        Ok(())
    }

    async fn delete_stone(&self, id: i64) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Stone {} not found", id)))
    }

    async fn list_materials(&self) -> Result<Vec<Material>> {
        Ok(self.materials.lock().unwrap().clone())
    }

    async fn append_change_log(&self, entry: &ChangeLogEntry) -> Result<()> {
        self.change_log.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<Vec<(String, usize, String)>>,
}

impl MemoryStorage {
    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _, _)| p.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, bytes: Vec<u8>, path: &str, content_type: &str) -> Result<String> {
        self.objects
            .lock()
            .unwrap()
            .push((path.to_string(), bytes.len(), content_type.to_string()));
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/public/stones/{}", path)
    }
}

pub fn auth_settings(rejected_route: RejectedRoute) -> AuthSettings {
    AuthSettings {
        jwt_secret: "test_secret_key".to_string(),
        session_ttl: chrono::Duration::minutes(30),
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        rejected_route,
    }
}

pub fn catalog_settings() -> CatalogSettings {
    CatalogSettings {
        page_size: 2,
        placeholder_image_url: PLACEHOLDER.to_string(),
        max_upload_bytes: 64 * 1024,
    }
}

pub fn sample_stones() -> Vec<StoneData> {
    let stone = |name: &str, category: &str, rock: &str, color: &str, chars: &str, image: &str| {
        StoneData {
            name: name.into(),
            category: category.into(),
            rock_type: rock.into(),
            finishes: "Polished".into(),
            availability: "In stock".into(),
            base_color: color.into(),
            characteristics: chars.into(),
            image: image.into(),
        }
    };
    vec![
        stone("Marble A", "Marble", "Metamorphic", "White", "fine veining", "marble_a.jpg"),
        stone("Granite B", "Granite", "Igneous", "Grey", "speckled", ""),
        stone("Calacatta Oro", "Marble", "Metamorphic", "White", "gold veins", ""),
        stone("Nero Assoluto", "Granite", "Igneous", "Black", "uniform", ""),
        stone("Travertino", "Limestone", "Sedimentary", "Beige", "porous", ""),
    ]
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub identity: Arc<MemoryIdentity>,
    pub approvals: Arc<MemoryApprovals>,
    pub stones: Arc<MemoryStones>,
    pub storage: Arc<MemoryStorage>,
}

pub async fn auth_only(rejected_route: RejectedRoute) -> (AuthService, Arc<MemoryIdentity>, Arc<MemoryApprovals>) {
    let identity = Arc::new(MemoryIdentity::default());
    let approvals = Arc::new(MemoryApprovals::default());
    identity
        .sign_up(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("seed admin");
    let service = AuthService::new(
        identity.clone(),
        approvals.clone(),
        auth_settings(rejected_route),
    );
    (service, identity, approvals)
}

pub async fn test_app() -> TestApp {
    let (auth_service, identity, approvals) = auth_only(RejectedRoute::AccessDenied).await;
    let stones = Arc::new(MemoryStones::seeded(sample_stones()));
    stones.materials.lock().unwrap().push(Material {
        id: 1,
        name: "Onice".into(),
        image: None,
    });
    let storage = Arc::new(MemoryStorage::default());
    let catalog_service = CatalogService::new(stones.clone(), storage.clone(), catalog_settings());
    let state = AppState::from_services(auth_service, catalog_service);
    let router = stone_catalog::routes::build_router(state.clone(), 1000);
    TestApp {
        router,
        state,
        identity,
        approvals,
        stones,
        storage,
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    into_parts(app.clone().oneshot(req).await.unwrap()).await
}

pub async fn send_file(
    app: &Router,
    uri: &str,
    token: &str,
    filename: &str,
    bytes: &[u8],
) -> (StatusCode, JsonValue) {
    let boundary = "stoneboundary7MA4YWxk";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = boundary,
            f = filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();
    into_parts(app.clone().oneshot(req).await.unwrap()).await
}

async fn into_parts(resp: axum::response::Response) -> (StatusCode, JsonValue) {
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, body)
}

/// Registers `email`, approves it as the seeded admin and returns a session token.
pub async fn approved_token(app: &TestApp, email: &str, password: &str) -> String {
    let admin = app
        .state
        .auth_service
        .login(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();
    let admin_ctx = app
        .state
        .auth_service
        .authorize(&admin.session.unwrap().token)
        .await
        .unwrap();
    app.state.auth_service.register(email, password).await.unwrap();
    let request = app.approvals.by_email(email).unwrap();
    app.state
        .auth_service
        .decide(request.id, Decision::Approved, &admin_ctx)
        .await
        .unwrap();
    app.state
        .auth_service
        .login(email, password)
        .await
        .unwrap()
        .session
        .unwrap()
        .token
}

pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
