use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::stone_dto::{
        CreateStonePayload, CreateStoneResponse, ImageUploadResponse, MaterialListResponse,
        MaterialResponse, StoneListQuery, StoneListResponse, StoneResponse, UpdateStonePayload,
    },
    error::{Error, Result},
    services::session::SessionContext,
    AppState,
};

/// Reads the `file` part of an upload form.
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>)> {
    while let Some(field) = multipart.next_field().await.map_err(Error::Multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await.map_err(Error::Multipart)?;
        return Ok((filename, data.to_vec()));
    }
    Err(Error::BadRequest("Missing 'file' field".into()))
}

#[utoipa::path(
    get,
    path = "/api/stones",
    params(
        ("page" = Option<usize>, Query, description = "1-indexed page"),
        ("category" = Option<String>, Query, description = "Exact category, or 'all'"),
        ("rock_type" = Option<String>, Query, description = "Exact rock type, or 'all'"),
        ("base_color" = Option<String>, Query, description = "Exact base color, or 'all'"),
        ("search" = Option<String>, Query, description = "Case-insensitive text in name or characteristics")
    ),
    responses(
        (status = 200, description = "Filtered page of the catalog", body = Json<StoneListResponse>),
        (status = 502, description = "Catalog could not be loaded")
    )
)]
#[axum::debug_handler]
pub async fn list_stones(
    State(state): State<AppState>,
    Query(query): Query<StoneListQuery>,
) -> Result<impl IntoResponse> {
    let catalog = &state.catalog_service;
    let page = catalog.browse(&query.state()).await?;
    let items = page
        .items
        .into_iter()
        .map(|record| {
            let url = catalog.image_url(&record.data.image);
            StoneResponse::new(record, url)
        })
        .collect();
    Ok(Json(StoneListResponse {
        items,
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
        filters: page.options,
    }))
}

#[utoipa::path(
    get,
    path = "/api/stones/filters",
    responses(
        (status = 200, description = "Distinct values for the catalog dropdowns")
    )
)]
#[axum::debug_handler]
pub async fn filter_options(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let options = state.catalog_service.filter_options().await?;
    Ok(Json(options))
}

#[utoipa::path(
    get,
    path = "/api/stones/{id}",
    params(
        ("id" = i64, Path, description = "Stone ID")
    ),
    responses(
        (status = 200, description = "Stone found", body = Json<StoneResponse>),
        (status = 404, description = "Stone not found")
    )
)]
#[axum::debug_handler]
pub async fn get_stone(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let record = state.catalog_service.get(id).await?;
    let url = state.catalog_service.image_url(&record.data.image);
    Ok(Json(StoneResponse::new(record, url)))
}

#[utoipa::path(
    post,
    path = "/api/stones",
    request_body = CreateStonePayload,
    responses(
        (status = 201, description = "Stone created", body = Json<CreateStoneResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 502, description = "Store rejected the write")
    )
)]
#[axum::debug_handler]
pub async fn create_stone(
    State(state): State<AppState>,
    Json(payload): Json<CreateStonePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let id = state.catalog_service.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(CreateStoneResponse { id })))
}

#[utoipa::path(
    patch,
    path = "/api/stones/{id}",
    params(
        ("id" = i64, Path, description = "Stone ID")
    ),
    request_body = UpdateStonePayload,
    responses(
        (status = 200, description = "Stone updated", body = Json<StoneResponse>),
        (status = 404, description = "Stone not found"),
        (status = 502, description = "Store rejected the write")
    )
)]
#[axum::debug_handler]
pub async fn update_stone(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStonePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let record = state
        .catalog_service
        .update(id, payload, &session.email)
        .await?;
    let url = state.catalog_service.image_url(&record.data.image);
    Ok(Json(StoneResponse::new(record, url)))
}

#[utoipa::path(
    delete,
    path = "/api/stones/{id}",
    params(
        ("id" = i64, Path, description = "Stone ID")
    ),
    responses(
        (status = 204, description = "Stone deleted"),
        (status = 404, description = "Stone not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_stone(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.catalog_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/stones/{id}/image",
    params(
        ("id" = i64, Path, description = "Stone ID")
    ),
    responses(
        (status = 200, description = "Image stored and record updated", body = Json<StoneResponse>),
        (status = 400, description = "Missing or invalid image"),
        (status = 502, description = "Upload or record update failed")
    )
)]
#[axum::debug_handler]
pub async fn upload_stone_image(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let (filename, data) = read_file_field(&mut multipart).await?;
    let (record, uploaded) = state
        .catalog_service
        .upload_stone_image(id, &filename, data, &session.email)
        .await?;
    Ok(Json(StoneResponse::new(record, uploaded.url)))
}

#[utoipa::path(
    get,
    path = "/api/materials",
    responses(
        (status = 200, description = "Materials", body = Json<MaterialListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_materials(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let catalog = &state.catalog_service;
    let items = catalog
        .materials()
        .await?
        .into_iter()
        .map(|m| {
            let url = catalog.image_url(m.image.as_deref().unwrap_or_default());
            MaterialResponse::new(m, url)
        })
        .collect();
    Ok(Json(MaterialListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/materials/{name}/images",
    params(
        ("name" = String, Path, description = "Material name")
    ),
    responses(
        (status = 201, description = "Image stored", body = Json<ImageUploadResponse>),
        (status = 404, description = "Material not found"),
        (status = 502, description = "Upload failed")
    )
)]
#[axum::debug_handler]
pub async fn upload_material_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let (filename, data) = read_file_field(&mut multipart).await?;
    let uploaded = state
        .catalog_service
        .upload_material_image(&name, &filename, data)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ImageUploadResponse {
            path: uploaded.path,
            url: uploaded.url,
        }),
    ))
}
