// src/handlers/branches.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::json_body,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::branch::{Branch, BranchChanges, BranchConfig, BranchConfigPatch, BranchStatus, BranchType},
    services::CreateBranch,
};

// ---
// Payload: CreateBranch
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchPayload {
    #[validate(length(min = 1, max = 255, message = "O nome é obrigatório."))]
    #[schema(example = "Farmácia Centro")]
    pub name: String,

    // Aceita com ou sem máscara: "11.222.333/0001-81"
    #[validate(length(min = 14, max = 18, message = "CNPJ com tamanho inválido."))]
    #[schema(example = "11.222.333/0001-81")]
    pub cnpj: String,

    #[serde(rename = "type")]
    pub branch_type: BranchType,

    pub status: Option<BranchStatus>,

    // Chaves desconhecidas são rejeitadas; as ausentes assumem o padrão
    pub config: Option<BranchConfig>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBranchPayload {
    #[validate(length(min = 1, max = 255, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,

    #[validate(length(min = 14, max = 18, message = "CNPJ com tamanho inválido."))]
    pub cnpj: Option<String>,

    #[serde(rename = "type")]
    pub branch_type: Option<BranchType>,

    pub status: Option<BranchStatus>,

    // Parcial: chaves ausentes mantêm o valor atual
    pub config: Option<BranchConfigPatch>,
}

#[utoipa::path(
    post,
    path = "/api/branches",
    tag = "Branches",
    request_body = CreateBranchPayload,
    responses(
        (status = 201, description = "Filial criada", body = Branch),
        (status = 400, description = "CNPJ ou campos inválidos"),
        (status = 409, description = "CNPJ duplicado ou segunda matriz no tenant")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    payload: Result<Json<CreateBranchPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload, &locale)?;

    let branch = app_state
        .branch_service
        .create(
            tenant.0,
            CreateBranch {
                name: payload.name,
                cnpj: payload.cnpj,
                branch_type: payload.branch_type,
                status: payload.status,
                config: payload.config,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(branch)))
}

#[utoipa::path(
    get,
    path = "/api/branches",
    tag = "Branches",
    responses(
        (status = 200, description = "Filiais do tenant", body = Vec<Branch>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_branches(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let branches = app_state
        .branch_service
        .list(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(branches))
}

#[utoipa::path(
    get,
    path = "/api/branches/{id}",
    tag = "Branches",
    responses(
        (status = 200, description = "Filial", body = Branch),
        (status = 404, description = "Filial não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Filial"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let branch = app_state
        .branch_service
        .get(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(branch))
}

#[utoipa::path(
    put,
    path = "/api/branches/{id}",
    tag = "Branches",
    request_body = UpdateBranchPayload,
    responses(
        (status = 200, description = "Filial atualizada", body = Branch),
        (status = 404, description = "Filial não encontrada"),
        (status = 409, description = "CNPJ duplicado ou segunda matriz no tenant")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Filial"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateBranchPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload, &locale)?;

    let changes = BranchChanges {
        name: payload.name,
        cnpj: payload.cnpj,
        branch_type: payload.branch_type,
        status: payload.status,
        config: payload.config,
    };

    let branch = app_state
        .branch_service
        .update(tenant.0, id, changes)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(branch))
}

#[utoipa::path(
    delete,
    path = "/api/branches/{id}",
    tag = "Branches",
    responses(
        (status = 204, description = "Filial removida"),
        (status = 404, description = "Filial não encontrada"),
        (status = 412, description = "Filial com estoque ou transferências em andamento")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Filial"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .branch_service
        .delete(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
