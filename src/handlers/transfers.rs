// src/handlers/transfers.rs

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::{json_body, query_params, stock::validate_positive},
    middleware::{
        i18n::Locale,
        tenancy::{AuthenticatedUser, TenantContext},
    },
    models::transfer::{TransferFilter, TransferPage, TransferRequest, TransferStatus},
    services::{transfer_query::resolve_page, CreateTransfer},
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferPayload {
    pub origin_branch_id: Uuid,
    pub destination_branch_id: Uuid,
    pub product_id: Uuid,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = 20)]
    pub quantity: Decimal,

    #[validate(length(max = 64, message = "Lote inválido."))]
    #[schema(example = "L1")]
    pub lot: Option<String>,

    #[validate(length(max = 1000, message = "Observação muito longa."))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveTransferPayload {
    // Ausente: recebe a quantidade solicitada
    #[validate(custom(function = "validate_positive"))]
    pub received_quantity: Option<Decimal>,

    #[validate(length(max = 1000, message = "Observação muito longa."))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelTransferPayload {
    #[validate(length(min = 1, max = 500, message = "O motivo é obrigatório."))]
    #[schema(example = "Pedido duplicado")]
    pub reason: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TransferListQuery {
    pub status: Option<TransferStatus>,
    /// Origem ou destino
    pub branch_id: Option<Uuid>,
    pub origin_branch_id: Option<Uuid>,
    pub destination_branch_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// ---
// Handlers
// ---
#[utoipa::path(
    post,
    path = "/api/transfers",
    tag = "Transfers",
    request_body = CreateTransferPayload,
    responses(
        (status = 201, description = "Transferência criada (solicitada ou aprovada)", body = TransferRequest),
        (status = 404, description = "Filial ou produto não encontrado"),
        (status = 409, description = "Configuração da filial não permite ou estoque insuficiente")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    payload: Result<Json<CreateTransferPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload, &locale)?;

    let transfer = app_state
        .transfer_service
        .create(
            tenant.0,
            user.0,
            CreateTransfer {
                origin_branch_id: payload.origin_branch_id,
                destination_branch_id: payload.destination_branch_id,
                product_id: payload.product_id,
                quantity: payload.quantity,
                lot: payload.lot,
                notes: payload.notes,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(transfer)))
}

#[utoipa::path(
    get,
    path = "/api/transfers",
    tag = "Transfers",
    responses(
        (status = 200, description = "Histórico paginado", body = TransferPage)
    ),
    params(
        TransferListQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_transfers(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    params: Result<Query<TransferListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query_params(params, &locale)?;
    let (page, per_page) =
        resolve_page(params.page, params.per_page).map_err(|e| e.to_api_error(&locale))?;

    let filter = TransferFilter {
        status: params.status,
        branch_id: params.branch_id,
        origin_branch_id: params.origin_branch_id,
        destination_branch_id: params.destination_branch_id,
        product_id: params.product_id,
        from: params.from,
        to: params.to,
        page,
        per_page,
    };

    let page = app_state
        .transfer_query
        .list(tenant.0, filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/transfers/{id}",
    tag = "Transfers",
    responses(
        (status = 200, description = "Transferência", body = TransferRequest),
        (status = 404, description = "Transferência não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transferência"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let transfer = app_state
        .transfer_query
        .get(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(transfer))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/approve",
    tag = "Transfers",
    responses(
        (status = 200, description = "Transferência aprovada", body = TransferRequest),
        (status = 409, description = "Já processada ou estoque insuficiente")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transferência"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let transfer = app_state
        .transfer_service
        .approve(tenant.0, id, user.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(transfer))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/ship",
    tag = "Transfers",
    responses(
        (status = 200, description = "Em trânsito; estoque baixado na origem", body = TransferRequest),
        (status = 409, description = "Transição inválida ou estoque insuficiente")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transferência"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn ship_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let transfer = app_state
        .transfer_service
        .start_transit(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(transfer))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/receive",
    tag = "Transfers",
    request_body(content = ReceiveTransferPayload, description = "Corpo opcional"),
    responses(
        (status = 200, description = "Concluída; estoque lançado no destino", body = TransferRequest),
        (status = 409, description = "Transição inválida")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transferência"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn receive_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // Corpo vazio: recebe tudo, sem observação
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        ReceiveTransferPayload::default()
    } else {
        serde_json::from_slice::<ReceiveTransferPayload>(&body).map_err(|_| {
            AppError::InvalidInput {
                field: "body",
                reason: "invalid_json",
            }
            .to_api_error(&locale)
        })?
    };
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let transfer = app_state
        .transfer_service
        .confirm_receipt(tenant.0, id, payload.received_quantity, payload.notes)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(transfer))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/cancel",
    tag = "Transfers",
    request_body = CancelTransferPayload,
    responses(
        (status = 200, description = "Transferência cancelada", body = TransferRequest),
        (status = 409, description = "Transição inválida (já enviada ou finalizada)")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transferência"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<CancelTransferPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload, &locale)?;

    let transfer = app_state
        .transfer_service
        .cancel(tenant.0, id, &payload.reason)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(transfer))
}
