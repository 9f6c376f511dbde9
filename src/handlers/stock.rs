// src/handlers/stock.rs

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::{json_body, query_params},
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::stock::{StockEntry, StockKey},
};

pub(crate) fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("A quantidade deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StockListQuery {
    pub branch_id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LotQuery {
    pub lot: Option<String>,
}

// ---
// Payload: entrada de estoque (primeira atribuição ou reposição)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignStockPayload {
    pub branch_id: Uuid,
    pub product_id: Uuid,

    #[validate(length(max = 64, message = "Lote inválido."))]
    #[schema(example = "L1")]
    pub lot: Option<String>,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = 100)]
    pub quantity: Decimal,

    pub expiration_date: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/stock",
    tag = "Stock",
    responses(
        (status = 200, description = "Saldos da filial", body = Vec<StockEntry>),
        (status = 404, description = "Filial não encontrada")
    ),
    params(
        StockListQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    params: Result<Query<StockListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query_params(params, &locale)?;

    let entries = app_state
        .stock_service
        .list(tenant.0, params.branch_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(entries))
}

/// Saldo de uma chave (filial, produto, lote). Ausência vira `null`, não erro.
#[utoipa::path(
    get,
    path = "/api/stock/{branch_id}/{product_id}",
    tag = "Stock",
    responses(
        (status = 200, description = "Saldo atual (ou null)", body = Option<StockEntry>)
    ),
    params(
        ("branch_id" = Uuid, Path, description = "ID da Filial"),
        ("product_id" = Uuid, Path, description = "ID do Produto"),
        LotQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path((branch_id, product_id)): Path<(Uuid, Uuid)>,
    params: Result<Query<LotQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query_params(params, &locale)?;
    let key = StockKey::new(branch_id, product_id, params.lot);

    let entry = app_state
        .stock_service
        .get(tenant.0, &key)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(entry))
}

#[utoipa::path(
    post,
    path = "/api/stock/entries",
    tag = "Stock",
    request_body = AssignStockPayload,
    responses(
        (status = 201, description = "Estoque lançado", body = StockEntry),
        (status = 404, description = "Filial ou produto não encontrado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    payload: Result<Json<AssignStockPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload, &locale)?;
    let key = StockKey::new(payload.branch_id, payload.product_id, payload.lot);

    let entry = app_state
        .stock_service
        .assign(tenant.0, &key, payload.quantity, payload.expiration_date)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(entry)))
}
