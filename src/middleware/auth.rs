// src/middleware/auth.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::tenancy::TenantId,
};

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

fn tenant_from_header(request: &Request) -> Result<TenantId, AppError> {
    request
        .headers()
        .get(TENANT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .map(TenantId::new)
        .ok_or(AppError::InvalidTenantHeader)
}

/// Autenticação + tenant: Bearer válido (401), X-Tenant-ID legível (400) e
/// pertencente ao usuário (403). Em caso de sucesso, o `CallerContext` vai para os extensions.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers());

    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken)
        .map_err(|e| e.to_api_error(&locale))?;

    let caller = tenant_from_header(&request)
        .and_then(|tenant| app_state.identity.resolve(bearer.token(), tenant))
        .map_err(|e| e.to_api_error(&locale))?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
