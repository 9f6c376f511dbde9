// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    middleware::i18n::Locale,
    models::tenancy::TenantId,
    services::CallerContext,
};

// Extratores para os handlers. O `tenant_guard` já validou tudo;
// aqui só lemos o que ele deixou nos extensions.

fn caller(parts: &Parts) -> Result<CallerContext, ApiError> {
    parts
        .extensions
        .get::<CallerContext>()
        .copied()
        .ok_or_else(|| AppError::InvalidToken.to_api_error(&Locale::from_headers(&parts.headers)))
}

// O tenant que o utilizador quer aceder.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub TenantId);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller(parts).map(|c| TenantContext(c.tenant))
    }
}

// O usuário autenticado (sub do token)
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller(parts).map(|c| AuthenticatedUser(c.user_id))
    }
}
