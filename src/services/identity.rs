// src/services/identity.rs

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{auth::Claims, tenancy::TenantId},
};

/// Quem está chamando e em qual tenant. Só existe depois de `IdentityService::resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: Uuid,
    pub tenant: TenantId,
}

// Provedor de identidade: valida o JWT (HS256) e confere o acesso ao tenant pedido.
#[derive(Clone)]
pub struct IdentityService {
    jwt_secret: String,
}

impl IdentityService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Token rejeitado");
            AppError::InvalidToken
        })?;

        Ok(token_data.claims)
    }

    /// Token válido + tenant presente nas claims. Caso contrário: 401 ou 403.
    pub fn resolve(&self, token: &str, tenant: TenantId) -> Result<CallerContext, AppError> {
        let claims = self.validate_token(token)?;

        if !claims.tenants.contains(&tenant.into_inner()) {
            tracing::warn!(user_id = %claims.sub, tenant_id = %tenant, "Acesso negado ao tenant");
            return Err(AppError::TenantAccessDenied);
        }

        Ok(CallerContext {
            user_id: claims.sub,
            tenant,
        })
    }

    /// Emite um token (uso em desenvolvimento e testes; o login real é externo).
    pub fn issue_token(&self, user_id: Uuid, tenants: &[TenantId]) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(8);

        let claims = Claims {
            sub: user_id,
            tenants: tenants.iter().map(|t| t.into_inner()).collect(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Falha ao assinar token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_grants_only_listed_tenants() {
        let identity = IdentityService::new("segredo-de-teste".into());
        let user = Uuid::new_v4();
        let mine = TenantId::new(Uuid::new_v4());
        let other = TenantId::new(Uuid::new_v4());

        let token = identity.issue_token(user, &[mine]).unwrap();

        let caller = identity.resolve(&token, mine).unwrap();
        assert_eq!(caller.user_id, user);
        assert!(matches!(
            identity.resolve(&token, other),
            Err(AppError::TenantAccessDenied)
        ));
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let issuer = IdentityService::new("outro-segredo".into());
        let verifier = IdentityService::new("segredo-de-teste".into());
        let token = issuer.issue_token(Uuid::new_v4(), &[]).unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            verifier.validate_token("nao-e-um-jwt"),
            Err(AppError::InvalidToken)
        ));
    }
}
