use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{middleware::i18n::Locale, models::transfer::TransferStatus};

// Entidades que podem "não existir" para o chamador.
// Uma entidade de outro tenant cai exatamente no mesmo caso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Branch,
    Product,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    DuplicateCnpj,
    DuplicateMatriz,
    AlreadyProcessed,
    InvalidTransition {
        from: TransferStatus,
        to: TransferStatus,
    },
    OutgoingNotAllowed,
    IncomingNotAllowed,
    BranchNotActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    BranchHasStock,
    BranchHasActiveTransfers,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validação de regra de negócio que não passa pelo `validator` (campo + motivo)
    #[error("Campo inválido: {field} ({reason})")]
    InvalidInput {
        field: &'static str,
        reason: &'static str,
    },

    #[error("Recurso não encontrado: {0:?}")]
    NotFound(Entity),

    #[error("Conflito: {0:?}")]
    Conflict(ConflictKind),

    #[error("Estoque insuficiente: solicitado {requested}, disponível {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Pré-condição falhou: {0:?}")]
    PreconditionFailed(Precondition),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Cabeçalho X-Tenant-ID ausente ou inválido")]
    InvalidTenantHeader,

    #[error("Acesso negado ao tenant")]
    TenantAccessDenied,

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

// O envelope de erro que vai para o cliente: {error, message, details?}
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "message": self.message,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidTenantHeader => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
            AppError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::TenantAccessDenied => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Código estável do envelope (campo `error`).
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput { .. } => "ValidationError",
            AppError::InvalidTenantHeader => "ValidationError",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(ConflictKind::AlreadyProcessed) => "AlreadyProcessed",
            AppError::Conflict(_) => "Conflict",
            AppError::InsufficientStock { .. } => "InsufficientStock",
            AppError::PreconditionFailed(_) => "PreconditionFailed",
            AppError::InvalidToken => "Unauthorized",
            AppError::TenantAccessDenied => "Forbidden",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "InternalError",
        }
    }

    /// Converte para o envelope HTTP, traduzindo a mensagem para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let en = locale.is_english();

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::InvalidInput { field, reason } => {
                let mut details = serde_json::Map::new();
                details.insert(field.to_string(), json!([reason]));
                Some(Value::Object(details))
            }
            AppError::InsufficientStock {
                requested,
                available,
            } => Some(json!({ "requested": requested, "available": available })),
            AppError::Conflict(ConflictKind::InvalidTransition { from, to }) => {
                Some(json!({ "from": from, "to": to }))
            }
            _ => None,
        };

        // O `tracing` loga a mensagem detalhada; o cliente só vê a genérica.
        if let AppError::DatabaseError(_) | AppError::InternalServerError(_) = self {
            tracing::error!(error = %self, "Erro Interno do Servidor");
        }

        ApiError {
            status: self.status(),
            error: self.code(),
            message: self.message(en).to_string(),
            details,
        }
    }

    fn message(&self, en: bool) -> &'static str {
        let (pt, english) = match self {
            AppError::ValidationError(_) => (
                "Um ou mais campos são inválidos.",
                "One or more fields are invalid.",
            ),
            AppError::InvalidInput { .. } => (
                "Um ou mais campos são inválidos.",
                "One or more fields are invalid.",
            ),
            AppError::NotFound(Entity::Branch) => ("Filial não encontrada.", "Branch not found."),
            AppError::NotFound(Entity::Product) => ("Produto não encontrado.", "Product not found."),
            AppError::NotFound(Entity::Transfer) => {
                ("Transferência não encontrada.", "Transfer not found.")
            }
            AppError::Conflict(kind) => match kind {
                ConflictKind::DuplicateCnpj => (
                    "Já existe uma filial com este CNPJ.",
                    "A branch with this CNPJ already exists.",
                ),
                ConflictKind::DuplicateMatriz => (
                    "Este tenant já possui uma matriz.",
                    "This tenant already has a head branch.",
                ),
                ConflictKind::AlreadyProcessed => (
                    "Esta transferência já foi processada.",
                    "This transfer has already been processed.",
                ),
                ConflictKind::InvalidTransition { .. } => (
                    "Transição de status não permitida.",
                    "Status transition not allowed.",
                ),
                ConflictKind::OutgoingNotAllowed => (
                    "A filial de origem não permite transferências de saída.",
                    "The origin branch does not allow outgoing transfers.",
                ),
                ConflictKind::IncomingNotAllowed => (
                    "A filial de destino não permite transferências de entrada.",
                    "The destination branch does not allow incoming transfers.",
                ),
                ConflictKind::BranchNotActive => (
                    "A filial não está ativa.",
                    "The branch is not active.",
                ),
            },
            AppError::InsufficientStock { .. } => ("Estoque insuficiente.", "Insufficient stock."),
            AppError::PreconditionFailed(Precondition::BranchHasStock) => (
                "A filial possui registros de estoque.",
                "The branch still has stock entries.",
            ),
            AppError::PreconditionFailed(Precondition::BranchHasActiveTransfers) => (
                "A filial possui transferências em andamento.",
                "The branch has transfers in progress.",
            ),
            AppError::InvalidToken => (
                "Token de autenticação inválido ou ausente.",
                "Missing or invalid authentication token.",
            ),
            AppError::InvalidTenantHeader => (
                "O cabeçalho X-Tenant-ID é obrigatório e deve ser um UUID.",
                "The X-Tenant-ID header is required and must be a UUID.",
            ),
            AppError::TenantAccessDenied => (
                "Você não tem acesso a esta loja.",
                "You do not have access to this tenant.",
            ),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => (
                "Ocorreu um erro inesperado.",
                "An unexpected error occurred.",
            ),
        };
        if en { english } else { pt }
    }
}

// Usado quando não há Locale à mão (ex.: rejeição de extrator).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("senha do banco: hunter2"));
        let api = err.to_api_error(&Locale::default());

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "InternalError");
        assert!(!api.message.contains("hunter2"));
        assert!(api.details.is_none());
    }

    #[test]
    fn domain_errors_map_to_http_codes() {
        let cases = [
            (AppError::NotFound(Entity::Transfer), StatusCode::NOT_FOUND),
            (
                AppError::Conflict(ConflictKind::DuplicateMatriz),
                StatusCode::CONFLICT,
            ),
            (
                AppError::InsufficientStock {
                    requested: Decimal::from(5),
                    available: Decimal::ONE,
                },
                StatusCode::CONFLICT,
            ),
            (
                AppError::PreconditionFailed(Precondition::BranchHasStock),
                StatusCode::PRECONDITION_FAILED,
            ),
            (
                AppError::InvalidInput {
                    field: "quantity",
                    reason: "must_be_positive",
                },
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err:?}");
        }
    }

    #[test]
    fn messages_follow_the_locale() {
        let err = AppError::NotFound(Entity::Branch);
        let pt = err.to_api_error(&Locale::default());
        let en = err.to_api_error(&Locale("en".into()));

        assert_eq!(pt.message, "Filial não encontrada.");
        assert_eq!(en.message, "Branch not found.");
        assert_eq!(pt.error, en.error);
    }

    #[test]
    fn invalid_input_reports_the_field() {
        let err = AppError::InvalidInput {
            field: "cnpj",
            reason: "invalid_cnpj",
        };
        let api = err.to_api_error(&Locale::default());
        assert_eq!(api.details, Some(json!({ "cnpj": ["invalid_cnpj"] })));
    }
}
