pub mod branches;
pub mod stock;
pub mod transfers;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    middleware::i18n::Locale,
};

// Corpo JSON malformado (ou com chaves desconhecidas) vira o nosso envelope 400,
// não a resposta de texto padrão do axum.
pub(crate) fn json_body<T: Validate>(
    payload: Result<Json<T>, JsonRejection>,
    locale: &Locale,
) -> Result<T, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Corpo JSON rejeitado");
        AppError::InvalidInput {
            field: "body",
            reason: "invalid_json",
        }
        .to_api_error(locale)
    })?;

    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(locale))?;
    Ok(payload)
}

pub(crate) fn query_params<T>(
    params: Result<Query<T>, QueryRejection>,
    locale: &Locale,
) -> Result<T, ApiError> {
    params.map(|Query(p)| p).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Query string rejeitada");
        AppError::InvalidInput {
            field: "query",
            reason: "invalid_query",
        }
        .to_api_error(locale)
    })
}
