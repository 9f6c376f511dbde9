// src/services/transfer_query.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::{AppError, Entity},
    db::Store,
    models::{
        tenancy::TenantId,
        transfer::{TransferFilter, TransferPage, TransferRequest, DEFAULT_PER_PAGE, MAX_PER_PAGE},
    },
};

/// Resolve a paginação: page >= 1 (padrão 1), per_page em 1..=100 (padrão 20).
pub fn resolve_page(page: Option<u32>, per_page: Option<u32>) -> Result<(u32, u32), AppError> {
    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::InvalidInput {
            field: "page",
            reason: "must_be_positive",
        });
    }

    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(AppError::InvalidInput {
            field: "perPage",
            reason: "out_of_range",
        });
    }

    Ok((page, per_page))
}

// Histórico de transferências (somente leitura)
#[derive(Clone)]
pub struct TransferQuery {
    store: Arc<dyn Store>,
}

impl TransferQuery {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        tenant: TenantId,
        filter: TransferFilter,
    ) -> Result<TransferPage, AppError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::InvalidInput {
                    field: "from",
                    reason: "after_to",
                });
            }
        }

        let page = self.store.list_transfers(tenant, &filter).await?;
        tracing::debug!(
            tenant_id = %tenant,
            total = page.total,
            page = page.page,
            "Histórico de transferências consultado"
        );
        Ok(page)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<TransferRequest, AppError> {
        self.store
            .find_transfer(tenant, id)
            .await?
            .ok_or(AppError::NotFound(Entity::Transfer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_apply_when_absent() {
        assert_eq!(resolve_page(None, None).unwrap(), (1, DEFAULT_PER_PAGE));
        assert_eq!(resolve_page(Some(4), Some(100)).unwrap(), (4, 100));
    }

    #[test]
    fn page_bounds_are_enforced() {
        assert!(matches!(
            resolve_page(Some(0), None),
            Err(AppError::InvalidInput { field: "page", .. })
        ));
        assert!(matches!(
            resolve_page(None, Some(0)),
            Err(AppError::InvalidInput { field: "perPage", .. })
        ));
        assert!(matches!(
            resolve_page(None, Some(MAX_PER_PAGE + 1)),
            Err(AppError::InvalidInput { field: "perPage", .. })
        ));
    }
}
