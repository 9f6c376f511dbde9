// src/services/stock_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::{AppError, Entity},
    db::Store,
    models::{
        stock::{ProductDefaults, StockEntry, StockKey},
        tenancy::TenantId,
    },
};

pub(crate) fn require_positive(field: &'static str, quantity: Decimal) -> Result<(), AppError> {
    if quantity <= Decimal::ZERO {
        return Err(AppError::InvalidInput {
            field,
            reason: "must_be_positive",
        });
    }
    Ok(())
}

// Livro-razão de estoque: as únicas portas de escrita em stock_entries.
#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn Store>,
}

impl StockService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Saldo atual ou ausência (sem erro).
    pub async fn get(&self, tenant: TenantId, key: &StockKey) -> Result<Option<StockEntry>, AppError> {
        self.store.get_stock(tenant, key).await
    }

    pub async fn list(&self, tenant: TenantId, branch_id: Uuid) -> Result<Vec<StockEntry>, AppError> {
        // Filial de outro tenant (ou inexistente) é 404, não uma lista vazia
        self.store
            .find_branch(tenant, branch_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Branch))?;

        self.store.list_stock(tenant, branch_id).await
    }

    /// Baixa atômica. Saldo insuficiente: InsufficientStock e nada muda.
    pub async fn decrement(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
    ) -> Result<StockEntry, AppError> {
        require_positive("quantity", quantity)?;
        self.store.decrement_stock(tenant, key, quantity).await
    }

    /// Entrada atômica (upsert) com os limites padrão do produto.
    pub async fn increment(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
        defaults: ProductDefaults,
        expiration_date: Option<NaiveDate>,
    ) -> Result<StockEntry, AppError> {
        require_positive("quantity", quantity)?;
        self.store
            .increment_stock(tenant, key, quantity, defaults, expiration_date)
            .await
    }

    /// Atribuição de estoque (entrada manual): busca os padrões no catálogo e incrementa.
    pub async fn assign(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
        expiration_date: Option<NaiveDate>,
    ) -> Result<StockEntry, AppError> {
        require_positive("quantity", quantity)?;

        self.store
            .find_branch(tenant, key.branch_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Branch))?;
        let product = self
            .store
            .find_product(tenant, key.product_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Product))?;

        let entry = self
            .increment(tenant, key, quantity, product.defaults(), expiration_date)
            .await?;

        tracing::info!(
            tenant_id = %tenant,
            branch_id = %key.branch_id,
            product_id = %key.product_id,
            lot = ?key.lot,
            %quantity,
            balance = %entry.quantity_current,
            "📦 Entrada de estoque registrada"
        );
        Ok(entry)
    }
}
