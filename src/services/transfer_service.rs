// src/services/transfer_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::{AppError, ConflictKind, Entity},
    db::Store,
    models::{
        branch::Branch,
        stock::StockKey,
        tenancy::TenantId,
        transfer::{NewTransfer, TransferRequest, TransferStatus, Transition},
    },
    services::stock_service::require_positive,
};

#[derive(Debug, Clone)]
pub struct CreateTransfer {
    pub origin_branch_id: Uuid,
    pub destination_branch_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub lot: Option<String>,
    pub notes: Option<String>,
}

// Texto opcional: espaços em branco contam como ausente
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Máquina de estados da transferência entre filiais.
///
/// Toda transição passa por `Store::apply_transition`, que grava status e efeito
/// no estoque como uma unidade. As checagens feitas aqui antes disso são só para
/// dar o erro mais útil ao cliente; quem decide é o store.
#[derive(Clone)]
pub struct TransferService {
    store: Arc<dyn Store>,
}

impl TransferService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn branch(&self, tenant: TenantId, id: Uuid) -> Result<Branch, AppError> {
        self.store
            .find_branch(tenant, id)
            .await?
            .ok_or(AppError::NotFound(Entity::Branch))
    }

    // Checagem consultiva: a baixa de verdade só acontece no envio.
    async fn ensure_available(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
    ) -> Result<(), AppError> {
        let available = self
            .store
            .get_stock(tenant, key)
            .await?
            .map(|e| e.quantity_current)
            .unwrap_or(Decimal::ZERO);

        if available < quantity {
            tracing::warn!(
                tenant_id = %tenant,
                branch_id = %key.branch_id,
                product_id = %key.product_id,
                %quantity,
                %available,
                "Estoque insuficiente na origem"
            );
            return Err(AppError::InsufficientStock {
                requested: quantity,
                available,
            });
        }
        Ok(())
    }

    async fn transition(
        &self,
        tenant: TenantId,
        id: Uuid,
        transition: Transition,
    ) -> Result<TransferRequest, AppError> {
        match self.store.apply_transition(tenant, id, &transition).await {
            Ok(transfer) => {
                tracing::info!(
                    tenant_id = %tenant,
                    transfer_id = %id,
                    status = transfer.status.as_str(),
                    "🔁 Transferência: {}",
                    transition.name()
                );
                Ok(transfer)
            }
            Err(e) => {
                tracing::warn!(
                    tenant_id = %tenant,
                    transfer_id = %id,
                    error = %e,
                    "Transição {} rejeitada",
                    transition.name()
                );
                Err(e)
            }
        }
    }

    pub async fn create(
        &self,
        tenant: TenantId,
        requested_by: Uuid,
        input: CreateTransfer,
    ) -> Result<TransferRequest, AppError> {
        require_positive("quantity", input.quantity)?;
        if input.origin_branch_id == input.destination_branch_id {
            return Err(AppError::InvalidInput {
                field: "destinationBranchId",
                reason: "same_as_origin",
            });
        }

        // 1. As duas filiais precisam existir no tenant do chamador
        let origin = self.branch(tenant, input.origin_branch_id).await?;
        let destination = self.branch(tenant, input.destination_branch_id).await?;

        // 2. Regras de configuração
        if !origin.is_active() || !destination.is_active() {
            return Err(AppError::Conflict(ConflictKind::BranchNotActive));
        }
        if !origin.config.allow_outgoing {
            return Err(AppError::Conflict(ConflictKind::OutgoingNotAllowed));
        }
        if !destination.config.allow_incoming {
            return Err(AppError::Conflict(ConflictKind::IncomingNotAllowed));
        }

        // 3. Produto no catálogo
        self.store
            .find_product(tenant, input.product_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Product))?;

        let origin_key = StockKey::new(origin.id, input.product_id, input.lot);
        self.ensure_available(tenant, &origin_key, input.quantity)
            .await?;

        // 4. Status inicial decidido aqui, gravado numa única inserção
        let now = Utc::now();
        let auto_approved = !origin.config.requires_approval;
        let new = NewTransfer {
            origin_branch_id: origin.id,
            destination_branch_id: destination.id,
            product_id: input.product_id,
            quantity: input.quantity,
            lot: origin_key.lot.clone(),
            status: if auto_approved {
                TransferStatus::Aprovada
            } else {
                TransferStatus::Solicitada
            },
            requested_by,
            approved_by: auto_approved.then_some(requested_by),
            requested_at: now,
            approved_at: auto_approved.then_some(now),
            notes: non_blank(input.notes),
        };

        let transfer = self.store.insert_transfer(tenant, new).await?;

        tracing::info!(
            tenant_id = %tenant,
            transfer_id = %transfer.id,
            status = transfer.status.as_str(),
            "📝 Transferência solicitada"
        );
        Ok(transfer)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<TransferRequest, AppError> {
        self.store
            .find_transfer(tenant, id)
            .await?
            .ok_or(AppError::NotFound(Entity::Transfer))
    }

    /// Só a partir de `solicitada`. Qualquer outro estado é `AlreadyProcessed`.
    pub async fn approve(
        &self,
        tenant: TenantId,
        id: Uuid,
        approved_by: Uuid,
    ) -> Result<TransferRequest, AppError> {
        let current = self.get(tenant, id).await?;
        if current.status != TransferStatus::Solicitada {
            return Err(AppError::Conflict(ConflictKind::AlreadyProcessed));
        }

        self.ensure_available(tenant, &current.origin_key(), current.quantity)
            .await?;

        let transition = Transition::Approve {
            approved_by,
            at: Utc::now(),
        };
        // Outra aprovação pode ter vencido a corrida entre a leitura e a escrita
        self.transition(tenant, id, transition)
            .await
            .map_err(|e| match e {
                AppError::Conflict(ConflictKind::InvalidTransition { .. }) => {
                    AppError::Conflict(ConflictKind::AlreadyProcessed)
                }
                other => other,
            })
    }

    /// Baixa na origem + `em_transito`, atomicamente.
    pub async fn start_transit(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<TransferRequest, AppError> {
        self.transition(tenant, id, Transition::Ship { at: Utc::now() })
            .await
    }

    /// Entrada no destino + `concluida`, atomicamente.
    /// A quantidade recebida pode diferir da solicitada; nenhum ajuste é lançado.
    pub async fn confirm_receipt(
        &self,
        tenant: TenantId,
        id: Uuid,
        received_quantity: Option<Decimal>,
        notes: Option<String>,
    ) -> Result<TransferRequest, AppError> {
        let current = self.get(tenant, id).await?;
        if !current.status.can_transition_to(TransferStatus::Concluida) {
            return Err(AppError::Conflict(ConflictKind::InvalidTransition {
                from: current.status,
                to: TransferStatus::Concluida,
            }));
        }

        let quantity = received_quantity.unwrap_or(current.quantity);
        require_positive("receivedQuantity", quantity)?;

        let product = self
            .store
            .find_product(tenant, current.product_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Product))?;

        // Validade do lote de origem segue para a linha nova no destino
        let expiration_date = self
            .store
            .get_stock(tenant, &current.origin_key())
            .await?
            .and_then(|e| e.expiration_date);

        let transition = Transition::Receive {
            quantity,
            defaults: product.defaults(),
            expiration_date,
            notes: non_blank(notes),
            at: Utc::now(),
        };
        self.transition(tenant, id, transition).await
    }

    /// Só a partir de `solicitada` ou `aprovada`. Não mexe no estoque.
    pub async fn cancel(
        &self,
        tenant: TenantId,
        id: Uuid,
        reason: &str,
    ) -> Result<TransferRequest, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput {
                field: "reason",
                reason: "required",
            });
        }

        let transition = Transition::Cancel {
            reason: reason.to_string(),
            at: Utc::now(),
        };
        self.transition(tenant, id, transition).await
    }
}
