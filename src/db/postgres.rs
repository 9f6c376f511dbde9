// src/db/postgres.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_tenant_tx,
        error::{AppError, ConflictKind, Entity},
    },
    db::{
        store::{BranchStore, ProductCatalog, StockStore, TransferStore},
        BranchRepository, ProductRepository, StockRepository, TransferRepository,
    },
    models::{
        branch::{Branch, BranchChanges, NewBranch},
        stock::{Product, ProductDefaults, StockEntry, StockKey},
        tenancy::TenantId,
        transfer::{NewTransfer, TransferFilter, TransferPage, TransferRequest, Transition},
    },
};

/// Store Postgres: cada operação roda numa transação com a "chave" RLS do tenant.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    branch_repo: BranchRepository,
    stock_repo: StockRepository,
    transfer_repo: TransferRepository,
    product_repo: ProductRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            branch_repo: BranchRepository::new(),
            stock_repo: StockRepository::new(),
            transfer_repo: TransferRepository::new(),
            product_repo: ProductRepository::new(),
        }
    }

    // Baixa com o erro de domínio: se o UPDATE condicional não casou, lê o saldo
    // (mesma transação) só para informar quanto havia.
    async fn decrement_in(
        &self,
        conn: &mut PgConnection,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
    ) -> Result<StockEntry, AppError> {
        if let Some(entry) = self
            .stock_repo
            .try_decrement(&mut *conn, tenant, key, quantity)
            .await?
        {
            return Ok(entry);
        }

        let available = self
            .stock_repo
            .get(&mut *conn, tenant, key)
            .await?
            .map(|e| e.quantity_current)
            .unwrap_or(Decimal::ZERO);

        Err(AppError::InsufficientStock {
            requested: quantity,
            available,
        })
    }
}

#[async_trait]
impl BranchStore for PgStore {
    async fn insert_branch(&self, tenant: TenantId, new: NewBranch) -> Result<Branch, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let branch = self.branch_repo.insert(&mut *tx, tenant, &new).await?;
        tx.commit().await?;
        Ok(branch)
    }

    async fn update_branch(
        &self,
        tenant: TenantId,
        id: Uuid,
        changes: BranchChanges,
    ) -> Result<Branch, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let branch = self
            .branch_repo
            .update(&mut *tx, tenant, id, changes)
            .await?
            .ok_or(AppError::NotFound(Entity::Branch))?;
        tx.commit().await?;
        Ok(branch)
    }

    async fn find_branch(&self, tenant: TenantId, id: Uuid) -> Result<Option<Branch>, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let branch = self.branch_repo.find(&mut *tx, tenant, id).await?;
        tx.commit().await?;
        Ok(branch)
    }

    async fn list_branches(&self, tenant: TenantId) -> Result<Vec<Branch>, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let branches = self.branch_repo.list(&mut *tx, tenant).await?;
        tx.commit().await?;
        Ok(branches)
    }

    async fn delete_branch(&self, tenant: TenantId, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        // Se falhar aqui, o tx sofre rollback automático ao sair do escopo (drop)
        self.branch_repo.delete_checked(&mut tx, tenant, id).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl StockStore for PgStore {
    async fn get_stock(
        &self,
        tenant: TenantId,
        key: &StockKey,
    ) -> Result<Option<StockEntry>, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let entry = self.stock_repo.get(&mut *tx, tenant, key).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn list_stock(
        &self,
        tenant: TenantId,
        branch_id: Uuid,
    ) -> Result<Vec<StockEntry>, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let entries = self
            .stock_repo
            .list_for_branch(&mut *tx, tenant, branch_id)
            .await?;
        tx.commit().await?;
        Ok(entries)
    }

    async fn decrement_stock(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
    ) -> Result<StockEntry, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let entry = self.decrement_in(&mut tx, tenant, key, quantity).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn increment_stock(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
        defaults: ProductDefaults,
        expiration_date: Option<NaiveDate>,
    ) -> Result<StockEntry, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let entry = self
            .stock_repo
            .increment(&mut *tx, tenant, key, quantity, defaults, expiration_date)
            .await?;
        tx.commit().await?;
        Ok(entry)
    }
}

#[async_trait]
impl TransferStore for PgStore {
    async fn insert_transfer(
        &self,
        tenant: TenantId,
        new: NewTransfer,
    ) -> Result<TransferRequest, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;

        let branch_ids = [new.origin_branch_id, new.destination_branch_id];
        let found = self
            .branch_repo
            .share_lock(&mut *tx, tenant, &branch_ids)
            .await?;
        if found != branch_ids.len() {
            return Err(AppError::NotFound(Entity::Branch));
        }

        let transfer = self.transfer_repo.insert(&mut *tx, tenant, &new).await?;
        tx.commit().await?;
        Ok(transfer)
    }

    async fn find_transfer(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<TransferRequest>, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let transfer = self.transfer_repo.find(&mut *tx, tenant, id).await?;
        tx.commit().await?;
        Ok(transfer)
    }

    async fn list_transfers(
        &self,
        tenant: TenantId,
        filter: &TransferFilter,
    ) -> Result<TransferPage, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let total = self.transfer_repo.count(&mut *tx, tenant, filter).await?;
        let items = self.transfer_repo.list(&mut *tx, tenant, filter).await?;
        tx.commit().await?;

        Ok(TransferPage {
            items,
            total: total.max(0) as u64,
            page: filter.page,
            per_page: filter.per_page,
        })
    }

    async fn apply_transition(
        &self,
        tenant: TenantId,
        id: Uuid,
        transition: &Transition,
    ) -> Result<TransferRequest, AppError> {
        // 1. Inicia a transação: status + livro-razão entram juntos ou não entram
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;

        // 2. UPDATE condicional no status
        let Some(transfer) = self
            .transfer_repo
            .transition(&mut *tx, tenant, id, transition)
            .await?
        else {
            // Não casou: ou não existe (no tenant), ou o status não permite
            let current = self.transfer_repo.find(&mut *tx, tenant, id).await?;
            return Err(match current {
                None => AppError::NotFound(Entity::Transfer),
                Some(t) => AppError::Conflict(ConflictKind::InvalidTransition {
                    from: t.status,
                    to: transition.target(),
                }),
            });
        };

        // 3. Efeito no estoque
        match transition {
            Transition::Ship { .. } => {
                self.decrement_in(&mut tx, tenant, &transfer.origin_key(), transfer.quantity)
                    .await?;
            }
            Transition::Receive {
                quantity,
                defaults,
                expiration_date,
                ..
            } => {
                self.stock_repo
                    .increment(
                        &mut *tx,
                        tenant,
                        &transfer.destination_key(),
                        *quantity,
                        *defaults,
                        *expiration_date,
                    )
                    .await?;
            }
            Transition::Approve { .. } | Transition::Cancel { .. } => {}
        }

        // 4. Commit
        tx.commit().await?;
        Ok(transfer)
    }
}

#[async_trait]
impl ProductCatalog for PgStore {
    async fn find_product(&self, tenant: TenantId, id: Uuid) -> Result<Option<Product>, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant).await?;
        let product = self.product_repo.find(&mut *tx, tenant, id).await?;
        tx.commit().await?;
        Ok(product)
    }
}
