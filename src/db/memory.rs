// src/db/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::{AppError, ConflictKind, Entity, Precondition},
    db::store::{BranchStore, ProductCatalog, StockStore, TransferStore},
    models::{
        branch::{Branch, BranchChanges, BranchType, NewBranch},
        stock::{Product, ProductDefaults, StockEntry, StockKey},
        tenancy::{TenantId, Tenanted},
        transfer::{NewTransfer, TransferFilter, TransferPage, TransferRequest, Transition},
    },
};

// ---
// Escopo por tenant (versão em memória)
// ---
// Mesmo papel do `scoped_select` do Postgres: toda leitura passa por aqui.

fn scoped<T: Tenanted>(map: &HashMap<Uuid, T>, tenant: TenantId) -> impl Iterator<Item = &T> {
    map.values().filter(move |v| v.tenant_id() == tenant)
}

fn scoped_get<T: Tenanted>(map: &HashMap<Uuid, T>, tenant: TenantId, id: Uuid) -> Option<&T> {
    map.get(&id).filter(|v| v.tenant_id() == tenant)
}

fn scoped_get_mut<T: Tenanted>(
    map: &mut HashMap<Uuid, T>,
    tenant: TenantId,
    id: Uuid,
) -> Option<&mut T> {
    map.get_mut(&id).filter(|v| v.tenant_id() == tenant)
}

#[derive(Default)]
struct MemoryState {
    branches: HashMap<Uuid, Branch>,
    stock: HashMap<Uuid, StockEntry>,
    transfers: HashMap<Uuid, TransferRequest>,
    products: HashMap<Uuid, Product>,
}

impl MemoryState {
    fn check_branch_uniqueness(
        &self,
        tenant: TenantId,
        except: Option<Uuid>,
        cnpj: &str,
        branch_type: BranchType,
    ) -> Result<(), AppError> {
        let others: Vec<&Branch> = scoped(&self.branches, tenant)
            .filter(|b| Some(b.id) != except)
            .collect();

        if others.iter().any(|b| b.cnpj == cnpj) {
            return Err(AppError::Conflict(ConflictKind::DuplicateCnpj));
        }
        if branch_type == BranchType::Matriz
            && others.iter().any(|b| b.branch_type == BranchType::Matriz)
        {
            return Err(AppError::Conflict(ConflictKind::DuplicateMatriz));
        }
        Ok(())
    }

    fn stock_entry_mut(&mut self, tenant: TenantId, key: &StockKey) -> Option<&mut StockEntry> {
        self.stock
            .values_mut()
            .find(|e| e.tenant_id == tenant && e.matches(key))
    }

    fn decrement(
        &mut self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
    ) -> Result<StockEntry, AppError> {
        match self.stock_entry_mut(tenant, key) {
            Some(entry) if entry.quantity_current >= quantity => {
                entry.quantity_current -= quantity;
                entry.updated_at = Utc::now();
                Ok(entry.clone())
            }
            other => Err(AppError::InsufficientStock {
                requested: quantity,
                available: other.map(|e| e.quantity_current).unwrap_or(Decimal::ZERO),
            }),
        }
    }

    fn increment(
        &mut self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
        defaults: ProductDefaults,
        expiration_date: Option<NaiveDate>,
    ) -> StockEntry {
        let now = Utc::now();

        if let Some(entry) = self.stock_entry_mut(tenant, key) {
            entry.quantity_current += quantity;
            entry.updated_at = now;
            return entry.clone();
        }

        let entry = StockEntry {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            branch_id: key.branch_id,
            product_id: key.product_id,
            lot: key.lot.clone(),
            quantity_current: quantity,
            quantity_min: defaults.default_min,
            quantity_max: defaults.default_max,
            expiration_date,
            created_at: now,
            updated_at: now,
        };
        self.stock.insert(entry.id, entry.clone());
        entry
    }
}

/// Store em memória: mesmo contrato do Postgres, cada mutação sob um único lock.
/// Usado quando não há DATABASE_URL (desenvolvimento) e nos testes.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cadastra um produto no catálogo local (o catálogo real é externo).
    pub async fn seed_product(
        &self,
        tenant: TenantId,
        name: &str,
        defaults: ProductDefaults,
    ) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            name: name.to_string(),
            default_min: defaults.default_min,
            default_max: defaults.default_max,
        };
        self.state
            .lock()
            .await
            .products
            .insert(product.id, product.clone());
        product
    }
}

#[async_trait]
impl BranchStore for MemoryStore {
    async fn insert_branch(&self, tenant: TenantId, new: NewBranch) -> Result<Branch, AppError> {
        let mut state = self.state.lock().await;
        state.check_branch_uniqueness(tenant, None, &new.cnpj, new.branch_type)?;

        let now = Utc::now();
        let branch = Branch {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            name: new.name,
            cnpj: new.cnpj,
            branch_type: new.branch_type,
            status: new.status,
            config: new.config,
            created_at: now,
            updated_at: now,
        };
        state.branches.insert(branch.id, branch.clone());
        Ok(branch)
    }

    async fn update_branch(
        &self,
        tenant: TenantId,
        id: Uuid,
        changes: BranchChanges,
    ) -> Result<Branch, AppError> {
        let mut state = self.state.lock().await;

        let current = scoped_get(&state.branches, tenant, id)
            .cloned()
            .ok_or(AppError::NotFound(Entity::Branch))?;

        let cnpj = changes.cnpj.unwrap_or(current.cnpj);
        let branch_type = changes.branch_type.unwrap_or(current.branch_type);
        state.check_branch_uniqueness(tenant, Some(id), &cnpj, branch_type)?;

        let branch = scoped_get_mut(&mut state.branches, tenant, id)
            .ok_or(AppError::NotFound(Entity::Branch))?;
        if let Some(name) = changes.name {
            branch.name = name;
        }
        branch.cnpj = cnpj;
        branch.branch_type = branch_type;
        if let Some(status) = changes.status {
            branch.status = status;
        }
        if let Some(patch) = changes.config {
            branch.config = patch.apply(branch.config);
        }
        branch.updated_at = Utc::now();
        Ok(branch.clone())
    }

    async fn find_branch(&self, tenant: TenantId, id: Uuid) -> Result<Option<Branch>, AppError> {
        let state = self.state.lock().await;
        Ok(scoped_get(&state.branches, tenant, id).cloned())
    }

    async fn list_branches(&self, tenant: TenantId) -> Result<Vec<Branch>, AppError> {
        let state = self.state.lock().await;
        let mut branches: Vec<Branch> = scoped(&state.branches, tenant).cloned().collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn delete_branch(&self, tenant: TenantId, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        if scoped_get(&state.branches, tenant, id).is_none() {
            return Err(AppError::NotFound(Entity::Branch));
        }
        if scoped(&state.stock, tenant).any(|e| e.branch_id == id) {
            return Err(AppError::PreconditionFailed(Precondition::BranchHasStock));
        }
        if scoped(&state.transfers, tenant)
            .any(|t| t.involves_branch(id) && !t.status.is_terminal())
        {
            return Err(AppError::PreconditionFailed(
                Precondition::BranchHasActiveTransfers,
            ));
        }

        state.branches.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl StockStore for MemoryStore {
    async fn get_stock(
        &self,
        tenant: TenantId,
        key: &StockKey,
    ) -> Result<Option<StockEntry>, AppError> {
        let state = self.state.lock().await;
        Ok(scoped(&state.stock, tenant).find(|e| e.matches(key)).cloned())
    }

    async fn list_stock(
        &self,
        tenant: TenantId,
        branch_id: Uuid,
    ) -> Result<Vec<StockEntry>, AppError> {
        let state = self.state.lock().await;
        let mut entries: Vec<StockEntry> = scoped(&state.stock, tenant)
            .filter(|e| e.branch_id == branch_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| (a.product_id, &a.lot).cmp(&(b.product_id, &b.lot)));
        Ok(entries)
    }

    async fn decrement_stock(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
    ) -> Result<StockEntry, AppError> {
        self.state.lock().await.decrement(tenant, key, quantity)
    }

    async fn increment_stock(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
        defaults: ProductDefaults,
        expiration_date: Option<NaiveDate>,
    ) -> Result<StockEntry, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .increment(tenant, key, quantity, defaults, expiration_date))
    }
}

#[async_trait]
impl TransferStore for MemoryStore {
    async fn insert_transfer(
        &self,
        tenant: TenantId,
        new: NewTransfer,
    ) -> Result<TransferRequest, AppError> {
        let mut state = self.state.lock().await;

        for branch_id in [new.origin_branch_id, new.destination_branch_id] {
            if scoped_get(&state.branches, tenant, branch_id).is_none() {
                return Err(AppError::NotFound(Entity::Branch));
            }
        }

        let transfer = TransferRequest {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            origin_branch_id: new.origin_branch_id,
            destination_branch_id: new.destination_branch_id,
            product_id: new.product_id,
            quantity: new.quantity,
            lot: new.lot,
            status: new.status,
            requested_by: new.requested_by,
            approved_by: new.approved_by,
            requested_at: new.requested_at,
            approved_at: new.approved_at,
            shipped_at: None,
            received_at: None,
            received_quantity: None,
            cancelled_at: None,
            cancellation_reason: None,
            notes: new.notes,
            updated_at: new.requested_at,
        };
        state.transfers.insert(transfer.id, transfer.clone());
        Ok(transfer)
    }

    async fn find_transfer(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<TransferRequest>, AppError> {
        let state = self.state.lock().await;
        Ok(scoped_get(&state.transfers, tenant, id).cloned())
    }

    async fn list_transfers(
        &self,
        tenant: TenantId,
        filter: &TransferFilter,
    ) -> Result<TransferPage, AppError> {
        let state = self.state.lock().await;

        let mut matching: Vec<&TransferRequest> = scoped(&state.transfers, tenant)
            .filter(|t| filter.matches(t))
            .collect();
        matching.sort_by(|a, b| {
            b.requested_at
                .cmp(&a.requested_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .cloned()
            .collect();

        Ok(TransferPage {
            items,
            total,
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
        let mut state = self.state.lock().await;

        let current = scoped_get(&state.transfers, tenant, id)
            .cloned()
            .ok_or(AppError::NotFound(Entity::Transfer))?;

        if !current.status.can_transition_to(transition.target()) {
            return Err(AppError::Conflict(ConflictKind::InvalidTransition {
                from: current.status,
                to: transition.target(),
            }));
        }

        // Efeito no livro-razão primeiro: se falhar, o pedido nem é tocado.
        match transition {
            Transition::Ship { .. } => {
                state.decrement(tenant, &current.origin_key(), current.quantity)?;
            }
            Transition::Receive {
                quantity,
                defaults,
                expiration_date,
                ..
            } => {
                state.increment(
                    tenant,
                    &current.destination_key(),
                    *quantity,
                    *defaults,
                    *expiration_date,
                );
            }
            Transition::Approve { .. } | Transition::Cancel { .. } => {}
        }

        let transfer = scoped_get_mut(&mut state.transfers, tenant, id)
            .ok_or(AppError::NotFound(Entity::Transfer))?;
        transfer.apply(transition);
        Ok(transfer.clone())
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn find_product(&self, tenant: TenantId, id: Uuid) -> Result<Option<Product>, AppError> {
        let state = self.state.lock().await;
        Ok(scoped_get(&state.products, tenant, id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::branch::{BranchConfig, BranchStatus};

    fn defaults() -> ProductDefaults {
        ProductDefaults {
            default_min: Decimal::from(5),
            default_max: Decimal::from(50),
        }
    }

    fn new_branch(cnpj: &str, branch_type: BranchType) -> NewBranch {
        NewBranch {
            name: format!("Filial {cnpj}"),
            cnpj: cnpj.to_string(),
            branch_type,
            status: BranchStatus::Ativa,
            config: BranchConfig::default(),
        }
    }

    #[tokio::test]
    async fn decrement_never_goes_below_zero() {
        let store = MemoryStore::new();
        let tenant = TenantId::new(Uuid::new_v4());
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4(), Some("L1".into()));

        store
            .increment_stock(tenant, &key, Decimal::from(10), defaults(), None)
            .await
            .unwrap();

        let err = store
            .decrement_stock(tenant, &key, Decimal::from(11))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { available, .. } if available == Decimal::from(10)
        ));

        let entry = store.get_stock(tenant, &key).await.unwrap().unwrap();
        assert_eq!(entry.quantity_current, Decimal::from(10));

        let entry = store
            .decrement_stock(tenant, &key, Decimal::from(10))
            .await
            .unwrap();
        assert_eq!(entry.quantity_current, Decimal::ZERO);
    }

    #[tokio::test]
    async fn increment_creates_row_with_product_thresholds() {
        let store = MemoryStore::new();
        let tenant = TenantId::new(Uuid::new_v4());
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4(), None);

        let created = store
            .increment_stock(tenant, &key, Decimal::from(3), defaults(), None)
            .await
            .unwrap();
        assert_eq!(created.quantity_min, Decimal::from(5));
        assert_eq!(created.quantity_max, Decimal::from(50));

        let updated = store
            .increment_stock(tenant, &key, Decimal::from(4), defaults(), None)
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.quantity_current, Decimal::from(7));
    }

    #[tokio::test]
    async fn lot_is_part_of_the_stock_key() {
        let store = MemoryStore::new();
        let tenant = TenantId::new(Uuid::new_v4());
        let (branch, product) = (Uuid::new_v4(), Uuid::new_v4());
        let with_lot = StockKey::new(branch, product, Some("L1".into()));
        let without_lot = StockKey::new(branch, product, None);

        store
            .increment_stock(tenant, &with_lot, Decimal::from(8), defaults(), None)
            .await
            .unwrap();

        assert!(store.get_stock(tenant, &without_lot).await.unwrap().is_none());
        assert_eq!(store.list_stock(tenant, branch).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn branch_uniqueness_is_per_tenant() {
        let store = MemoryStore::new();
        let (a, b) = (TenantId::new(Uuid::new_v4()), TenantId::new(Uuid::new_v4()));

        store
            .insert_branch(a, new_branch("11222333000181", BranchType::Matriz))
            .await
            .unwrap();
        store
            .insert_branch(b, new_branch("11222333000181", BranchType::Matriz))
            .await
            .unwrap();

        let err = store
            .insert_branch(a, new_branch("11222333000181", BranchType::Filial))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ConflictKind::DuplicateCnpj)));
    }

    #[tokio::test]
    async fn foreign_rows_are_invisible() {
        let store = MemoryStore::new();
        let (a, b) = (TenantId::new(Uuid::new_v4()), TenantId::new(Uuid::new_v4()));

        let branch = store
            .insert_branch(a, new_branch("11444777000161", BranchType::Filial))
            .await
            .unwrap();

        assert!(store.find_branch(b, branch.id).await.unwrap().is_none());
        assert!(store.list_branches(b).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_branch(b, branch.id).await,
            Err(AppError::NotFound(Entity::Branch))
        ));
    }
}
