// src/db/store.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        branch::{Branch, BranchChanges, NewBranch},
        stock::{Product, ProductDefaults, StockEntry, StockKey},
        tenancy::TenantId,
        transfer::{NewTransfer, TransferFilter, TransferPage, TransferRequest, Transition},
    },
};

// ---
// Interfaces de repositório
// ---
// Construídas uma vez no start-up (Postgres ou memória) e compartilhadas por referência.
// Todo método recebe o TenantId primeiro: não existe consulta "sem tenant".

#[async_trait]
pub trait BranchStore: Send + Sync {
    /// Conflict em CNPJ duplicado ou segunda matriz no mesmo tenant.
    async fn insert_branch(&self, tenant: TenantId, new: NewBranch) -> Result<Branch, AppError>;

    async fn update_branch(
        &self,
        tenant: TenantId,
        id: Uuid,
        changes: BranchChanges,
    ) -> Result<Branch, AppError>;

    async fn find_branch(&self, tenant: TenantId, id: Uuid) -> Result<Option<Branch>, AppError>;

    async fn list_branches(&self, tenant: TenantId) -> Result<Vec<Branch>, AppError>;

    /// Verifica dependentes (estoque, transferências ativas) e remove, tudo de uma vez.
    async fn delete_branch(&self, tenant: TenantId, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait StockStore: Send + Sync {
    async fn get_stock(
        &self,
        tenant: TenantId,
        key: &StockKey,
    ) -> Result<Option<StockEntry>, AppError>;

    async fn list_stock(&self, tenant: TenantId, branch_id: Uuid)
        -> Result<Vec<StockEntry>, AppError>;

    /// "Subtrai qty onde quantity_current >= qty". Falhou a condição: InsufficientStock, nada muda.
    async fn decrement_stock(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
    ) -> Result<StockEntry, AppError>;

    /// Upsert: soma na linha existente ou cria com os limites padrão do produto.
    async fn increment_stock(
        &self,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
        defaults: ProductDefaults,
        expiration_date: Option<chrono::NaiveDate>,
    ) -> Result<StockEntry, AppError>;
}

#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Insere garantindo que as duas filiais ainda existem no tenant.
    async fn insert_transfer(
        &self,
        tenant: TenantId,
        new: NewTransfer,
    ) -> Result<TransferRequest, AppError>;

    async fn find_transfer(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<TransferRequest>, AppError>;

    async fn list_transfers(
        &self,
        tenant: TenantId,
        filter: &TransferFilter,
    ) -> Result<TransferPage, AppError>;

    /// Aplica a transição como uma unidade atômica:
    /// "update where status ∈ allowed_from" + efeito no livro-razão (baixa na origem ou
    /// entrada no destino). Se qualquer parte falhar, nada é gravado.
    async fn apply_transition(
        &self,
        tenant: TenantId,
        id: Uuid,
        transition: &Transition,
    ) -> Result<TransferRequest, AppError>;
}

/// Catálogo de produtos (colaborador externo): só leitura.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_product(&self, tenant: TenantId, id: Uuid) -> Result<Option<Product>, AppError>;
}

pub trait Store: BranchStore + StockStore + TransferStore + ProductCatalog {}

impl<T> Store for T where T: BranchStore + StockStore + TransferStore + ProductCatalog {}
