// src/services/branch_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::{AppError, Entity},
    db::Store,
    models::{
        branch::{normalize_cnpj, Branch, BranchChanges, BranchConfig, BranchStatus, BranchType, NewBranch},
        tenancy::TenantId,
    },
};

/// Dados de criação vindos da borda (antes da normalização).
#[derive(Debug, Clone)]
pub struct CreateBranch {
    pub name: String,
    pub cnpj: String,
    pub branch_type: BranchType,
    pub status: Option<BranchStatus>,
    pub config: Option<BranchConfig>,
}

// Registro de filiais
#[derive(Clone)]
pub struct BranchService {
    store: Arc<dyn Store>,
}

impl BranchService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn require_cnpj(raw: &str) -> Result<String, AppError> {
        normalize_cnpj(raw).ok_or(AppError::InvalidInput {
            field: "cnpj",
            reason: "invalid_cnpj",
        })
    }

    fn require_name(raw: &str) -> Result<String, AppError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput {
                field: "name",
                reason: "required",
            });
        }
        Ok(name.to_string())
    }

    /// Cria uma filial. CNPJ duplicado ou segunda matriz no tenant: Conflict.
    pub async fn create(&self, tenant: TenantId, input: CreateBranch) -> Result<Branch, AppError> {
        let new = NewBranch {
            name: Self::require_name(&input.name)?,
            cnpj: Self::require_cnpj(&input.cnpj)?,
            branch_type: input.branch_type,
            status: input.status.unwrap_or(BranchStatus::Ativa),
            config: input.config.unwrap_or_default(),
        };

        let branch = self.store.insert_branch(tenant, new).await?;

        tracing::info!(
            tenant_id = %tenant,
            branch_id = %branch.id,
            branch_type = ?branch.branch_type,
            "🏪 Filial criada"
        );
        Ok(branch)
    }

    pub async fn update(
        &self,
        tenant: TenantId,
        id: Uuid,
        mut changes: BranchChanges,
    ) -> Result<Branch, AppError> {
        if let Some(name) = changes.name.as_deref() {
            changes.name = Some(Self::require_name(name)?);
        }
        if let Some(cnpj) = changes.cnpj.as_deref() {
            changes.cnpj = Some(Self::require_cnpj(cnpj)?);
        }

        let branch = self.store.update_branch(tenant, id, changes).await?;

        tracing::info!(tenant_id = %tenant, branch_id = %id, "Filial atualizada");
        Ok(branch)
    }

    /// Falha com PreconditionFailed se houver estoque ou transferências em andamento.
    pub async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), AppError> {
        self.store.delete_branch(tenant, id).await?;

        tracing::info!(tenant_id = %tenant, branch_id = %id, "🗑️ Filial removida");
        Ok(())
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<Branch, AppError> {
        self.store
            .find_branch(tenant, id)
            .await?
            .ok_or(AppError::NotFound(Entity::Branch))
    }

    pub async fn list(&self, tenant: TenantId) -> Result<Vec<Branch>, AppError> {
        self.store.list_branches(tenant).await
    }
}
