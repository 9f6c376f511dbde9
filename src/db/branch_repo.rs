// src/db/branch_repo.rs

use sqlx::{types::Json, Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{push_tenant_filter, scoped_select},
        error::{AppError, ConflictKind, Entity, Precondition},
    },
    models::{
        branch::{Branch, BranchChanges, BranchRow, NewBranch},
        tenancy::TenantId,
        transfer::TransferStatus,
    },
};

// Nomes das constraints de unicidade (ver migrations/)
const CNPJ_CONSTRAINT: &str = "branches_tenant_cnpj_key";
const MATRIZ_CONSTRAINT: &str = "branches_one_matriz_per_tenant";

#[derive(Clone, Default)]
pub struct BranchRepository;

impl BranchRepository {
    pub fn new() -> Self {
        Self
    }

    // Converte erro de violação de unicidade em um Conflict de domínio
    fn map_unique_violation(e: sqlx::Error) -> AppError {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or_default();
                if constraint == MATRIZ_CONSTRAINT {
                    return AppError::Conflict(ConflictKind::DuplicateMatriz);
                }
                if constraint == CNPJ_CONSTRAINT {
                    return AppError::Conflict(ConflictKind::DuplicateCnpj);
                }
            }
        }
        e.into()
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        new: &NewBranch,
    ) -> Result<Branch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, BranchRow>(
            r#"
            INSERT INTO branches (tenant_id, name, cnpj, branch_type, status, config)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant)
        .bind(&new.name)
        .bind(&new.cnpj)
        .bind(new.branch_type)
        .bind(new.status)
        .bind(Json(new.config))
        .fetch_one(executor)
        .await
        .map_err(Self::map_unique_violation)?;

        Ok(row.into())
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        id: Uuid,
        changes: BranchChanges,
    ) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // COALESCE: um campo ausente ($n = NULL) mantém o valor atual
        let mut qb = QueryBuilder::new("UPDATE branches SET name = COALESCE(");
        qb.push_bind(changes.name);
        qb.push(", name), cnpj = COALESCE(");
        qb.push_bind(changes.cnpj);
        qb.push(", cnpj), branch_type = COALESCE(");
        qb.push_bind(changes.branch_type);
        qb.push(", branch_type), status = COALESCE(");
        qb.push_bind(changes.status);
        // config: merge das chaves enviadas sobre o JSONB atual
        qb.push(", status), config = config || COALESCE(");
        qb.push_bind(changes.config.map(Json));
        qb.push(", '{}'::jsonb), updated_at = NOW()");
        push_tenant_filter(&mut qb, tenant);
        qb.push(" AND id = ");
        qb.push_bind(id);
        qb.push(" RETURNING *");

        let row = qb
            .build_query_as::<BranchRow>()
            .fetch_optional(executor)
            .await
            .map_err(Self::map_unique_violation)?;

        Ok(row.map(Branch::from))
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT * FROM branches", tenant);
        qb.push(" AND id = ");
        qb.push_bind(id);

        let row = qb.build_query_as::<BranchRow>().fetch_optional(executor).await?;
        Ok(row.map(Branch::from))
    }

    /// Igual ao `find`, mas trava a linha (FOR UPDATE) até o fim da transação.
    pub async fn lock<'e, E>(&self, executor: E, tenant: TenantId, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT id FROM branches", tenant);
        qb.push(" AND id = ");
        qb.push_bind(id);
        qb.push(" FOR UPDATE");

        let found = qb.build_query_scalar::<Uuid>().fetch_optional(executor).await?;
        Ok(found.is_some())
    }

    /// Trava (FOR SHARE) as filiais informadas; retorna quantas existem no tenant.
    /// Impede que uma filial seja removida enquanto uma transferência que a cita é criada.
    pub async fn share_lock<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        ids: &[Uuid],
    ) -> Result<usize, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT id FROM branches", tenant);
        qb.push(" AND id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") FOR SHARE");

        let found = qb.build_query_scalar::<Uuid>().fetch_all(executor).await?;
        Ok(found.len())
    }

    pub async fn list<'e, E>(&self, executor: E, tenant: TenantId) -> Result<Vec<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT * FROM branches", tenant);
        qb.push(" ORDER BY name ASC");

        let rows = qb.build_query_as::<BranchRow>().fetch_all(executor).await?;
        Ok(rows.into_iter().map(Branch::from).collect())
    }

    pub async fn has_stock<'e, E>(&self, executor: E, tenant: TenantId, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT EXISTS (SELECT 1 FROM stock_entries", tenant);
        qb.push(" AND branch_id = ");
        qb.push_bind(id);
        qb.push(")");

        let exists = qb.build_query_scalar::<bool>().fetch_one(executor).await?;
        Ok(exists)
    }

    pub async fn has_active_transfers<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT EXISTS (SELECT 1 FROM transfer_requests", tenant);
        qb.push(" AND (origin_branch_id = ");
        qb.push_bind(id);
        qb.push(" OR destination_branch_id = ");
        qb.push_bind(id);
        qb.push(") AND status IN (");
        let mut separated = qb.separated(", ");
        for status in TransferStatus::ACTIVE {
            separated.push_bind(status);
        }
        separated.push_unseparated("))");

        let exists = qb.build_query_scalar::<bool>().fetch_one(executor).await?;
        Ok(exists)
    }

    pub async fn delete<'e, E>(&self, executor: E, tenant: TenantId, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("DELETE FROM branches");
        push_tenant_filter(&mut qb, tenant);
        qb.push(" AND id = ");
        qb.push_bind(id);

        qb.build().execute(executor).await?;
        Ok(())
    }

    /// Sequência completa da exclusão (quem chama fornece a transação).
    pub async fn delete_checked(
        &self,
        conn: &mut sqlx::PgConnection,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<(), AppError> {
        if !self.lock(&mut *conn, tenant, id).await? {
            return Err(AppError::NotFound(Entity::Branch));
        }
        if self.has_stock(&mut *conn, tenant, id).await? {
            return Err(AppError::PreconditionFailed(Precondition::BranchHasStock));
        }
        if self.has_active_transfers(&mut *conn, tenant, id).await? {
            return Err(AppError::PreconditionFailed(
                Precondition::BranchHasActiveTransfers,
            ));
        }
        self.delete(&mut *conn, tenant, id).await
    }
}
