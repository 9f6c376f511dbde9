// src/db/transfer_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{push_tenant_filter, scoped_select},
        error::AppError,
    },
    models::{
        tenancy::TenantId,
        transfer::{NewTransfer, TransferFilter, TransferRequest, Transition},
    },
};

#[derive(Clone, Default)]
pub struct TransferRepository;

// Filtros opcionais do histórico (depois do WHERE tenant_id)
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TransferFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    if let Some(branch_id) = filter.branch_id {
        qb.push(" AND (origin_branch_id = ");
        qb.push_bind(branch_id);
        qb.push(" OR destination_branch_id = ");
        qb.push_bind(branch_id);
        qb.push(")");
    }
    if let Some(origin) = filter.origin_branch_id {
        qb.push(" AND origin_branch_id = ");
        qb.push_bind(origin);
    }
    if let Some(destination) = filter.destination_branch_id {
        qb.push(" AND destination_branch_id = ");
        qb.push_bind(destination);
    }
    if let Some(product_id) = filter.product_id {
        qb.push(" AND product_id = ");
        qb.push_bind(product_id);
    }
    if let Some(from) = filter.from {
        qb.push(" AND requested_at >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND requested_at <= ");
        qb.push_bind(to);
    }
}

impl TransferRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        new: &NewTransfer,
    ) -> Result<TransferRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // O status inicial (solicitada/aprovada) já vem decidido: uma única escrita.
        let transfer = sqlx::query_as::<_, TransferRequest>(
            r#"
            INSERT INTO transfer_requests (
                tenant_id, origin_branch_id, destination_branch_id, product_id,
                quantity, lot, status, requested_by, approved_by,
                requested_at, approved_at, notes, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $10)
            RETURNING *
            "#,
        )
        .bind(tenant)
        .bind(new.origin_branch_id)
        .bind(new.destination_branch_id)
        .bind(new.product_id)
        .bind(new.quantity)
        .bind(new.lot.as_deref())
        .bind(new.status)
        .bind(new.requested_by)
        .bind(new.approved_by)
        .bind(new.requested_at)
        .bind(new.approved_at)
        .bind(new.notes.as_deref())
        .fetch_one(executor)
        .await?;

        Ok(transfer)
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<TransferRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT * FROM transfer_requests", tenant);
        qb.push(" AND id = ");
        qb.push_bind(id);

        let transfer = qb
            .build_query_as::<TransferRequest>()
            .fetch_optional(executor)
            .await?;
        Ok(transfer)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        filter: &TransferFilter,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT COUNT(*) FROM transfer_requests", tenant);
        push_filters(&mut qb, filter);

        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        filter: &TransferFilter,
    ) -> Result<Vec<TransferRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT * FROM transfer_requests", tenant);
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY requested_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(filter.per_page));
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset() as i64);

        let transfers = qb
            .build_query_as::<TransferRequest>()
            .fetch_all(executor)
            .await?;
        Ok(transfers)
    }

    /// "UPDATE ... WHERE status IN (estados de origem permitidos)".
    /// A checagem do status atual e a escrita do novo acontecem num único comando;
    /// `None` significa que o pedido não existe ou não estava num estado de origem válido.
    pub async fn transition<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        id: Uuid,
        transition: &Transition,
    ) -> Result<Option<TransferRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("UPDATE transfer_requests SET status = ");
        qb.push_bind(transition.target());
        qb.push(", updated_at = ");
        qb.push_bind(transition.at());

        match transition {
            Transition::Approve { approved_by, at } => {
                qb.push(", approved_by = ");
                qb.push_bind(*approved_by);
                qb.push(", approved_at = ");
                qb.push_bind(*at);
            }
            Transition::Ship { at } => {
                qb.push(", shipped_at = ");
                qb.push_bind(*at);
            }
            Transition::Receive {
                quantity, notes, at, ..
            } => {
                qb.push(", received_at = ");
                qb.push_bind(*at);
                qb.push(", received_quantity = ");
                qb.push_bind(*quantity);
                qb.push(", notes = COALESCE(");
                qb.push_bind(notes.clone());
                qb.push(", notes)");
            }
            Transition::Cancel { reason, at } => {
                qb.push(", cancelled_at = ");
                qb.push_bind(*at);
                qb.push(", cancellation_reason = ");
                qb.push_bind(reason.clone());
            }
        }

        push_tenant_filter(&mut qb, tenant);
        qb.push(" AND id = ");
        qb.push_bind(id);
        qb.push(" AND status IN (");
        let mut separated = qb.separated(", ");
        for status in transition.allowed_from() {
            separated.push_bind(*status);
        }
        separated.push_unseparated(") RETURNING *");

        let transfer = qb
            .build_query_as::<TransferRequest>()
            .fetch_optional(executor)
            .await?;
        Ok(transfer)
    }
}
