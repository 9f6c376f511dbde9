// src/db/stock_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{push_tenant_filter, scoped_select},
        error::AppError,
    },
    models::{
        stock::{ProductDefaults, StockEntry, StockKey},
        tenancy::TenantId,
    },
};

#[derive(Clone, Default)]
pub struct StockRepository;

// "AND branch_id = $ AND product_id = $ AND lot IS NOT DISTINCT FROM $"
// (lote NULL casa com NULL)
fn push_key(qb: &mut QueryBuilder<'_, Postgres>, key: &StockKey) {
    qb.push(" AND branch_id = ");
    qb.push_bind(key.branch_id);
    qb.push(" AND product_id = ");
    qb.push_bind(key.product_id);
    qb.push(" AND lot IS NOT DISTINCT FROM ");
    qb.push_bind(key.lot.clone());
}

impl StockRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        key: &StockKey,
    ) -> Result<Option<StockEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT * FROM stock_entries", tenant);
        push_key(&mut qb, key);

        let entry = qb.build_query_as::<StockEntry>().fetch_optional(executor).await?;
        Ok(entry)
    }

    pub async fn list_for_branch<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        branch_id: Uuid,
    ) -> Result<Vec<StockEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select("SELECT * FROM stock_entries", tenant);
        qb.push(" AND branch_id = ");
        qb.push_bind(branch_id);
        qb.push(" ORDER BY product_id, lot NULLS FIRST");

        let entries = qb.build_query_as::<StockEntry>().fetch_all(executor).await?;
        Ok(entries)
    }

    /// Baixa atômica: um único UPDATE condicional ("subtrai onde quantity_current >= qty").
    /// Retorna `None` se a condição falhou (linha inexistente ou saldo insuficiente).
    pub async fn try_decrement<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
    ) -> Result<Option<StockEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("UPDATE stock_entries SET quantity_current = quantity_current - ");
        qb.push_bind(quantity);
        qb.push(", updated_at = NOW()");
        push_tenant_filter(&mut qb, tenant);
        push_key(&mut qb, key);
        qb.push(" AND quantity_current >= ");
        qb.push_bind(quantity);
        qb.push(" RETURNING *");

        let entry = qb.build_query_as::<StockEntry>().fetch_optional(executor).await?;
        Ok(entry)
    }

    /// Entrada atômica: UPSERT.
    /// Tenta INSERIR. Se já existir (ON CONFLICT), ele SOMA na quantidade existente.
    /// Os limites (min/max) e a validade só valem na criação.
    pub async fn increment<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        key: &StockKey,
        quantity: Decimal,
        defaults: ProductDefaults,
        expiration_date: Option<NaiveDate>,
    ) -> Result<StockEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, StockEntry>(
            r#"
            INSERT INTO stock_entries (
                tenant_id, branch_id, product_id, lot,
                quantity_current, quantity_min, quantity_max, expiration_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (tenant_id, branch_id, product_id, lot_key)
            DO UPDATE SET
                quantity_current = stock_entries.quantity_current + EXCLUDED.quantity_current,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant)
        .bind(key.branch_id)
        .bind(key.product_id)
        .bind(key.lot.as_deref())
        .bind(quantity)
        .bind(defaults.default_min)
        .bind(defaults.default_max)
        .bind(expiration_date)
        .fetch_one(executor)
        .await?;

        Ok(entry)
    }
}
