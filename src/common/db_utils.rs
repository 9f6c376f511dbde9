use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::{common::error::AppError, models::tenancy::TenantId};

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define `app.tenant_id` (local à transação) para as políticas RLS.
pub(crate) async fn begin_tenant_tx(
    pool: &PgPool,
    tenant: TenantId,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
        .bind(tenant.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

// ---
// Ponto único de escopo por tenant
// ---
// Toda query de leitura/escrita em tabelas de tenant passa por aqui.
// Uma linha de outro tenant simplesmente não casa: para o chamador, "não existe".

/// `SELECT ... FROM tabela WHERE tenant_id = $n`
pub(crate) fn scoped_select<'a>(head: &str, tenant: TenantId) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(head);
    push_tenant_filter(&mut qb, tenant);
    qb
}

/// Anexa o `WHERE tenant_id = $n` a um builder já montado (UPDATE ... SET ..., DELETE ...).
pub(crate) fn push_tenant_filter(qb: &mut QueryBuilder<'_, Postgres>, tenant: TenantId) {
    qb.push(" WHERE tenant_id = ");
    qb.push_bind(tenant);
}
