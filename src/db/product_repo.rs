// src/db/product_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::scoped_select, error::AppError},
    models::{stock::Product, tenancy::TenantId},
};

// Leitura do catálogo de produtos (mantido por outro módulo do sistema).
#[derive(Clone, Default)]
pub struct ProductRepository;

impl ProductRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = scoped_select(
            "SELECT id, tenant_id, name, default_min, default_max FROM products",
            tenant,
        );
        qb.push(" AND id = ");
        qb.push_bind(id);

        let product = qb.build_query_as::<Product>().fetch_optional(executor).await?;
        Ok(product)
    }
}
