#![allow(dead_code)]

use std::sync::Arc;

use farmacia_transferencias::{
    config::AppState,
    db::{MemoryStore, Store},
    models::{
        branch::{Branch, BranchConfig, BranchType},
        stock::{Product, ProductDefaults, StockEntry, StockKey},
        tenancy::TenantId,
    },
    services::CreateBranch,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

pub const JWT_SECRET: &str = "segredo-de-teste-com-32-caracteres!!";

// CNPJs com dígitos verificadores válidos
pub const CNPJS: [&str; 6] = [
    "11222333000181",
    "11444777000161",
    "11222333000262",
    "22333444000181",
    "33444555000181",
    "44555666000181",
];

pub fn no_approval() -> BranchConfig {
    BranchConfig {
        requires_approval: false,
        ..BranchConfig::default()
    }
}

/// Store em memória + serviços montados como no start-up, com um tenant e um produto prontos.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub tenant: TenantId,
    pub user: Uuid,
    pub product: Product,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let tenant = TenantId::new(Uuid::new_v4());
        let product = store
            .seed_product(
                tenant,
                "Dipirona 500mg",
                ProductDefaults {
                    default_min: dec!(10),
                    default_max: dec!(500),
                },
            )
            .await;

        let dyn_store: Arc<dyn Store> = store.clone();
        let state = AppState::from_store(dyn_store, JWT_SECRET.to_string());

        Self {
            store,
            state,
            tenant,
            user: Uuid::new_v4(),
            product,
        }
    }

    pub fn other_tenant(&self) -> TenantId {
        TenantId::new(Uuid::new_v4())
    }

    pub async fn branch_in(
        &self,
        tenant: TenantId,
        cnpj: &str,
        branch_type: BranchType,
        config: BranchConfig,
    ) -> Branch {
        self.state
            .branch_service
            .create(
                tenant,
                CreateBranch {
                    name: format!("Filial {cnpj}"),
                    cnpj: cnpj.to_string(),
                    branch_type,
                    status: None,
                    config: Some(config),
                },
            )
            .await
            .expect("criar filial")
    }

    pub async fn filial(&self, cnpj: &str, config: BranchConfig) -> Branch {
        self.branch_in(self.tenant, cnpj, BranchType::Filial, config)
            .await
    }

    pub async fn put_stock(&self, branch: &Branch, lot: Option<&str>, quantity: Decimal) -> StockEntry {
        self.state
            .stock_service
            .assign(self.tenant, &self.key(branch, lot), quantity, None)
            .await
            .expect("lançar estoque")
    }

    pub fn key(&self, branch: &Branch, lot: Option<&str>) -> StockKey {
        StockKey::new(branch.id, self.product.id, lot.map(str::to_string))
    }

    pub async fn balance(&self, branch: &Branch, lot: Option<&str>) -> Option<Decimal> {
        self.state
            .stock_service
            .get(self.tenant, &self.key(branch, lot))
            .await
            .expect("consultar saldo")
            .map(|e| e.quantity_current)
    }
}
