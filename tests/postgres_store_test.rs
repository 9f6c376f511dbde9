// Mesmos invariantes do store em memória, agora contra o SQL de produção.
// Rodar com: DATABASE_URL=postgres://... cargo test --test postgres_store_test -- --ignored
mod common;

use std::sync::Arc;

use common::{no_approval, CNPJS, JWT_SECRET};
use farmacia_transferencias::{
    common::error::{AppError, ConflictKind},
    config::AppState,
    db::{PgStore, Store},
    models::{
        branch::{Branch, BranchConfig, BranchType},
        stock::StockKey,
        tenancy::TenantId,
        transfer::{TransferRequest, TransferStatus},
    },
    services::{CreateBranch, CreateTransfer},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

struct PgFixture {
    state: AppState,
    tenant: TenantId,
    user: Uuid,
    product: Uuid,
}

impl PgFixture {
    async fn new(pool: PgPool) -> Self {
        let tenant = TenantId::new(Uuid::new_v4());

        // Catálogo é externo: semeado direto na tabela, dentro do tenant
        let mut tx = pool.begin().await.unwrap();
        sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
            .bind(tenant.to_string())
            .execute(&mut *tx)
            .await
            .unwrap();
        let product: Uuid = sqlx::query_scalar(
            "INSERT INTO products (tenant_id, name, default_min, default_max) \
             VALUES ($1, 'Dipirona 500mg', 10, 500) RETURNING id",
        )
        .bind(tenant)
        .fetch_one(&mut *tx)
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
        Self {
            state: AppState::from_store(store, JWT_SECRET.to_string()),
            tenant,
            user: Uuid::new_v4(),
            product,
        }
    }

    async fn filial(&self, cnpj: &str, config: BranchConfig) -> Branch {
        self.state
            .branch_service
            .create(
                self.tenant,
                CreateBranch {
                    name: format!("Filial {cnpj}"),
                    cnpj: cnpj.to_string(),
                    branch_type: BranchType::Filial,
                    status: None,
                    config: Some(config),
                },
            )
            .await
            .expect("criar filial")
    }

    fn key(&self, branch: &Branch, lot: Option<&str>) -> StockKey {
        StockKey::new(branch.id, self.product, lot.map(str::to_string))
    }

    async fn put_stock(&self, branch: &Branch, lot: Option<&str>, quantity: Decimal) {
        self.state
            .stock_service
            .assign(self.tenant, &self.key(branch, lot), quantity, None)
            .await
            .expect("lançar estoque");
    }

    async fn balance(&self, branch: &Branch, lot: Option<&str>) -> Option<Decimal> {
        self.state
            .stock_service
            .get(self.tenant, &self.key(branch, lot))
            .await
            .expect("consultar saldo")
            .map(|e| e.quantity_current)
    }

    async fn transfer(&self, origin: &Branch, destination: &Branch, lot: Option<&str>) -> TransferRequest {
        self.state
            .transfer_service
            .create(
                self.tenant,
                self.user,
                CreateTransfer {
                    origin_branch_id: origin.id,
                    destination_branch_id: destination.id,
                    product_id: self.product,
                    quantity: dec!(20),
                    lot: lot.map(str::to_string),
                    notes: None,
                },
            )
            .await
            .expect("criar transferência")
    }
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn racing_start_transit_has_a_single_winner(pool: PgPool) {
    let fx = PgFixture::new(pool).await;
    let origin = fx.filial(CNPJS[0], no_approval()).await;
    let destination = fx.filial(CNPJS[1], BranchConfig::default()).await;
    fx.put_stock(&origin, None, dec!(100)).await;
    let transfer = fx.transfer(&origin, &destination, None).await;

    let mut tasks = vec![];
    for _ in 0..2 {
        let workflow = fx.state.transfer_service.clone();
        let (tenant, id) = (fx.tenant, transfer.id);
        tasks.push(tokio::spawn(async move {
            workflow.start_transit(tenant, id).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(t) => {
                assert_eq!(t.status, TransferStatus::EmTransito);
                successes += 1;
            }
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("erro inesperado: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(fx.balance(&origin, None).await, Some(dec!(80)));
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn racing_shipments_never_overdraw_the_origin(pool: PgPool) {
    let fx = PgFixture::new(pool).await;
    let origin = fx.filial(CNPJS[0], no_approval()).await;
    let destination = fx.filial(CNPJS[1], BranchConfig::default()).await;
    fx.put_stock(&origin, Some("L1"), dec!(100)).await;

    let mut ids = vec![];
    for _ in 0..10 {
        ids.push(fx.transfer(&origin, &destination, Some("L1")).await.id);
    }

    let mut tasks = vec![];
    for id in ids {
        let workflow = fx.state.transfer_service.clone();
        let tenant = fx.tenant;
        tasks.push(tokio::spawn(async move {
            workflow.start_transit(tenant, id).await
        }));
    }

    let mut shipped = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => shipped += 1,
            Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => panic!("erro inesperado: {other:?}"),
        }
    }

    assert_eq!(shipped, 5);
    assert_eq!(fx.balance(&origin, Some("L1")).await, Some(Decimal::ZERO));
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn increments_upsert_one_row_per_lot(pool: PgPool) {
    let fx = PgFixture::new(pool).await;
    let branch = fx.filial(CNPJS[0], BranchConfig::default()).await;

    fx.put_stock(&branch, Some("L1"), dec!(10)).await;
    fx.put_stock(&branch, Some("L1 "), dec!(5)).await;
    fx.put_stock(&branch, None, dec!(3)).await;
    fx.put_stock(&branch, None, dec!(4)).await;

    assert_eq!(fx.balance(&branch, Some("L1")).await, Some(dec!(15)));
    assert_eq!(fx.balance(&branch, None).await, Some(dec!(7)));

    let rows = fx
        .state
        .stock_service
        .list(fx.tenant, branch.id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn rejected_transition_leaves_status_and_stock_untouched(pool: PgPool) {
    let fx = PgFixture::new(pool).await;
    let origin = fx.filial(CNPJS[0], no_approval()).await;
    let destination = fx.filial(CNPJS[1], BranchConfig::default()).await;
    fx.put_stock(&origin, None, dec!(100)).await;
    let transfer = fx.transfer(&origin, &destination, None).await;

    fx.state
        .transfer_service
        .start_transit(fx.tenant, transfer.id)
        .await
        .unwrap();

    let cancel = fx
        .state
        .transfer_service
        .cancel(fx.tenant, transfer.id, "tarde demais")
        .await;
    assert!(matches!(
        cancel,
        Err(AppError::Conflict(ConflictKind::InvalidTransition {
            from: TransferStatus::EmTransito,
            ..
        }))
    ));

    let current = fx
        .state
        .transfer_query
        .get(fx.tenant, transfer.id)
        .await
        .unwrap();
    assert_eq!(current.status, TransferStatus::EmTransito);
    assert_eq!(fx.balance(&origin, None).await, Some(dec!(80)));
    assert_eq!(fx.balance(&destination, None).await, None);
}
