mod common;

use common::{no_approval, Fixture, CNPJS};
use farmacia_transferencias::{
    common::error::{AppError, Entity},
    models::{branch::BranchConfig, transfer::TransferFilter},
    services::CreateTransfer,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

// Uma entidade de outro tenant é indistinguível de uma inexistente.
#[tokio::test]
async fn foreign_entities_look_exactly_like_missing_ones() {
    let fx = Fixture::new().await;
    let intruder = fx.other_tenant();
    let origin = fx.filial(CNPJS[0], no_approval()).await;
    let destination = fx.filial(CNPJS[1], BranchConfig::default()).await;
    fx.put_stock(&origin, None, dec!(50)).await;

    let transfer = fx
        .state
        .transfer_service
        .create(
            fx.tenant,
            fx.user,
            CreateTransfer {
                origin_branch_id: origin.id,
                destination_branch_id: destination.id,
                product_id: fx.product.id,
                quantity: dec!(10),
                lot: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    // Leitura
    let foreign = fx.state.transfer_query.get(intruder, transfer.id).await;
    let missing = fx.state.transfer_query.get(intruder, Uuid::new_v4()).await;
    assert!(matches!(foreign, Err(AppError::NotFound(Entity::Transfer))));
    assert!(matches!(missing, Err(AppError::NotFound(Entity::Transfer))));

    assert!(matches!(
        fx.state.branch_service.get(intruder, origin.id).await,
        Err(AppError::NotFound(Entity::Branch))
    ));
    assert!(
        fx.state
            .stock_service
            .get(intruder, &fx.key(&origin, None))
            .await
            .unwrap()
            .is_none()
    );

    // Escrita
    assert!(matches!(
        fx.state.transfer_service.start_transit(intruder, transfer.id).await,
        Err(AppError::NotFound(Entity::Transfer))
    ));
    assert!(matches!(
        fx.state.transfer_service.cancel(intruder, transfer.id, "x").await,
        Err(AppError::NotFound(Entity::Transfer))
    ));
    assert!(matches!(
        fx.state.branch_service.delete(intruder, origin.id).await,
        Err(AppError::NotFound(Entity::Branch))
    ));

    // Listagens
    assert!(fx.state.branch_service.list(intruder).await.unwrap().is_empty());
    let page = fx
        .state
        .transfer_query
        .list(
            intruder,
            TransferFilter {
                page: 1,
                per_page: 20,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 0);

    // Nada mudou para o dono
    let own = fx.state.transfer_query.get(fx.tenant, transfer.id).await.unwrap();
    assert_eq!(own.status, transfer.status);
    assert_eq!(fx.balance(&origin, None).await, Some(dec!(50)));
}

#[tokio::test]
async fn transfer_between_tenants_is_impossible() {
    let fx = Fixture::new().await;
    let other = fx.other_tenant();
    let origin = fx.filial(CNPJS[0], no_approval()).await;
    let foreign_destination = fx
        .branch_in(
            other,
            CNPJS[1],
            farmacia_transferencias::models::branch::BranchType::Filial,
            BranchConfig::default(),
        )
        .await;
    fx.put_stock(&origin, None, dec!(50)).await;

    let result = fx
        .state
        .transfer_service
        .create(
            fx.tenant,
            fx.user,
            CreateTransfer {
                origin_branch_id: origin.id,
                destination_branch_id: foreign_destination.id,
                product_id: fx.product.id,
                quantity: dec!(10),
                lot: None,
                notes: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(Entity::Branch))));
}
