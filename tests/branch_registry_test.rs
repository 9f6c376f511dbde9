mod common;

use common::{no_approval, Fixture, CNPJS};
use farmacia_transferencias::{
    common::error::{AppError, ConflictKind, Entity, Precondition},
    models::branch::{BranchChanges, BranchConfig, BranchConfigPatch, BranchStatus, BranchType},
    services::{CreateBranch, CreateTransfer},
};
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn one_matriz_per_tenant_independently_of_other_tenants() {
    let fx = Fixture::new().await;
    let other = fx.other_tenant();

    fx.branch_in(fx.tenant, CNPJS[0], BranchType::Matriz, BranchConfig::default())
        .await;
    // Outro tenant tem a sua própria matriz (e pode repetir o CNPJ)
    fx.branch_in(other, CNPJS[0], BranchType::Matriz, BranchConfig::default())
        .await;

    let second = fx
        .state
        .branch_service
        .create(
            fx.tenant,
            CreateBranch {
                name: "Outra Matriz".into(),
                cnpj: CNPJS[1].into(),
                branch_type: BranchType::Matriz,
                status: None,
                config: None,
            },
        )
        .await;
    assert!(matches!(
        second,
        Err(AppError::Conflict(ConflictKind::DuplicateMatriz))
    ));

    // Promover uma filial também esbarra na regra
    let filial = fx.filial(CNPJS[2], BranchConfig::default()).await;
    let promote = fx
        .state
        .branch_service
        .update(
            fx.tenant,
            filial.id,
            BranchChanges {
                branch_type: Some(BranchType::Matriz),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        promote,
        Err(AppError::Conflict(ConflictKind::DuplicateMatriz))
    ));
}

#[tokio::test]
async fn cnpj_is_validated_normalized_and_unique() {
    let fx = Fixture::new().await;
    let service = &fx.state.branch_service;

    let branch = service
        .create(
            fx.tenant,
            CreateBranch {
                name: "  Farmácia Centro  ".into(),
                cnpj: "11.222.333/0001-81".into(),
                branch_type: BranchType::Filial,
                status: None,
                config: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(branch.cnpj, "11222333000181");
    assert_eq!(branch.name, "Farmácia Centro");
    assert_eq!(branch.status, BranchStatus::Ativa);
    assert_eq!(branch.config, BranchConfig::default());

    let duplicate = service
        .create(
            fx.tenant,
            CreateBranch {
                name: "Outra".into(),
                cnpj: "11222333000181".into(),
                branch_type: BranchType::Filial,
                status: None,
                config: None,
            },
        )
        .await;
    assert!(matches!(
        duplicate,
        Err(AppError::Conflict(ConflictKind::DuplicateCnpj))
    ));

    let invalid = service
        .create(
            fx.tenant,
            CreateBranch {
                name: "Inválida".into(),
                cnpj: "11222333000180".into(),
                branch_type: BranchType::Filial,
                status: None,
                config: None,
            },
        )
        .await;
    assert!(matches!(
        invalid,
        Err(AppError::InvalidInput { field: "cnpj", .. })
    ));
}

#[tokio::test]
async fn delete_is_blocked_by_stock_rows() {
    let fx = Fixture::new().await;
    let branch = fx.filial(CNPJS[0], BranchConfig::default()).await;
    fx.put_stock(&branch, None, dec!(1)).await;

    let result = fx.state.branch_service.delete(fx.tenant, branch.id).await;
    assert!(matches!(
        result,
        Err(AppError::PreconditionFailed(Precondition::BranchHasStock))
    ));
    assert!(fx.state.branch_service.get(fx.tenant, branch.id).await.is_ok());
}

#[tokio::test]
async fn delete_is_blocked_by_active_transfers_only() {
    let fx = Fixture::new().await;
    let origin = fx.filial(CNPJS[0], no_approval()).await;
    let destination = fx.filial(CNPJS[1], BranchConfig::default()).await;
    fx.put_stock(&origin, None, dec!(10)).await;

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
                quantity: dec!(5),
                lot: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    // Destino sem estoque, mas com transferência aprovada
    let blocked = fx.state.branch_service.delete(fx.tenant, destination.id).await;
    assert!(matches!(
        blocked,
        Err(AppError::PreconditionFailed(Precondition::BranchHasActiveTransfers))
    ));

    fx.state
        .transfer_service
        .cancel(fx.tenant, transfer.id, "Desistência")
        .await
        .unwrap();

    // Terminal não bloqueia
    fx.state
        .branch_service
        .delete(fx.tenant, destination.id)
        .await
        .unwrap();
    assert!(matches!(
        fx.state.branch_service.get(fx.tenant, destination.id).await,
        Err(AppError::NotFound(Entity::Branch))
    ));
}

#[tokio::test]
async fn inactive_branch_cannot_take_part_in_new_transfers() {
    let fx = Fixture::new().await;
    let origin = fx.filial(CNPJS[0], BranchConfig::default()).await;
    let destination = fx.filial(CNPJS[1], BranchConfig::default()).await;
    fx.put_stock(&origin, None, dec!(10)).await;

    fx.state
        .branch_service
        .update(
            fx.tenant,
            destination.id,
            BranchChanges {
                status: Some(BranchStatus::EmManutencao),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = fx
        .state
        .transfer_service
        .create(
            fx.tenant,
            fx.user,
            CreateTransfer {
                origin_branch_id: origin.id,
                destination_branch_id: destination.id,
                product_id: fx.product.id,
                quantity: dec!(5),
                lot: None,
                notes: None,
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::Conflict(ConflictKind::BranchNotActive))
    ));
}

#[tokio::test]
async fn unknown_branch_update_is_not_found() {
    let fx = Fixture::new().await;
    let result = fx
        .state
        .branch_service
        .update(fx.tenant, Uuid::new_v4(), BranchChanges::default())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(Entity::Branch))));
}

#[tokio::test]
async fn partial_config_update_keeps_the_other_flags() {
    let fx = Fixture::new().await;
    let branch = fx
        .filial(
            CNPJS[0],
            BranchConfig {
                allow_outgoing: false,
                ..BranchConfig::default()
            },
        )
        .await;

    let updated = fx
        .state
        .branch_service
        .update(
            fx.tenant,
            branch.id,
            BranchChanges {
                config: Some(BranchConfigPatch {
                    requires_approval: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(!updated.config.requires_approval);
    assert!(!updated.config.allow_outgoing);
    assert!(updated.config.allow_incoming);
    assert!(updated.config.notify_low_stock);
}
