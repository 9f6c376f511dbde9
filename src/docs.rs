// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Filiais ---
        handlers::branches::create_branch,
        handlers::branches::list_branches,
        handlers::branches::get_branch,
        handlers::branches::update_branch,
        handlers::branches::delete_branch,

        // --- Estoque ---
        handlers::stock::list_stock,
        handlers::stock::get_stock,
        handlers::stock::assign_stock,

        // --- Transferências ---
        handlers::transfers::create_transfer,
        handlers::transfers::list_transfers,
        handlers::transfers::get_transfer,
        handlers::transfers::approve_transfer,
        handlers::transfers::ship_transfer,
        handlers::transfers::receive_transfer,
        handlers::transfers::cancel_transfer,
    ),
    components(
        schemas(
            models::branch::BranchType,
            models::branch::BranchStatus,
            models::branch::BranchConfig,
            models::branch::BranchConfigPatch,
            models::branch::Branch,

            models::stock::Product,
            models::stock::StockEntry,

            models::transfer::TransferStatus,
            models::transfer::TransferRequest,
            models::transfer::TransferPage,

            // --- Payloads ---
            handlers::branches::CreateBranchPayload,
            handlers::branches::UpdateBranchPayload,
            handlers::stock::AssignStockPayload,
            handlers::transfers::CreateTransferPayload,
            handlers::transfers::ReceiveTransferPayload,
            handlers::transfers::CancelTransferPayload,
        )
    ),
    tags(
        (name = "Branches", description = "Cadastro de Filiais e Matriz"),
        (name = "Stock", description = "Saldos de Estoque por Filial e Lote"),
        (name = "Transfers", description = "Transferências entre Filiais")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
