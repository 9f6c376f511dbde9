pub mod branch_service;
pub use branch_service::{BranchService, CreateBranch};
pub mod stock_service;
pub use stock_service::StockService;
pub mod transfer_service;
pub use transfer_service::{CreateTransfer, TransferService};
pub mod transfer_query;
pub use transfer_query::TransferQuery;
pub mod identity;
pub use identity::{CallerContext, IdentityService};
