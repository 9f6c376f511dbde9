pub mod store;
pub use store::{BranchStore, ProductCatalog, StockStore, Store, TransferStore};

pub mod branch_repo;
pub use branch_repo::BranchRepository;
pub mod stock_repo;
pub use stock_repo::StockRepository;
pub mod transfer_repo;
pub use transfer_repo::TransferRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;

pub mod postgres;
pub use postgres::PgStore;
pub mod memory;
pub use memory::MemoryStore;
