pub mod auth;
pub mod branch;
pub mod stock;
pub mod tenancy;
pub mod transfer;
