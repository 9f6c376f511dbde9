// src/models/stock.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::tenancy::{TenantId, Tenanted};

// --- Produto (catálogo externo) ---
// Só o que o núcleo de transferências precisa: os limites padrão de um saldo novo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(value_type = Uuid)]
    pub tenant_id: TenantId,
    #[schema(example = "Dipirona 500mg")]
    pub name: String,
    #[schema(example = "10")]
    pub default_min: Decimal,
    #[schema(example = "500")]
    pub default_max: Decimal,
}

impl Tenanted for Product {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl Product {
    pub fn defaults(&self) -> ProductDefaults {
        ProductDefaults {
            default_min: self.default_min,
            default_max: self.default_max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductDefaults {
    pub default_min: Decimal,
    pub default_max: Decimal,
}

// --- Chave do saldo: (filial, produto, lote) dentro de um tenant ---
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StockKey {
    pub branch_id: Uuid,
    pub product_id: Uuid,
    pub lot: Option<String>,
}

impl StockKey {
    /// O lote é normalizado aqui: sem espaços nas pontas, e lote em branco é "sem lote".
    pub fn new(branch_id: Uuid, product_id: Uuid, lot: Option<String>) -> Self {
        Self {
            branch_id,
            product_id,
            lot: normalize_lot(lot),
        }
    }
}

fn normalize_lot(lot: Option<String>) -> Option<String> {
    lot.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
}

// --- Saldo de Estoque (linha do livro-razão) ---
// Representa a tabela 'stock_entries'. quantity_current nunca fica negativo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockEntry {
    pub id: Uuid,
    #[schema(value_type = Uuid)]
    pub tenant_id: TenantId,
    pub branch_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "L1")]
    pub lot: Option<String>,
    #[schema(example = "100")]
    pub quantity_current: Decimal,
    pub quantity_min: Decimal,
    pub quantity_max: Decimal,
    pub expiration_date: Option<NaiveDate>, // Data simples (Dia/Mês/Ano)
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenanted for StockEntry {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl StockEntry {
    pub fn matches(&self, key: &StockKey) -> bool {
        self.branch_id == key.branch_id && self.product_id == key.product_id && self.lot == key.lot
    }
}
