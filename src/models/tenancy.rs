// src/models/tenancy.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---
// TenantId (O "Estabelecimento")
// ---
// Identificador opaco da conta. Todo o resto referencia ele e nunca muda depois de atribuído.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Tudo que é "dono" de um tenant. O store em memória usa isso para filtrar as coleções.
pub trait Tenanted {
    fn tenant_id(&self) -> TenantId;
}
