// src/models/transfer.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    stock::{ProductDefaults, StockKey},
    tenancy::{TenantId, Tenanted},
};

// --- Estados da transferência ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "transfer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Solicitada,
    Aprovada,
    EmTransito, // Vira "em_transito"
    Concluida,
    Cancelada,
}

impl TransferStatus {
    pub const ACTIVE: [TransferStatus; 3] = [
        TransferStatus::Solicitada,
        TransferStatus::Aprovada,
        TransferStatus::EmTransito,
    ];

    /// De quais estados é permitido chegar em `target`. Esta é a tabela da máquina de estados.
    pub fn allowed_sources(target: TransferStatus) -> &'static [TransferStatus] {
        match target {
            TransferStatus::Solicitada => &[],
            TransferStatus::Aprovada => &[TransferStatus::Solicitada],
            TransferStatus::EmTransito => &[TransferStatus::Aprovada],
            TransferStatus::Concluida => &[TransferStatus::EmTransito],
            TransferStatus::Cancelada => &[TransferStatus::Solicitada, TransferStatus::Aprovada],
        }
    }

    pub fn can_transition_to(self, target: TransferStatus) -> bool {
        Self::allowed_sources(target).contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Concluida | TransferStatus::Cancelada)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Solicitada => "solicitada",
            TransferStatus::Aprovada => "aprovada",
            TransferStatus::EmTransito => "em_transito",
            TransferStatus::Concluida => "concluida",
            TransferStatus::Cancelada => "cancelada",
        }
    }
}

// --- Pedido de Transferência ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub id: Uuid,
    #[schema(value_type = Uuid)]
    pub tenant_id: TenantId,
    pub origin_branch_id: Uuid,
    pub destination_branch_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "20")]
    pub quantity: Decimal,
    #[schema(example = "L1")]
    pub lot: Option<String>,
    pub status: TransferStatus,
    pub requested_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub received_quantity: Option<Decimal>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Tenanted for TransferRequest {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl TransferRequest {
    pub fn origin_key(&self) -> StockKey {
        StockKey::new(self.origin_branch_id, self.product_id, self.lot.clone())
    }

    pub fn destination_key(&self) -> StockKey {
        StockKey::new(self.destination_branch_id, self.product_id, self.lot.clone())
    }

    pub fn involves_branch(&self, branch_id: Uuid) -> bool {
        self.origin_branch_id == branch_id || self.destination_branch_id == branch_id
    }

    /// Aplica os campos de uma transição já autorizada (status + carimbos de auditoria).
    /// Quem chama garante que o estado atual está em `transition.allowed_from()`.
    pub fn apply(&mut self, transition: &Transition) {
        self.status = transition.target();
        self.updated_at = transition.at();

        match transition {
            Transition::Approve { approved_by, at } => {
                self.approved_by = Some(*approved_by);
                self.approved_at = Some(*at);
            }
            Transition::Ship { at } => {
                self.shipped_at = Some(*at);
            }
            Transition::Receive {
                quantity, notes, at, ..
            } => {
                self.received_at = Some(*at);
                self.received_quantity = Some(*quantity);
                if let Some(notes) = notes {
                    self.notes = Some(notes.clone());
                }
            }
            Transition::Cancel { reason, at } => {
                self.cancelled_at = Some(*at);
                self.cancellation_reason = Some(reason.clone());
            }
        }
    }
}

/// Dados de inserção. O status inicial já vem decidido (solicitada ou aprovada).
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub origin_branch_id: Uuid,
    pub destination_branch_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub lot: Option<String>,
    pub status: TransferStatus,
    pub requested_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

// ---
// Transições
// ---
// Cada variante carrega tudo que o store precisa gravar numa única operação atômica
// (status + auditoria + efeito no livro-razão).
#[derive(Debug, Clone)]
pub enum Transition {
    Approve {
        approved_by: Uuid,
        at: DateTime<Utc>,
    },
    // Baixa na origem
    Ship {
        at: DateTime<Utc>,
    },
    // Entrada no destino
    Receive {
        quantity: Decimal,
        defaults: ProductDefaults,
        expiration_date: Option<NaiveDate>,
        notes: Option<String>,
        at: DateTime<Utc>,
    },
    Cancel {
        reason: String,
        at: DateTime<Utc>,
    },
}

impl Transition {
    pub fn target(&self) -> TransferStatus {
        match self {
            Transition::Approve { .. } => TransferStatus::Aprovada,
            Transition::Ship { .. } => TransferStatus::EmTransito,
            Transition::Receive { .. } => TransferStatus::Concluida,
            Transition::Cancel { .. } => TransferStatus::Cancelada,
        }
    }

    pub fn allowed_from(&self) -> &'static [TransferStatus] {
        TransferStatus::allowed_sources(self.target())
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Transition::Approve { at, .. }
            | Transition::Ship { at }
            | Transition::Receive { at, .. }
            | Transition::Cancel { at, .. } => *at,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::Approve { .. } => "approve",
            Transition::Ship { .. } => "start_transit",
            Transition::Receive { .. } => "confirm_receipt",
            Transition::Cancel { .. } => "cancel",
        }
    }
}

// ---
// Consulta (histórico)
// ---
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    pub status: Option<TransferStatus>,
    pub branch_id: Option<Uuid>, // Origem OU destino
    pub origin_branch_id: Option<Uuid>,
    pub destination_branch_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: u32,
    pub per_page: u32,
}

impl TransferFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn matches(&self, transfer: &TransferRequest) -> bool {
        self.status.is_none_or(|s| transfer.status == s)
            && self.branch_id.is_none_or(|b| transfer.involves_branch(b))
            && self
                .origin_branch_id
                .is_none_or(|b| transfer.origin_branch_id == b)
            && self
                .destination_branch_id
                .is_none_or(|b| transfer.destination_branch_id == b)
            && self.product_id.is_none_or(|p| transfer.product_id == p)
            && self.from.is_none_or(|from| transfer.requested_at >= from)
            && self.to.is_none_or(|to| transfer.requested_at <= to)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferPage {
    pub items: Vec<TransferRequest>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransferStatus::*;

    const ALL: [TransferStatus; 5] = [Solicitada, Aprovada, EmTransito, Concluida, Cancelada];

    #[test]
    fn only_the_documented_transitions_are_legal() {
        let legal = [
            (Solicitada, Aprovada),
            (Aprovada, EmTransito),
            (EmTransito, Concluida),
            (Solicitada, Cancelada),
            (Aprovada, Cancelada),
        ];

        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for from in [Concluida, Cancelada] {
            assert!(from.is_terminal());
            assert!(ALL.iter().all(|to| !from.can_transition_to(*to)));
        }
        assert!(TransferStatus::ACTIVE.iter().all(|s| !s.is_terminal()));
    }

    #[test]
    fn cancel_is_not_offered_after_shipment() {
        let cancel = Transition::Cancel {
            reason: "x".into(),
            at: Utc::now(),
        };
        assert!(!cancel.allowed_from().contains(&EmTransito));
    }

    #[test]
    fn filter_offset_uses_one_based_pages() {
        let filter = TransferFilter {
            page: 3,
            per_page: 20,
            ..Default::default()
        };
        assert_eq!(filter.offset(), 40);
    }

    #[test]
    fn status_wire_name_matches_database_label() {
        for status in ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
