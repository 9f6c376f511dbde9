// src/models/branch.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::tenancy::{TenantId, Tenanted};

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "branch_type", rename_all = "snake_case")] // Banco
#[serde(rename_all = "snake_case")] // JSON
pub enum BranchType {
    Matriz, // Vira "matriz" (só uma por tenant)
    Filial, // Vira "filial"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "branch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Ativa,
    Inativa,
    EmManutencao, // Vira "em_manutencao"
}

// ---
// Configuração de transferência da filial
// ---
// Estrutura fechada: chaves desconhecidas no JSON são rejeitadas.
// Campos ausentes assumem o padrão abaixo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct BranchConfig {
    #[schema(example = true)]
    pub allow_incoming: bool,
    #[schema(example = true)]
    pub allow_outgoing: bool,
    #[schema(example = true)]
    pub requires_approval: bool,
    #[schema(example = true)]
    pub notify_low_stock: bool,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            allow_incoming: true,
            allow_outgoing: true,
            requires_approval: true,
            notify_low_stock: true,
        }
    }
}

// Atualização parcial da configuração: só as chaves enviadas mudam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BranchConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_incoming: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_outgoing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_low_stock: Option<bool>,
}

impl BranchConfigPatch {
    pub fn apply(self, base: BranchConfig) -> BranchConfig {
        BranchConfig {
            allow_incoming: self.allow_incoming.unwrap_or(base.allow_incoming),
            allow_outgoing: self.allow_outgoing.unwrap_or(base.allow_outgoing),
            requires_approval: self.requires_approval.unwrap_or(base.requires_approval),
            notify_low_stock: self.notify_low_stock.unwrap_or(base.notify_low_stock),
        }
    }
}

// --- Filial / Matriz ---
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(value_type = Uuid)]
    pub tenant_id: TenantId,
    #[schema(example = "Drogaria Centro")]
    pub name: String,
    #[schema(example = "11222333000181")]
    pub cnpj: String,
    #[serde(rename = "type")]
    pub branch_type: BranchType,
    pub status: BranchStatus,
    pub config: BranchConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenanted for Branch {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl Branch {
    pub fn is_active(&self) -> bool {
        self.status == BranchStatus::Ativa
    }
}

// Linha crua da tabela 'branches' (o config vem como JSONB).
#[derive(Debug, FromRow)]
pub struct BranchRow {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub cnpj: String,
    pub branch_type: BranchType,
    pub status: BranchStatus,
    pub config: Json<BranchConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BranchRow> for Branch {
    fn from(row: BranchRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            cnpj: row.cnpj,
            branch_type: row.branch_type,
            status: row.status,
            config: row.config.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Dados de criação, já normalizados pelo serviço.
#[derive(Debug, Clone)]
pub struct NewBranch {
    pub name: String,
    pub cnpj: String,
    pub branch_type: BranchType,
    pub status: BranchStatus,
    pub config: BranchConfig,
}

/// Alteração parcial: `None` mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct BranchChanges {
    pub name: Option<String>,
    pub cnpj: Option<String>,
    pub branch_type: Option<BranchType>,
    pub status: Option<BranchStatus>,
    pub config: Option<BranchConfigPatch>,
}

// ---
// CNPJ
// ---

/// Remove a pontuação e confere os dois dígitos verificadores.
/// Retorna os 14 dígitos ou `None` se o CNPJ for inválido.
pub fn normalize_cnpj(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, '.' | '/' | '-' | ' '))
        .collect();

    if digits.len() != 14 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();

    // "00000000000000" e afins passam no cálculo, mas não são CNPJs reais
    if values.iter().all(|d| *d == values[0]) {
        return None;
    }

    let first = cnpj_check_digit(&values[..12]);
    let second = cnpj_check_digit(&values[..13]);

    if values[12] == first && values[13] == second {
        Some(digits)
    } else {
        None
    }
}

fn cnpj_check_digit(base: &[u32]) -> u32 {
    // Pesos: 2..9 da direita para a esquerda, recomeçando
    let sum: u32 = base
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| d * (2 + (i as u32 % 8)))
        .sum();

    match sum % 11 {
        0 | 1 => 0,
        rest => 11 - rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnpj_with_punctuation_is_normalized() {
        assert_eq!(
            normalize_cnpj("11.222.333/0001-81").as_deref(),
            Some("11222333000181")
        );
        assert_eq!(normalize_cnpj("11444777000161").as_deref(), Some("11444777000161"));
    }

    #[test]
    fn cnpj_with_wrong_digits_is_rejected() {
        assert_eq!(normalize_cnpj("11.222.333/0001-82"), None);
        assert_eq!(normalize_cnpj("1122233300018"), None);
        assert_eq!(normalize_cnpj("11222333000181a"), None);
        assert_eq!(normalize_cnpj("00000000000000"), None);
    }

    #[test]
    fn config_rejects_unknown_keys() {
        let err = serde_json::from_str::<BranchConfig>(
            r#"{"allowIncoming": true, "autoShip": true}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn config_fills_missing_keys_with_defaults() {
        let config: BranchConfig =
            serde_json::from_str(r#"{"requiresApproval": false}"#).unwrap();

        assert!(!config.requires_approval);
        assert!(config.allow_incoming);
        assert!(config.allow_outgoing);
        assert!(config.notify_low_stock);
    }

    #[test]
    fn branch_type_uses_portuguese_wire_names() {
        assert_eq!(serde_json::to_string(&BranchType::Matriz).unwrap(), "\"matriz\"");
        assert_eq!(
            serde_json::to_string(&BranchStatus::EmManutencao).unwrap(),
            "\"em_manutencao\""
        );
    }

    #[test]
    fn config_patch_only_touches_sent_keys() {
        let base = BranchConfig {
            allow_outgoing: false,
            ..BranchConfig::default()
        };
        let patch: BranchConfigPatch =
            serde_json::from_str(r#"{"requiresApproval": false}"#).unwrap();
        let merged = patch.apply(base);
        assert!(!merged.requires_approval);
        assert!(!merged.allow_outgoing);
        assert_eq!(
            serde_json::to_value(patch).unwrap(),
            serde_json::json!({ "requiresApproval": false })
        );
    }
}
