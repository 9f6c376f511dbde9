// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Estrutura de dados ("claims") dentro do JWT.
// O token é emitido pelo provedor de identidade externo; aqui só validamos e lemos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,          // Subject (ID do usuário)
    pub tenants: Vec<Uuid>, // Lojas (tenants) às quais o usuário pertence
    pub exp: usize,         // Expiration time (quando o token expira)
    pub iat: usize,         // Issued At (quando o token foi criado)
}
