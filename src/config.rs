// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{MemoryStore, PgStore, Store},
    services::{BranchService, IdentityService, StockService, TransferQuery, TransferService},
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

// Configuração lida do ambiente (.env incluso)
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{name} inválida: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_var("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityService,
    pub branch_service: BranchService,
    pub stock_service: StockService,
    pub transfer_service: TransferService,
    pub transfer_query: TransferQuery,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = match &settings.database_url {
            Some(database_url) => {
                let db_pool = PgPoolOptions::new()
                    .max_connections(settings.db_max_connections)
                    .acquire_timeout(settings.db_acquire_timeout)
                    .connect(database_url)
                    .await
                    .inspect_err(|e| {
                        tracing::error!("🔥 Falha ao conectar ao banco de dados: {:?}", e)
                    })?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!().run(&db_pool).await?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Arc::new(PgStore::new(db_pool))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL não definida: usando store em memória");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::from_store(store, settings.jwt_secret.clone()))
    }

    /// Monta o gráfico de dependências sobre um store já construído.
    pub fn from_store(store: Arc<dyn Store>, jwt_secret: String) -> Self {
        Self {
            identity: IdentityService::new(jwt_secret),
            branch_service: BranchService::new(store.clone()),
            stock_service: StockService::new(store.clone()),
            transfer_service: TransferService::new(store.clone()),
            transfer_query: TransferQuery::new(store),
        }
    }
}
