// src/config.rs

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::{str::FromStr, time::Duration};

use crate::{
    db::{CatalogRepository, RbacRepository, UserRepository},
    services::{auth::AuthService, catalog_service::CatalogService, rbac_service::RbacService},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub auth_service: AuthService,
    pub rbac_service: RbacService,
    pub catalog_service: CatalogService,
}

impl AppState {
    // A URL chega explicitamente por parâmetro: nenhum componente abaixo
    // daqui lê o ambiente ou depende de estado global.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Aplicação de balcão: um processo, uma conexão local por vez.
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o grafo de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());

        let auth_service =
            AuthService::new(user_repo.clone(), rbac_repo.clone(), db_pool.clone());
        let rbac_service = RbacService::new(rbac_repo.clone(), user_repo, db_pool.clone());
        let catalog_service = CatalogService::new(catalog_repo, rbac_repo, db_pool.clone());

        Ok(Self {
            db_pool,
            auth_service,
            rbac_service,
            catalog_service,
        })
    }
}
