// src/services/catalog_service.rs

use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, RbacRepository},
    models::{
        auth::Session,
        catalog::{CreateProductPayload, Product, RecordSalePayload, SaleTransaction, SaleWithProduct},
        rbac::PermissionKey,
    },
    services::guard,
};

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
    rbac_repo: RbacRepository,
    pool: SqlitePool,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository, rbac_repo: RbacRepository, pool: SqlitePool) -> Self {
        Self {
            repo,
            rbac_repo,
            pool,
        }
    }

    pub async fn create_product(
        &self,
        acting: &Session,
        payload: CreateProductPayload,
    ) -> Result<Product, AppError> {
        guard::ensure_permission(&self.rbac_repo, acting, PermissionKey::InventoryWrite).await?;
        payload.validate()?;

        self.repo
            .create_product(&self.pool, &payload.name, payload.price)
            .await
    }

    // Sem guarda: a tela do caixa precisa do catálogo para montar a venda, e
    // o acesso à tela em si já é controlado pelo módulo.
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.repo.list_products().await
    }

    /// Registra uma venda no livro. O total é sempre preço x quantidade,
    /// calculado aqui a partir do preço vigente do produto.
    pub async fn record_sale(
        &self,
        acting: &Session,
        payload: RecordSalePayload,
    ) -> Result<SaleTransaction, AppError> {
        guard::ensure_permission(&self.rbac_repo, acting, PermissionKey::SalesWrite).await?;
        payload.validate()?;

        let mut tx = self.pool.begin().await?;

        let product = self
            .repo
            .find_product(&mut *tx, payload.product_id)
            .await?
            .ok_or(AppError::NotFound("produto"))?;

        let total = product.price * payload.quantity as f64;
        let sale = self
            .repo
            .insert_sale(&mut *tx, product.id, payload.quantity, total, Utc::now())
            .await?;

        tx.commit().await?;
        Ok(sale)
    }

    /// Total acumulado do livro de vendas
    pub async fn sales_total(&self, acting: &Session) -> Result<f64, AppError> {
        guard::ensure_permission(&self.rbac_repo, acting, PermissionKey::SalesRead).await?;
        self.repo.sales_total().await
    }

    pub async fn recent_sales(
        &self,
        acting: &Session,
        limit: i64,
    ) -> Result<Vec<SaleWithProduct>, AppError> {
        guard::ensure_permission(&self.rbac_repo, acting, PermissionKey::ReportsRead).await?;
        self.repo.recent_sales(limit).await
    }
}
