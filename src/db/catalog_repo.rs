// src/db/catalog_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::catalog::{Product, SaleTransaction, SaleWithProduct},
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        name: &str,
        price: f64,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (name, price) VALUES (?, ?) RETURNING *",
        )
        .bind(name)
        .bind(price)
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn find_product<'e, E>(
        &self,
        executor: E,
        product_id: i64,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    // O livro de vendas só recebe inserções; nada atualiza ou apaga aqui.
    pub async fn insert_sale<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        quantity: i64,
        total: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<SaleTransaction, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sale = sqlx::query_as::<_, SaleTransaction>(
            r#"
            INSERT INTO transactions (product_id, quantity, total, timestamp)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(total)
        .bind(timestamp)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    // Total acumulado de todas as vendas registradas
    pub async fn sales_total(&self) -> Result<f64, AppError> {
        let total =
            sqlx::query_scalar::<_, f64>("SELECT COALESCE(SUM(total), 0.0) FROM transactions")
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    pub async fn recent_sales(&self, limit: i64) -> Result<Vec<SaleWithProduct>, AppError> {
        let sales = sqlx::query_as::<_, SaleWithProduct>(
            r#"
            SELECT t.id, p.name AS product_name, t.quantity, t.total, t.timestamp
            FROM transactions t
            JOIN products p ON p.id = t.product_id
            ORDER BY t.id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }
}
