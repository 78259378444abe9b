// src/models/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

// Uma venda registrada no livro. Linhas são apenas acrescentadas; o fluxo
// normal nunca atualiza nem apaga uma venda.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SaleTransaction {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub total: f64,
    pub timestamp: DateTime<Utc>,
}

// Linha do relatório de vendas: venda + nome do produto resolvido
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SaleWithProduct {
    pub id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub total: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordSalePayload {
    pub product_id: i64,

    #[validate(range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, max = 80, message = "O nome do produto não pode ser vazio."))]
    pub name: String,

    #[validate(range(min = 0.0, message = "O preço não pode ser negativo."))]
    pub price: f64,
}
