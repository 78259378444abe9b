// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    // Usuário sem cargo autentica, mas não tem nenhuma permissão.
    pub role_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// Linha da tela de administração: usuário + nome do cargo resolvido
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserWithRole {
    pub id: i64,
    pub username: String,
    pub role_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A identidade autenticada, mantida em memória pelo shell durante toda a
/// execução do processo. É tudo que sobrevive do login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
}

// Dados para cadastro de um novo usuário
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 1, max = 50, message = "O nome de usuário não pode ser vazio."))]
    pub username: String,

    #[validate(length(min = 1, message = "A senha não pode ser vazia."))]
    pub password: String,

    pub role_id: Option<i64>,
}

// Dados para edição: campos ausentes mantêm o valor armazenado.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, message = "A senha não pode ser vazia."))]
    pub password: Option<String>,

    pub role_id: Option<i64>,
    pub is_active: Option<bool>,
}
