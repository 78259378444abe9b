// src/db/user_repo.rs

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::auth::{User, UserWithRole},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo nome exato, ativo ou não (telas de administração)
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Busca usada pelo login: só enxerga contas ativas. Uma conta desativada
    // é indistinguível de uma conta inexistente para quem chama.
    pub async fn find_active_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ? AND is_active = 1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    // Cria um novo usuário. A senha já chega aqui como hash.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        username: &str,
        password_hash: &str,
        role_id: Option<i64>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, role_id, is_active, created_at)
            VALUES (?, ?, ?, 1, ?)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role_id)
        .bind(chrono::Utc::now())
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateUsername;
                }
            }
            e.into()
        })
    }

    // Regrava os campos mutáveis do usuário. O serviço já resolveu os valores
    // finais (senha re-hasheada ou mantida, etc).
    pub async fn update_user<'e, E>(
        &self,
        executor: E,
        user_id: i64,
        password_hash: &str,
        role_id: Option<i64>,
        is_active: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, role_id = ?, is_active = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(role_id)
        .bind(is_active)
        .bind(user_id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("usuário"));
        }
        Ok(())
    }

    pub async fn delete_user<'e, E>(&self, executor: E, username: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("usuário"));
        }
        Ok(())
    }

    // Listagem da tela de administração, com o nome do cargo já resolvido
    pub async fn list_with_roles(&self) -> Result<Vec<UserWithRole>, AppError> {
        let users = sqlx::query_as::<_, UserWithRole>(
            r#"
            SELECT u.id, u.username, r.name AS role_name, u.is_active, u.created_at
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            ORDER BY u.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    // Quantos usuários ainda apontam para o cargo (guarda referencial do delete)
    pub async fn count_by_role(&self, role_id: i64) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role_id = ?")
                .bind(role_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
