// src/db/rbac_repo.rs

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::common::error::AppError;
use crate::models::rbac::{Module, Permission, Role};

#[derive(Clone)]
pub struct RbacRepository {
    pool: SqlitePool,
}

impl RbacRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ---
    // Cargos
    // ---

    pub async fn create_role<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name, description) VALUES (?, ?) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateRoleName;
                }
            }
            e.into()
        })
    }

    pub async fn update_role<'e, E>(
        &self,
        executor: E,
        role_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Role>(
            "UPDATE roles SET name = ?, description = ? WHERE id = ? RETURNING *",
        )
        .bind(name)
        .bind(description)
        .bind(role_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateRoleName;
                }
            }
            AppError::from(e)
        })?
        .ok_or(AppError::NotFound("cargo"))
    }

    pub async fn delete_role<'e, E>(&self, executor: E, role_id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(role_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("cargo"));
        }
        Ok(())
    }

    pub async fn find_role(&self, role_id: i64) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ?")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    // ---
    // Permissões e vínculos cargo <-> permissão
    // ---

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let permissions =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(permissions)
    }

    pub async fn find_permission(&self, permission_id: i64) -> Result<Option<Permission>, AppError> {
        let permission =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = ?")
                .bind(permission_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(permission)
    }

    // Resolve uma chave ("sales_write") para a linha da permissão
    pub async fn find_permission_by_key<'e, E>(
        &self,
        executor: E,
        key: &str,
    ) -> Result<Option<Permission>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let permission =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE key = ?")
                .bind(key)
                .fetch_optional(executor)
                .await?;
        Ok(permission)
    }

    // Vincula Cargo <-> Permissão (uma linha por chamada; o serviço itera
    // dentro da transação)
    pub async fn assign_permission<'e, E>(
        &self,
        executor: E,
        role_id: i64,
        permission_id: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?, ?)",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    // Remove todos os vínculos do cargo. Usado na troca total do conjunto de
    // permissões e antes de apagar o cargo (não há ON DELETE CASCADE).
    pub async fn clear_role_permissions<'e, E>(
        &self,
        executor: E,
        role_id: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn role_permission_keys(&self, role_id: i64) -> Result<Vec<String>, AppError> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.key
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ?
            ORDER BY p.id
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    /// O predicado central de autorização: o cargo possui a permissão com
    /// essa chave? Todo caminho controlado por acesso passa por aqui.
    pub async fn role_has_permission(&self, role_id: i64, key: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM role_permissions rp
                JOIN permissions p ON p.id = rp.permission_id
                WHERE rp.role_id = ? AND p.key = ?
            )
            "#,
        )
        .bind(role_id)
        .bind(key)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn delete_permission<'e, E>(
        &self,
        executor: E,
        permission_id: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM permissions WHERE id = ?")
            .bind(permission_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("permissão"));
        }
        Ok(())
    }

    // Guardas referenciais do delete de permissão: vínculos com cargos e
    // módulos que a exigem
    pub async fn count_grants_of_permission(&self, permission_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM role_permissions WHERE permission_id = ?",
        )
        .bind(permission_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_modules_requiring(&self, permission_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM modules WHERE required_permission_id = ?",
        )
        .bind(permission_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // ---
    // Módulos
    // ---

    pub async fn list_modules(&self) -> Result<Vec<Module>, AppError> {
        let modules = sqlx::query_as::<_, Module>("SELECT * FROM modules ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(modules)
    }

    // Módulos que a sessão pode ver: ativos e sem permissão exigida, ou cuja
    // permissão exigida o cargo possui. A ordem de inserção mantém o layout
    // da navegação estável.
    pub async fn visible_modules(&self, role_id: Option<i64>) -> Result<Vec<Module>, AppError> {
        let modules = sqlx::query_as::<_, Module>(
            r#"
            SELECT m.id, m.name, m.is_active, m.required_permission_id
            FROM modules m
            WHERE m.is_active = 1
              AND (
                m.required_permission_id IS NULL
                OR EXISTS (
                    SELECT 1 FROM role_permissions rp
                    WHERE rp.role_id = ?
                      AND rp.permission_id = m.required_permission_id
                )
              )
            ORDER BY m.id
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(modules)
    }

    pub async fn set_module_active<'e, E>(
        &self,
        executor: E,
        module_id: i64,
        active: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE modules SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(module_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("módulo"));
        }
        Ok(())
    }

    pub async fn set_module_required_permission<'e, E>(
        &self,
        executor: E,
        module_id: i64,
        permission_id: Option<i64>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE modules SET required_permission_id = ? WHERE id = ?")
            .bind(permission_id)
            .bind(module_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("módulo"));
        }
        Ok(())
    }
}
