// src/db/seed.rs
//
// Carga inicial do banco: cargos, vocabulário de permissões, módulos,
// vínculos padrão e o usuário de bootstrap. Idempotente: rodar de novo
// sobre um banco já populado não muda nada.

use bcrypt::hash;
use sqlx::SqlitePool;

use crate::common::error::AppError;
use crate::models::rbac::PermissionKey;

pub async fn run(pool: &SqlitePool) -> Result<(), AppError> {
    // O hash do bootstrap é caro; só calculamos se o 'admin' ainda não existe.
    // A credencial NUNCA é persistida em texto puro.
    let admin_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM users WHERE username = 'admin')",
    )
    .fetch_one(pool)
    .await?;

    let admin_hash = if admin_exists {
        None
    } else {
        let hashed = tokio::task::spawn_blocking(|| hash("admin123", bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {e}"))??;
        Some(hashed)
    };

    let mut tx = pool.begin().await?;

    for (name, description) in [
        ("admin", "Acesso total ao sistema"),
        ("manager", "Gestão da loja"),
        ("cashier", "Operação básica de caixa"),
    ] {
        sqlx::query("INSERT OR IGNORE INTO roles (name, description) VALUES (?, ?)")
            .bind(name)
            .bind(description)
            .execute(&mut *tx)
            .await?;
    }

    // O vocabulário fechado de 17 chaves "recurso_acao"
    for key in PermissionKey::ALL {
        sqlx::query("INSERT OR IGNORE INTO permissions (key) VALUES (?)")
            .bind(key.as_key())
            .execute(&mut *tx)
            .await?;
    }

    // Módulos na ordem de navegação; permissão exigida nula = sempre visível
    let modules: [(&str, Option<&str>); 5] = [
        ("home", None),
        ("cashier", Some("sales_write")),
        ("inventory", Some("inventory_read")),
        ("reports", Some("reports_read")),
        ("settings", Some("settings_read")),
    ];
    for (name, required_key) in modules {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO modules (name, required_permission_id)
            VALUES (?, (SELECT id FROM permissions WHERE key = ?))
            "#,
        )
        .bind(name)
        .bind(required_key)
        .execute(&mut *tx)
        .await?;
    }

    // Vínculos padrão cargo -> permissões
    let grants: [(&str, &[PermissionKey]); 3] = [
        ("admin", &PermissionKey::ALL),
        (
            "manager",
            &[
                PermissionKey::InventoryRead,
                PermissionKey::InventoryWrite,
                PermissionKey::InventoryUpdate,
                PermissionKey::SalesRead,
                PermissionKey::SalesWrite,
                PermissionKey::SalesUpdate,
                PermissionKey::ReportsRead,
            ],
        ),
        ("cashier", &[PermissionKey::SalesRead, PermissionKey::SalesWrite]),
    ];
    for (role_name, keys) in grants {
        for key in keys {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO role_permissions (role_id, permission_id)
                SELECT r.id, p.id FROM roles r, permissions p
                WHERE r.name = ? AND p.key = ?
                "#,
            )
            .bind(role_name)
            .bind(key.as_key())
            .execute(&mut *tx)
            .await?;
        }
    }

    if let Some(hashed) = admin_hash {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (username, password_hash, role_id, is_active, created_at)
            VALUES ('admin', ?, (SELECT id FROM roles WHERE name = 'admin'), 1, ?)
            "#,
        )
        .bind(hashed)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await?;
        tracing::info!("👤 Usuário 'admin' inicial criado. Troque a senha padrão no primeiro acesso.");
    }

    tx.commit().await?;
    Ok(())
}
