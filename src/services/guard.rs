// src/services/guard.rs

use crate::{
    common::error::AppError,
    db::RbacRepository,
    models::{auth::Session, rbac::PermissionKey},
};

/// A verificação que antecede toda mutação administrativa: a sessão atual
/// possui a permissão exigida? Uma sessão sem cargo não possui nenhuma.
pub async fn ensure_permission(
    repo: &RbacRepository,
    session: &Session,
    key: PermissionKey,
) -> Result<(), AppError> {
    let allowed = match session.role_id {
        Some(role_id) => repo.role_has_permission(role_id, key.as_key()).await?,
        None => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::AccessDenied(format!(
            "requer a permissão '{}'",
            key.as_key()
        )))
    }
}
