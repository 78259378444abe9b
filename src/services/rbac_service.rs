// src/services/rbac_service.rs

use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{RbacRepository, UserRepository},
    models::{
        auth::Session,
        rbac::{Module, Permission, PermissionKey, RolePayload, RoleResponse},
    },
    services::guard,
};

#[derive(Clone)]
pub struct RbacService {
    repo: RbacRepository,
    user_repo: UserRepository,
    pool: SqlitePool,
}

impl RbacService {
    pub fn new(repo: RbacRepository, user_repo: UserRepository, pool: SqlitePool) -> Self {
        Self {
            repo,
            user_repo,
            pool,
        }
    }

    /// O predicado central: o cargo (se houver) possui a permissão com essa
    /// chave? Visibilidade de módulo, navegação e mutações administrativas
    /// passam todos por aqui.
    pub async fn role_has_permission(
        &self,
        role_id: Option<i64>,
        key: &str,
    ) -> Result<bool, AppError> {
        match role_id {
            Some(role_id) => self.repo.role_has_permission(role_id, key).await,
            None => Ok(false),
        }
    }

    pub async fn create_role(
        &self,
        acting: &Session,
        payload: RolePayload,
    ) -> Result<RoleResponse, AppError> {
        guard::ensure_permission(&self.repo, acting, PermissionKey::SettingsWrite).await?;
        payload.validate()?;

        let mut tx = self.pool.begin().await?;

        let role = self
            .repo
            .create_role(&mut *tx, &payload.name, payload.description.as_deref())
            .await?;

        // Resolve as chaves para linhas reais; chave desconhecida aborta a
        // transação inteira em vez de ser descartada em silêncio.
        let mut permissions: Vec<Permission> = Vec::with_capacity(payload.permissions.len());
        for key in &payload.permissions {
            let permission = self
                .repo
                .find_permission_by_key(&mut *tx, key)
                .await?
                .ok_or_else(|| AppError::UnknownPermission(key.clone()))?;
            permissions.push(permission);
        }
        for permission in &permissions {
            self.repo
                .assign_permission(&mut *tx, role.id, permission.id)
                .await?;
        }

        tx.commit().await?;

        Ok(RoleResponse {
            role,
            permissions: permissions.into_iter().map(|p| p.key).collect(),
        })
    }

    /// Edita o cargo e troca o conjunto de permissões INTEIRO (apaga tudo e
    /// re-insere a seleção). Tudo dentro de uma transação: ou o conjunto
    /// antigo completo, ou o novo completo -- nunca um estado parcial.
    pub async fn update_role(
        &self,
        acting: &Session,
        role_id: i64,
        payload: RolePayload,
    ) -> Result<RoleResponse, AppError> {
        guard::ensure_permission(&self.repo, acting, PermissionKey::SettingsUpdate).await?;
        payload.validate()?;

        let mut tx = self.pool.begin().await?;

        let role = self
            .repo
            .update_role(&mut *tx, role_id, &payload.name, payload.description.as_deref())
            .await?;

        self.repo.clear_role_permissions(&mut *tx, role_id).await?;

        let mut permissions: Vec<Permission> = Vec::with_capacity(payload.permissions.len());
        for key in &payload.permissions {
            let permission = self
                .repo
                .find_permission_by_key(&mut *tx, key)
                .await?
                .ok_or_else(|| AppError::UnknownPermission(key.clone()))?;
            permissions.push(permission);
        }
        for permission in &permissions {
            self.repo
                .assign_permission(&mut *tx, role.id, permission.id)
                .await?;
        }

        tx.commit().await?;

        Ok(RoleResponse {
            role,
            permissions: permissions.into_iter().map(|p| p.key).collect(),
        })
    }

    /// Recusa com `RoleInUse` enquanto qualquer usuário apontar para o cargo;
    /// quem chama precisa reatribuir esses usuários antes.
    pub async fn delete_role(&self, acting: &Session, role_id: i64) -> Result<(), AppError> {
        guard::ensure_permission(&self.repo, acting, PermissionKey::SettingsDelete).await?;

        self.repo
            .find_role(role_id)
            .await?
            .ok_or(AppError::NotFound("cargo"))?;

        let assigned = self.user_repo.count_by_role(role_id).await?;
        if assigned > 0 {
            return Err(AppError::RoleInUse(assigned));
        }

        // Os vínculos saem junto, na mesma transação (sem cascata no esquema)
        let mut tx = self.pool.begin().await?;
        self.repo.clear_role_permissions(&mut *tx, role_id).await?;
        self.repo.delete_role(&mut *tx, role_id).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn list_roles(&self, acting: &Session) -> Result<Vec<RoleResponse>, AppError> {
        guard::ensure_permission(&self.repo, acting, PermissionKey::SettingsRead).await?;

        let roles = self.repo.list_roles().await?;
        let mut responses = Vec::with_capacity(roles.len());
        for role in roles {
            let permissions = self.repo.role_permission_keys(role.id).await?;
            responses.push(RoleResponse { role, permissions });
        }
        Ok(responses)
    }

    // Sem guarda: qualquer formulário de cargo precisa do vocabulário para
    // renderizar as opções. O vocabulário em si não é segredo.
    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.repo.list_permissions().await
    }

    /// O vocabulário é fixo (não existe caminho de criação), mas a remoção
    /// sobrevive da versão antiga -- guardada contra vínculos de cargos E
    /// módulos que ainda exijam a permissão.
    pub async fn delete_permission(
        &self,
        acting: &Session,
        permission_id: i64,
    ) -> Result<(), AppError> {
        guard::ensure_permission(&self.repo, acting, PermissionKey::SettingsDelete).await?;

        self.repo
            .find_permission(permission_id)
            .await?
            .ok_or(AppError::NotFound("permissão"))?;

        let grants = self.repo.count_grants_of_permission(permission_id).await?;
        let modules = self.repo.count_modules_requiring(permission_id).await?;
        if grants > 0 || modules > 0 {
            return Err(AppError::PermissionInUse);
        }

        self.repo.delete_permission(&self.pool, permission_id).await
    }

    // ---
    // Módulos
    // ---

    pub async fn list_modules(&self, acting: &Session) -> Result<Vec<Module>, AppError> {
        guard::ensure_permission(&self.repo, acting, PermissionKey::SettingsRead).await?;
        self.repo.list_modules().await
    }

    /// Os módulos que a sessão enxerga, na ordem estável de navegação.
    pub async fn visible_modules(&self, role_id: Option<i64>) -> Result<Vec<Module>, AppError> {
        self.repo.visible_modules(role_id).await
    }

    pub async fn set_module_active(
        &self,
        acting: &Session,
        module_id: i64,
        active: bool,
    ) -> Result<(), AppError> {
        guard::ensure_permission(&self.repo, acting, PermissionKey::SettingsUpdate).await?;
        self.repo
            .set_module_active(&self.pool, module_id, active)
            .await
    }

    pub async fn set_module_required_permission(
        &self,
        acting: &Session,
        module_id: i64,
        permission_id: Option<i64>,
    ) -> Result<(), AppError> {
        guard::ensure_permission(&self.repo, acting, PermissionKey::SettingsUpdate).await?;

        if let Some(permission_id) = permission_id {
            self.repo
                .find_permission(permission_id)
                .await?
                .ok_or(AppError::NotFound("permissão"))?;
        }

        self.repo
            .set_module_required_permission(&self.pool, module_id, permission_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn payload(name: &str, permissions: &[&str]) -> RolePayload {
        RolePayload {
            name: name.into(),
            description: None,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn predicado_reflete_os_vinculos_e_o_ciclo_concede_revoga() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;

        let fiscal = state
            .rbac_service
            .create_role(&admin, payload("fiscal", &["sales_read"]))
            .await
            .unwrap();
        let role_id = Some(fiscal.role.id);

        assert!(state.rbac_service.role_has_permission(role_id, "sales_read").await.unwrap());
        assert!(!state.rbac_service.role_has_permission(role_id, "sales_write").await.unwrap());

        // Concede e depois revoga: o predicado volta ao valor original
        state
            .rbac_service
            .update_role(&admin, fiscal.role.id, payload("fiscal", &["sales_read", "sales_write"]))
            .await
            .unwrap();
        assert!(state.rbac_service.role_has_permission(role_id, "sales_write").await.unwrap());

        state
            .rbac_service
            .update_role(&admin, fiscal.role.id, payload("fiscal", &["sales_read"]))
            .await
            .unwrap();
        assert!(!state.rbac_service.role_has_permission(role_id, "sales_write").await.unwrap());

        // Sessão sem cargo não tem permissão nenhuma
        assert!(!state.rbac_service.role_has_permission(None, "sales_read").await.unwrap());
    }

    #[tokio::test]
    async fn caixa_enxerga_somente_home_e_cashier() {
        let state = test_support::app().await;
        let caixa = test_support::create_user(&state, "ana", Some("cashier")).await;

        let visiveis = state
            .rbac_service
            .visible_modules(caixa.role_id)
            .await
            .unwrap();
        let nomes: Vec<&str> = visiveis.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(nomes, vec!["home", "cashier"]);
    }

    #[tokio::test]
    async fn modulo_desativado_some_para_todo_mundo() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;

        let cashier_mod = state
            .rbac_service
            .list_modules(&admin)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.name == "cashier")
            .unwrap();

        state
            .rbac_service
            .set_module_active(&admin, cashier_mod.id, false)
            .await
            .unwrap();

        let visiveis = state
            .rbac_service
            .visible_modules(admin.role_id)
            .await
            .unwrap();
        assert!(visiveis.iter().all(|m| m.name != "cashier"));
    }

    #[tokio::test]
    async fn apagar_cargo_em_uso_e_recusado_e_nada_muda() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;
        let caixa = test_support::create_user(&state, "bia", Some("cashier")).await;
        let cashier_id = caixa.role_id.unwrap();

        let err = state
            .rbac_service
            .delete_role(&admin, cashier_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RoleInUse(1)));

        // Cargo e vínculos continuam intactos
        let roles = state.rbac_service.list_roles(&admin).await.unwrap();
        let cashier = roles.iter().find(|r| r.role.id == cashier_id).unwrap();
        assert_eq!(cashier.permissions, vec!["sales_read", "sales_write"]);
    }

    #[tokio::test]
    async fn apagar_cargo_sem_usuarios_funciona() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;

        let temporario = state
            .rbac_service
            .create_role(&admin, payload("temporario", &["sales_read"]))
            .await
            .unwrap();

        state
            .rbac_service
            .delete_role(&admin, temporario.role.id)
            .await
            .unwrap();

        let roles = state.rbac_service.list_roles(&admin).await.unwrap();
        assert!(roles.iter().all(|r| r.role.id != temporario.role.id));
    }

    #[tokio::test]
    async fn troca_de_permissoes_e_atomica() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;

        let estoque = state
            .rbac_service
            .create_role(&admin, payload("estoque", &["inventory_read", "inventory_write"]))
            .await
            .unwrap();

        // A chave desconhecida falha DEPOIS do delete-all interno; a
        // transação desfaz tudo e o conjunto antigo completo permanece.
        let err = state
            .rbac_service
            .update_role(
                &admin,
                estoque.role.id,
                payload("estoque", &["inventory_read", "chave_que_nao_existe"]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownPermission(_)));

        let roles = state.rbac_service.list_roles(&admin).await.unwrap();
        let atual = roles.iter().find(|r| r.role.id == estoque.role.id).unwrap();
        assert_eq!(atual.permissions, vec!["inventory_read", "inventory_write"]);
    }

    #[tokio::test]
    async fn limites_de_tamanho_do_cargo_sao_validados() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;

        let err = state
            .rbac_service
            .create_role(&admin, payload("um-nome-grande-demais-para-o-limite", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = state
            .rbac_service
            .create_role(
                &admin,
                RolePayload {
                    name: "ok".into(),
                    description: Some("d".repeat(61)),
                    permissions: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn nome_de_cargo_duplicado_e_recusado() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;

        let err = state
            .rbac_service
            .create_role(&admin, payload("cashier", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateRoleName));
    }

    #[tokio::test]
    async fn permissao_em_uso_nao_pode_ser_apagada() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;

        // "sales_read" está concedida aos três cargos semeados
        let sales_read = state
            .rbac_service
            .list_permissions()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.key == "sales_read")
            .unwrap();

        let err = state
            .rbac_service
            .delete_permission(&admin, sales_read.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionInUse));
    }

    #[tokio::test]
    async fn permissao_exigida_por_modulo_tambem_conta_como_em_uso() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;

        // Deixa "users_delete" sem nenhum vínculo de cargo...
        let todas_menos_users_delete: Vec<&str> = PermissionKey::ALL
            .iter()
            .map(|k| k.as_key())
            .filter(|k| *k != "users_delete")
            .collect();
        let admin_role_id = admin.role_id.unwrap();
        state
            .rbac_service
            .update_role(&admin, admin_role_id, payload("admin", &todas_menos_users_delete))
            .await
            .unwrap();

        // ...mas um módulo passa a exigi-la
        let users_delete = state
            .rbac_service
            .list_permissions()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.key == "users_delete")
            .unwrap();
        let home = state
            .rbac_service
            .list_modules(&admin)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.name == "home")
            .unwrap();
        state
            .rbac_service
            .set_module_required_permission(&admin, home.id, Some(users_delete.id))
            .await
            .unwrap();

        let err = state
            .rbac_service
            .delete_permission(&admin, users_delete.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionInUse));
    }

    #[tokio::test]
    async fn caixa_nao_administra_cargos_nem_modulos() {
        let state = test_support::app().await;
        let caixa = test_support::create_user(&state, "leo", Some("cashier")).await;

        let err = state
            .rbac_service
            .create_role(&caixa, payload("golpe", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));

        let err = state
            .rbac_service
            .set_module_active(&caixa, 1, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }
}
