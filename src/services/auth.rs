// src/services/auth.rs

use bcrypt::{hash, verify};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{RbacRepository, UserRepository},
    models::{
        auth::{CreateUserPayload, Session, UpdateUserPayload, User, UserWithRole},
        rbac::PermissionKey,
    },
    services::guard,
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    rbac_repo: RbacRepository,
    pool: SqlitePool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, rbac_repo: RbacRepository, pool: SqlitePool) -> Self {
        Self {
            user_repo,
            rbac_repo,
            pool,
        }
    }

    /// Autentica um operador e devolve a sessão que o shell vai reter.
    /// Operação somente de leitura: nenhum estado muda aqui.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Session, AppError> {
        // Só contas ativas participam. Conta inexistente, conta desativada e
        // senha errada saem todas pela mesma variante.
        let user = self
            .user_repo
            .find_active_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        // A comparação é do próprio bcrypt, nunca igualdade de texto puro.
        let password = password.to_owned();
        let password_hash = user.password_hash.clone();
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password, &password_hash))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {e}"))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        // A sessão retém apenas a identidade e o cargo
        let role_name = match user.role_id {
            Some(role_id) => self.rbac_repo.find_role(role_id).await?.map(|r| r.name),
            None => None,
        };

        Ok(Session {
            user_id: user.id,
            username: user.username,
            role_id: user.role_id,
            role_name,
        })
    }

    pub async fn create_user(
        &self,
        acting: &Session,
        payload: CreateUserPayload,
    ) -> Result<User, AppError> {
        guard::ensure_permission(&self.rbac_repo, acting, PermissionKey::UsersWrite).await?;
        payload.validate()?;

        // Disciplina de chave estrangeira na camada da aplicação
        if let Some(role_id) = payload.role_id {
            self.rbac_repo
                .find_role(role_id)
                .await?
                .ok_or(AppError::NotFound("cargo"))?;
        }

        let hashed = Self::hash_password(payload.password).await?;

        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .create_user(&mut *tx, &payload.username, &hashed, payload.role_id)
            .await?;
        tx.commit().await?;

        Ok(user)
    }

    // Campos ausentes no payload mantêm o valor armazenado; a senha só é
    // re-hasheada quando uma nova foi informada.
    pub async fn update_user(
        &self,
        acting: &Session,
        username: &str,
        payload: UpdateUserPayload,
    ) -> Result<(), AppError> {
        guard::ensure_permission(&self.rbac_repo, acting, PermissionKey::UsersUpdate).await?;
        payload.validate()?;

        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::NotFound("usuário"))?;

        if let Some(role_id) = payload.role_id {
            self.rbac_repo
                .find_role(role_id)
                .await?
                .ok_or(AppError::NotFound("cargo"))?;
        }

        let password_hash = match payload.password {
            Some(new_password) => Self::hash_password(new_password).await?,
            None => user.password_hash.clone(),
        };
        let role_id = payload.role_id.or(user.role_id);
        let is_active = payload.is_active.unwrap_or(user.is_active);

        self.user_repo
            .update_user(&self.pool, user.id, &password_hash, role_id, is_active)
            .await
    }

    // Sem guarda referencial: nada aponta para usuários por chave estrangeira.
    pub async fn delete_user(&self, acting: &Session, username: &str) -> Result<(), AppError> {
        guard::ensure_permission(&self.rbac_repo, acting, PermissionKey::UsersDelete).await?;
        self.user_repo.delete_user(&self.pool, username).await
    }

    pub async fn list_users(&self, acting: &Session) -> Result<Vec<UserWithRole>, AppError> {
        guard::ensure_permission(&self.rbac_repo, acting, PermissionKey::UsersRead).await?;
        self.user_repo.list_with_roles().await
    }

    // Executa o hashing em um thread separado, como toda chamada de bcrypt
    async fn hash_password(password: String) -> Result<String, AppError> {
        let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {e}"))??;
        Ok(hashed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn admin_autentica_com_cargo() {
        let state = test_support::app().await;

        let session = state
            .auth_service
            .authenticate("admin", "admin123")
            .await
            .expect("bootstrap deve autenticar");

        assert_eq!(session.username, "admin");
        assert_eq!(session.role_name.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn senha_errada_e_usuario_fantasma_dao_o_mesmo_erro() {
        let state = test_support::app().await;

        let senha_errada = state
            .auth_service
            .authenticate("admin", "senha-errada")
            .await
            .unwrap_err();
        let fantasma = state
            .auth_service
            .authenticate("fantasma", "qualquer")
            .await
            .unwrap_err();

        assert!(matches!(senha_errada, AppError::InvalidCredentials));
        assert!(matches!(fantasma, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn usuario_desativado_nao_autentica_nem_com_a_senha_certa() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;
        test_support::create_user(&state, "maria", Some("cashier")).await;

        state
            .auth_service
            .update_user(
                &admin,
                "maria",
                UpdateUserPayload {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = state
            .auth_service
            .authenticate("maria", test_support::TEST_PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn nome_de_usuario_duplicado_falha_e_preserva_o_primeiro() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;
        test_support::create_user(&state, "joao", Some("cashier")).await;

        let err = state
            .auth_service
            .create_user(
                &admin,
                CreateUserPayload {
                    username: "joao".into(),
                    password: "outra-senha".into(),
                    role_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));

        // O primeiro continua lá, intacto e autenticável
        let session = state
            .auth_service
            .authenticate("joao", test_support::TEST_PASSWORD)
            .await
            .unwrap();
        assert_eq!(session.role_name.as_deref(), Some("cashier"));
    }

    #[tokio::test]
    async fn caixa_nao_pode_administrar_usuarios() {
        let state = test_support::app().await;
        let caixa = test_support::create_user(&state, "pedro", Some("cashier")).await;

        let err = state
            .auth_service
            .create_user(
                &caixa,
                CreateUserPayload {
                    username: "intruso".into(),
                    password: "123456".into(),
                    role_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));

        let err = state.auth_service.list_users(&caixa).await.unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn senha_vazia_e_rejeitada_antes_de_tocar_o_banco() {
        let state = test_support::app().await;
        let admin = test_support::admin_session(&state).await;

        let err = state
            .auth_service
            .create_user(
                &admin,
                CreateUserPayload {
                    username: "sem-senha".into(),
                    password: "".into(),
                    role_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn usuario_sem_cargo_autentica_mas_nao_tem_permissoes() {
        let state = test_support::app().await;
        let sem_cargo = test_support::create_user(&state, "avulso", None).await;

        assert_eq!(sem_cargo.role_id, None);
        let err = state.auth_service.list_users(&sem_cargo).await.unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }
}
