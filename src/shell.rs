// src/shell.rs
//
// A máquina de estados da navegação. O shell é o dono da sessão: o login o
// tira de LoggedOut, o logout o devolve, e toda troca de módulo é validada
// contra os módulos visíveis do cargo antes de acontecer.

use crate::{
    common::error::AppError,
    models::{auth::Session, rbac::ModuleId},
    services::{auth::AuthService, rbac_service::RbacService},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    LoggedOut,
    ViewingModule(ModuleId),
}

pub struct NavigationShell {
    auth: AuthService,
    rbac: RbacService,
    state: ShellState,
    session: Option<Session>,
}

impl NavigationShell {
    pub fn new(auth: AuthService, rbac: RbacService) -> Self {
        Self {
            auth,
            rbac,
            state: ShellState::LoggedOut,
            session: None,
        }
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    /// A sessão vale pela vida do processo; não há expiração nem token.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// LoggedOut -> ViewingModule(Home) em caso de sucesso; em caso de falha
    /// o estado não muda e o erro sobe para a camada de apresentação exibir.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<&Session, AppError> {
        if self.session.is_some() {
            return Err(anyhow::anyhow!("já existe uma sessão ativa; saia antes de entrar de novo").into());
        }

        let session = self.auth.authenticate(username, password).await?;
        tracing::info!(
            "Sessão iniciada para '{}' (cargo: {})",
            session.username,
            session.role_name.as_deref().unwrap_or("nenhum")
        );

        self.session = Some(session);
        self.state = ShellState::ViewingModule(ModuleId::Home);
        Ok(self.session.as_ref().expect("sessão recém-criada"))
    }

    /// Só permite a troca se o módulo estiver entre os visíveis do cargo da
    /// sessão; caso contrário recusa sem mudar de estado.
    pub async fn navigate(&mut self, target: ModuleId) -> Result<(), AppError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| AppError::AccessDenied("nenhuma sessão ativa".into()))?;

        let visible = self.rbac.visible_modules(session.role_id).await?;
        let allowed = visible
            .iter()
            .any(|module| ModuleId::from_name(&module.name) == Some(target));

        if !allowed {
            return Err(AppError::AccessDenied(format!(
                "o módulo '{}' não está disponível para este perfil",
                target.as_str()
            )));
        }

        self.state = ShellState::ViewingModule(target);
        Ok(())
    }

    /// Incondicional, de qualquer estado. A confirmação é assunto da UI.
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(
                "Sessão de '{}' (usuário #{}) encerrada",
                session.username,
                session.user_id
            );
        }
        self.state = ShellState::LoggedOut;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    async fn shell(state: &crate::config::AppState) -> NavigationShell {
        NavigationShell::new(state.auth_service.clone(), state.rbac_service.clone())
    }

    #[tokio::test]
    async fn login_bem_sucedido_leva_para_a_home() {
        let state = test_support::app().await;
        let mut shell = shell(&state).await;

        shell.login("admin", "admin123").await.unwrap();

        assert_eq!(shell.state(), ShellState::ViewingModule(ModuleId::Home));
        assert_eq!(shell.session().unwrap().username, "admin");
    }

    #[tokio::test]
    async fn login_invalido_mantem_o_estado_deslogado() {
        let state = test_support::app().await;
        let mut shell = shell(&state).await;

        let err = shell.login("admin", "senha-errada").await.unwrap_err();

        assert!(matches!(err, AppError::InvalidCredentials));
        assert_eq!(shell.state(), ShellState::LoggedOut);
        assert!(shell.session().is_none());
    }

    #[tokio::test]
    async fn navegacao_recusada_nao_muda_de_tela() {
        let state = test_support::app().await;
        test_support::create_user(&state, "vera", Some("cashier")).await;
        let mut shell = shell(&state).await;
        shell.login("vera", test_support::TEST_PASSWORD).await.unwrap();

        // O caixa pode ir para a própria tela de caixa...
        shell.navigate(ModuleId::Cashier).await.unwrap();
        assert_eq!(shell.state(), ShellState::ViewingModule(ModuleId::Cashier));

        // ...mas settings é recusado e o estado fica onde estava
        let err = shell.navigate(ModuleId::Settings).await.unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
        assert_eq!(shell.state(), ShellState::ViewingModule(ModuleId::Cashier));
    }

    #[tokio::test]
    async fn logout_encerra_a_sessao_de_qualquer_estado() {
        let state = test_support::app().await;
        let mut shell = shell(&state).await;
        shell.login("admin", "admin123").await.unwrap();
        shell.navigate(ModuleId::Settings).await.unwrap();

        shell.logout();

        assert_eq!(shell.state(), ShellState::LoggedOut);
        assert!(shell.session().is_none());

        // Sem sessão, navegar é recusado
        let err = shell.navigate(ModuleId::Home).await.unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }
}
