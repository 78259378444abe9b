// src/test_support.rs
//
// Infra compartilhada pelos módulos de teste: um banco em memória migrado e
// semeado pelos mesmos caminhos da produção, e atalhos para sessões.

use crate::config::AppState;
use crate::models::auth::{CreateUserPayload, Session};

pub const TEST_PASSWORD: &str = "senha123";

pub async fn app() -> AppState {
    let state = AppState::new("sqlite::memory:")
        .await
        .expect("pool em memória");

    sqlx::migrate!()
        .run(&state.db_pool)
        .await
        .expect("migrações no banco de teste");

    crate::db::seed::run(&state.db_pool)
        .await
        .expect("seed no banco de teste");

    state
}

pub async fn admin_session(state: &AppState) -> Session {
    state
        .auth_service
        .authenticate("admin", "admin123")
        .await
        .expect("o admin do bootstrap deve autenticar")
}

/// Cria um usuário com o cargo semeado de nome dado (ou nenhum) e já devolve
/// a sessão autenticada dele.
pub async fn create_user(state: &AppState, username: &str, role: Option<&str>) -> Session {
    let admin = admin_session(state).await;

    let role_id = match role {
        Some(name) => Some(
            sqlx::query_scalar::<_, i64>("SELECT id FROM roles WHERE name = ?")
                .bind(name)
                .fetch_one(&state.db_pool)
                .await
                .expect("cargo semeado"),
        ),
        None => None,
    };

    state
        .auth_service
        .create_user(
            &admin,
            CreateUserPayload {
                username: username.into(),
                password: TEST_PASSWORD.into(),
                role_id,
            },
        )
        .await
        .expect("criar usuário de teste");

    state
        .auth_service
        .authenticate(username, TEST_PASSWORD)
        .await
        .expect("autenticar usuário de teste")
}
