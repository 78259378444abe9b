//src/main.rs

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod models;
mod services;
mod shell;
#[cfg(test)]
mod test_support;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::models::auth::{CreateUserPayload, UpdateUserPayload};
use crate::models::catalog::{CreateProductPayload, RecordSalePayload};
use crate::models::rbac::{ModuleId, RolePayload};
use crate::shell::{NavigationShell, ShellState};

const AJUDA: &str = "\
Comandos disponíveis:
  login <usuario> <senha>        logout        sair
  modulos                        ir <modulo>
  produtos                       criar-produto <nome> <preco>
  venda <produto_id> <qtd>       total         relatorio [n]
  exportar-produtos
  usuarios                       criar-usuario <nome> <senha> [cargo_id]
  trocar-cargo <nome> <cargo_id> ativar-usuario <nome>
  desativar-usuario <nome>       apagar-usuario <nome>
  cargos                         criar-cargo <nome> [chave,chave,...]
  editar-cargo <id> <nome> [chaves]             apagar-cargo <id>
  permissoes                     apagar-permissao <id>
  modulo-ativo <id> <on|off>     modulo-permissao <id> <permissao_id|nenhuma>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger antes de qualquer outra coisa
    tracing_subscriber::fmt().with_target(false).compact().init();

    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://caixa.db".to_string());

    let app_state = AppState::new(&database_url).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    db::seed::run(&app_state.db_pool).await?;

    let mut shell = NavigationShell::new(
        app_state.auth_service.clone(),
        app_state.rbac_service.clone(),
    );

    println!("🧾 Caixa PDV. Digite 'ajuda' para ver os comandos.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match shell.state() {
            ShellState::LoggedOut => print!("(deslogado)> "),
            ShellState::ViewingModule(module) => print!("({})> ", module.as_str()),
        }
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = parts.split_first() else {
            continue;
        };

        match run_command(&app_state, &mut shell, cmd, args).await {
            Ok(output) => println!("{output}"),
            Err(e) => println!("✖ {}", e.user_message()),
        }

        if cmd == "sair" {
            break;
        }
    }

    Ok(())
}

// Traduz uma linha do operador em chamadas aos serviços. Toda regra de
// autorização mora nos serviços e no shell; aqui é só despacho e formatação.
async fn run_command(
    state: &AppState,
    shell: &mut NavigationShell,
    cmd: &str,
    args: &[&str],
) -> Result<String, AppError> {
    // Comandos que funcionam sem sessão
    match (cmd, args) {
        ("ajuda", _) => return Ok(AJUDA.into()),
        ("sair", _) => return Ok("Até logo!".into()),
        ("login", [username, password]) => {
            let session = shell.login(username, password).await?;
            return Ok(format!("Bem-vindo, {}!", session.username));
        }
        ("login", _) => return Ok("uso: login <usuario> <senha>".into()),
        ("logout", _) => {
            shell.logout();
            return Ok("Sessão encerrada.".into());
        }
        _ => {}
    }

    let Some(session) = shell.session().cloned() else {
        return Ok("Faça login primeiro ('login <usuario> <senha>').".into());
    };

    let output = match (cmd, args) {
        ("modulos", _) => {
            let modules = state.rbac_service.visible_modules(session.role_id).await?;
            modules
                .iter()
                .map(|m| m.name.clone())
                .collect::<Vec<_>>()
                .join(", ")
        }
        ("ir", [name]) => match ModuleId::from_name(name) {
            Some(target) => {
                shell.navigate(target).await?;
                format!("Agora em '{}'.", target.as_str())
            }
            None => format!("Módulo desconhecido: '{name}'"),
        },

        ("produtos", _) => state
            .catalog_service
            .list_products()
            .await?
            .iter()
            .map(|p| format!("#{} {} (R$ {:.2})", p.id, p.name, p.price))
            .collect::<Vec<_>>()
            .join("\n"),
        ("exportar-produtos", _) => {
            let products = state.catalog_service.list_products().await?;
            serde_json::to_string_pretty(&products)
                .map_err(|e| anyhow::anyhow!("Falha ao serializar o catálogo: {e}"))?
        }
        ("criar-produto", [name, price]) => {
            let Ok(price) = price.parse::<f64>() else {
                return Ok("uso: criar-produto <nome> <preco>".into());
            };
            let product = state
                .catalog_service
                .create_product(
                    &session,
                    CreateProductPayload {
                        name: (*name).into(),
                        price,
                    },
                )
                .await?;
            format!("Produto #{} cadastrado.", product.id)
        }
        ("venda", [product_id, quantity]) => {
            let (Ok(product_id), Ok(quantity)) = (product_id.parse(), quantity.parse()) else {
                return Ok("uso: venda <produto_id> <quantidade>".into());
            };
            let sale = state
                .catalog_service
                .record_sale(
                    &session,
                    RecordSalePayload {
                        product_id,
                        quantity,
                    },
                )
                .await?;
            format!("Venda #{} registrada: R$ {:.2}", sale.id, sale.total)
        }
        ("total", _) => format!(
            "Total vendido: R$ {:.2}",
            state.catalog_service.sales_total(&session).await?
        ),
        ("relatorio", rest) => {
            let limit = rest.first().and_then(|s| s.parse().ok()).unwrap_or(10);
            state
                .catalog_service
                .recent_sales(&session, limit)
                .await?
                .iter()
                .map(|s| {
                    format!(
                        "#{} {} x{} R$ {:.2} em {}",
                        s.id,
                        s.product_name,
                        s.quantity,
                        s.total,
                        s.timestamp.format("%d/%m/%Y %H:%M")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }

        ("usuarios", _) => state
            .auth_service
            .list_users(&session)
            .await?
            .iter()
            .map(|u| {
                format!(
                    "#{} {} [{}] {}",
                    u.id,
                    u.username,
                    u.role_name.as_deref().unwrap_or("sem cargo"),
                    if u.is_active { "ativo" } else { "inativo" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ("criar-usuario", [username, password, rest @ ..]) => {
            let role_id = rest.first().and_then(|s| s.parse().ok());
            let user = state
                .auth_service
                .create_user(
                    &session,
                    CreateUserPayload {
                        username: (*username).into(),
                        password: (*password).into(),
                        role_id,
                    },
                )
                .await?;
            format!("Usuário #{} criado.", user.id)
        }
        ("trocar-cargo", [username, role_id]) => {
            let Ok(role_id) = role_id.parse::<i64>() else {
                return Ok("uso: trocar-cargo <nome> <cargo_id>".into());
            };
            state
                .auth_service
                .update_user(
                    &session,
                    username,
                    UpdateUserPayload {
                        role_id: Some(role_id),
                        ..Default::default()
                    },
                )
                .await?;
            format!("Cargo de '{username}' atualizado.")
        }
        ("ativar-usuario", [username]) | ("desativar-usuario", [username]) => {
            let ativo = cmd == "ativar-usuario";
            state
                .auth_service
                .update_user(
                    &session,
                    username,
                    UpdateUserPayload {
                        is_active: Some(ativo),
                        ..Default::default()
                    },
                )
                .await?;
            format!(
                "Usuário '{}' {}.",
                username,
                if ativo { "ativado" } else { "desativado" }
            )
        }
        ("apagar-usuario", [username]) => {
            state.auth_service.delete_user(&session, username).await?;
            format!("Usuário '{username}' removido.")
        }

        ("cargos", _) => state
            .rbac_service
            .list_roles(&session)
            .await?
            .iter()
            .map(|r| format!("#{} {} [{}]", r.role.id, r.role.name, r.permissions.join(", ")))
            .collect::<Vec<_>>()
            .join("\n"),
        ("criar-cargo", [name, rest @ ..]) => {
            let role = state
                .rbac_service
                .create_role(
                    &session,
                    RolePayload {
                        name: (*name).into(),
                        description: None,
                        permissions: parse_keys(rest),
                    },
                )
                .await?;
            format!("Cargo #{} criado.", role.role.id)
        }
        ("editar-cargo", [id, name, rest @ ..]) => {
            let Ok(role_id) = id.parse::<i64>() else {
                return Ok("uso: editar-cargo <id> <nome> [chave,chave,...]".into());
            };
            state
                .rbac_service
                .update_role(
                    &session,
                    role_id,
                    RolePayload {
                        name: (*name).into(),
                        description: None,
                        permissions: parse_keys(rest),
                    },
                )
                .await?;
            "Cargo atualizado.".into()
        }
        ("apagar-cargo", [id]) => {
            let Ok(role_id) = id.parse::<i64>() else {
                return Ok("uso: apagar-cargo <id>".into());
            };
            state.rbac_service.delete_role(&session, role_id).await?;
            "Cargo removido.".into()
        }

        ("permissoes", _) => state
            .rbac_service
            .list_permissions()
            .await?
            .iter()
            .map(|p| format!("#{} {}", p.id, p.key))
            .collect::<Vec<_>>()
            .join("\n"),
        ("apagar-permissao", [id]) => {
            let Ok(permission_id) = id.parse::<i64>() else {
                return Ok("uso: apagar-permissao <id>".into());
            };
            state
                .rbac_service
                .delete_permission(&session, permission_id)
                .await?;
            "Permissão removida.".into()
        }

        ("modulo-ativo", [id, flag]) => {
            let Ok(module_id) = id.parse::<i64>() else {
                return Ok("uso: modulo-ativo <id> <on|off>".into());
            };
            state
                .rbac_service
                .set_module_active(&session, module_id, *flag == "on")
                .await?;
            "Módulo atualizado.".into()
        }
        ("modulo-permissao", [id, permission]) => {
            let Ok(module_id) = id.parse::<i64>() else {
                return Ok("uso: modulo-permissao <id> <permissao_id|nenhuma>".into());
            };
            let permission_id = if *permission == "nenhuma" {
                None
            } else {
                match permission.parse::<i64>() {
                    Ok(id) => Some(id),
                    Err(_) => return Ok("uso: modulo-permissao <id> <permissao_id|nenhuma>".into()),
                }
            };
            state
                .rbac_service
                .set_module_required_permission(&session, module_id, permission_id)
                .await?;
            "Módulo atualizado.".into()
        }

        _ => "Comando desconhecido. Digite 'ajuda'.".into(),
    };

    Ok(output)
}

fn parse_keys(rest: &[&str]) -> Vec<String> {
    rest.iter()
        .flat_map(|chunk| chunk.split(','))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
