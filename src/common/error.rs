use thiserror::Error;

// Nosso tipo de erro central, com `thiserror` para melhor ergonomia.
// Cada falha que os serviços podem devolver vira uma variante tipada aqui;
// a camada de apresentação decide como exibir cada uma.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Nome de usuário já existe")]
    DuplicateUsername,

    #[error("Já existe um cargo com esse nome")]
    DuplicateRoleName,

    // Deliberadamente a mesma variante para "usuário não existe", "usuário
    // inativo" e "senha errada" -- não revelamos qual das três aconteceu.
    #[error("Usuário ou senha inválidos")]
    InvalidCredentials,

    #[error("O cargo ainda está atribuído a {0} usuário(s)")]
    RoleInUse(i64),

    #[error("A permissão ainda está em uso por cargos ou módulos")]
    PermissionInUse,

    // Chave fora do vocabulário fixo (ex: digitada errada na tela de cargos)
    #[error("Permissão desconhecida: '{0}'")]
    UnknownPermission(String),

    #[error("Acesso negado: {0}")]
    AccessDenied(String),

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    // Variante para erros do armazenamento (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Mensagem pronta para a camada de apresentação exibir ao operador.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(errors) => {
                let mut partes: Vec<String> = Vec::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    partes.push(format!("{}: {}", field, messages.join(", ")));
                }
                format!("Um ou mais campos são inválidos ({})", partes.join("; "))
            }
            e @ (AppError::DatabaseError(_)
            | AppError::BcryptError(_)
            | AppError::Internal(_)) => {
                tracing::error!("Erro interno: {e}");
                "Ocorreu um erro inesperado.".to_string()
            }
            outro => outro.to_string(),
        }
    }
}
