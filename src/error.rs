use thiserror::Error;

#[derive(Error, Debug)]
pub enum LevantamentoError {
    #[error("configuração: {0}")]
    Config(String),

    #[error("nenhum modelo cadastrado. Use `levantamento template set-default ARQUIVO.xlsx` para definir o modelo padrão")]
    MissingTemplate,

    #[error("arquivo não encontrado: {0}")]
    FileNotFound(String),

    #[error("armazenamento de levantamentos: {0}")]
    Store(String),

    #[error("autenticação: {0}")]
    Auth(String),

    #[error("envio de e-mail: {0}")]
    Email(String),

    #[error("erro de terminal: {0}")]
    CliExecution(String),

    #[error("erro de JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] levantamento_common::Error),
}

pub type Result<T> = std::result::Result<T, LevantamentoError>;
