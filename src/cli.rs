use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

use levantamento_common::{FieldKind, SheetSchema, FOTOS_HEADER, UNRESOLVED_LIST_PLACEHOLDER};
use log::warn;

use crate::error::{LevantamentoError, Result};

#[derive(Parser)]
#[command(name = "levantamento")]
#[command(about = "Levantamento de cargas: formulários a partir de planilha modelo", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Logs detalhados (equivale a RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mostra a estrutura inferida de um modelo de planilha
    Analyze {
        /// Arquivo .xlsx do modelo
        #[arg(required = true)]
        template: PathBuf,

        /// Imprime o esquema em JSON
        #[arg(long)]
        json: bool,
    },

    /// Gera um modelo de demonstração
    Sample {
        /// Arquivo .xlsx de saída
        #[arg(required = true)]
        output: PathBuf,

        /// Variante antiga, sem validações (inferência por conteúdo)
        #[arg(long)]
        legacy: bool,
    },

    /// Registra um levantamento
    Add {
        /// Usuário dono do registro
        #[arg(short, long)]
        user: String,

        /// Código da unidade consumidora
        #[arg(long)]
        uc: String,

        /// Tipo de equipamento (nome da aba do modelo)
        #[arg(long)]
        tipo: String,

        /// Valor de campo, repetível (ex.: -c "BTUs=9000")
        #[arg(short = 'c', long = "campo", value_name = "CAMPO=VALOR")]
        campos: Vec<String>,

        /// Foto ou pasta de fotos a anexar, repetível
        #[arg(long = "foto", value_name = "CAMINHO")]
        fotos: Vec<PathBuf>,
    },

    /// Lista os levantamentos de um usuário
    List {
        #[arg(short, long)]
        user: String,

        /// Filtra por unidade consumidora
        #[arg(long)]
        uc: Option<String>,
    },

    /// Remove levantamentos
    Remove {
        #[arg(short, long)]
        user: String,

        /// Posição mostrada em `list` (começa em 1)
        #[arg(long, conflicts_with_all = ["uc", "all"])]
        index: Option<usize>,

        /// Remove todos os registros da unidade (pede senha do Admin)
        #[arg(long, conflicts_with = "all")]
        uc: Option<String>,

        /// Remove todos os registros do usuário (pede senha do Admin)
        #[arg(long)]
        all: bool,
    },

    /// Exporta os levantamentos para uma cópia do modelo
    Export {
        #[arg(short, long)]
        user: String,

        /// Arquivo de saída (.xlsx, ou .zip com --zip)
        #[arg(required = true)]
        output: PathBuf,

        /// Monta o pacote .zip com a planilha e as fotos
        #[arg(long)]
        zip: bool,

        /// Envia o arquivo gerado para este endereço
        #[arg(long, value_name = "ENDEREÇO")]
        email: Option<String>,
    },

    /// Gerencia os modelos de planilha
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Gerencia o registro de usuários (ações do Admin)
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Mostra ou inicializa a configuração
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// Mostra o modelo ativo (o padrão, ou o de um usuário)
    Show {
        /// Resolve o modelo ativo deste usuário
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Substitui o modelo padrão (pede senha do Admin)
    SetDefault {
        /// Arquivo .xlsx do novo modelo
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Define o modelo pessoal de um usuário
    SetPersonal {
        #[arg(short, long)]
        user: String,

        /// Arquivo .xlsx do modelo
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Remove o modelo pessoal, voltando ao padrão
    ResetPersonal {
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// Cadastra um usuário (a senha é pedida no terminal)
    Add {
        #[arg(required = true)]
        name: String,
    },

    /// Remove um usuário
    Remove {
        #[arg(required = true)]
        name: String,
    },

    /// Troca a senha de um usuário
    Passwd {
        #[arg(required = true)]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Mostra a configuração atual
    Show,

    /// Grava um config.json de exemplo
    Init,
}

/// Converte os argumentos `CAMPO=VALOR` em um mapa de respostas.
/// Campo repetido fica com o último valor.
pub fn parse_field_assignments(args: &[String]) -> Result<BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    for arg in args {
        let Some((name, value)) = arg.split_once('=') else {
            return Err(LevantamentoError::CliExecution(format!(
                "campo '{arg}' sem '='; use o formato CAMPO=VALOR"
            )));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(LevantamentoError::CliExecution(format!(
                "campo sem nome em '{arg}'"
            )));
        }
        fields.insert(name.to_string(), value.trim().to_string());
    }
    Ok(fields)
}

/// Confere as respostas contra os campos da aba: nome tem que existir
/// e, em campo de seleção, o valor tem que ser uma das opções.
pub fn validate_field_values(
    sheet: &SheetSchema,
    fields: &BTreeMap<String, String>,
) -> Result<()> {
    for (name, value) in fields {
        if name == FOTOS_HEADER {
            return Err(LevantamentoError::CliExecution(
                "o campo 'Fotos' é preenchido pelos anexos; use --foto".to_string(),
            ));
        }
        let Some(spec) = sheet.fields.iter().find(|f| &f.name == name) else {
            let known: Vec<&str> = sheet.fields.iter().map(|f| f.name.as_str()).collect();
            return Err(LevantamentoError::CliExecution(format!(
                "campo '{name}' não existe na aba '{}' (campos: {})",
                sheet.name,
                known.join(", ")
            )));
        };
        if spec.kind == FieldKind::Choice {
            if spec.choices == [UNRESOLVED_LIST_PLACEHOLDER] {
                warn!("campo '{name}' está com as opções indisponíveis; valor aceito sem conferência");
            } else if !spec.choices.iter().any(|c| c == value) {
                return Err(LevantamentoError::CliExecution(format!(
                    "valor '{value}' inválido para o campo '{name}'; opções: {}",
                    spec.choices.join(", ")
                )));
            }
        }
    }
    Ok(())
}
