use crate::error::{LevantamentoError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Diretório de dados (modelos, levantamentos, usuários).
    /// Vazio usa `~/.levantamento`.
    pub data_dir: Option<PathBuf>,

    /// Onde os levantamentos ficam gravados
    #[serde(default)]
    pub store: StoreBackend,

    /// Conta SMTP para envio das exportações
    pub smtp: Option<SmtpConfig>,
}

/// Backend do armazenamento de levantamentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StoreBackend {
    /// Um `dados_<usuario>.json` por usuário
    #[default]
    #[serde(rename = "json")]
    Json,
    /// Planilha única compartilhada (`levantamentos.xlsx`)
    #[serde(rename = "xlsx")]
    Xlsx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Remetente, ex.: `Levantamentos <levantamentos@empresa.com.br>`
    pub from: String,
    /// TLS implícito (porta 465). `false` usa STARTTLS.
    #[serde(default = "default_tls_implicit")]
    pub tls_implicit: bool,
}

fn default_smtp_port() -> u16 {
    465
}

fn default_tls_implicit() -> bool {
    true
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| LevantamentoError::Config("diretório home não encontrado".into()))?;
        Ok(home.join(".config").join("levantamento").join("config.json"))
    }

    /// Diretório de dados, criado na primeira consulta.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .ok_or_else(|| {
                    LevantamentoError::Config("diretório home não encontrado".into())
                })?
                .join(".levantamento"),
        };
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Conta SMTP, obrigatória para `export --email`.
    pub fn smtp(&self) -> Result<&SmtpConfig> {
        self.smtp.as_ref().ok_or_else(|| {
            LevantamentoError::Config(
                "conta SMTP não configurada. Edite o config.json (seção \"smtp\")".into(),
            )
        })
    }
}
