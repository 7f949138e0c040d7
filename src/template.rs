//! Guarda dos modelos de planilha
//!
//! O modelo padrão vale para todos; cada usuário pode subir o próprio,
//! que passa na frente até ser removido.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::error::{LevantamentoError, Result};
use crate::store::sanitize_key;

const DEFAULT_TEMPLATE_FILE: &str = "modelo_padrao.xlsx";

/// De onde veio o modelo ativo de um usuário.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateOrigin {
    Default,
    Personal,
}

impl fmt::Display for TemplateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateOrigin::Default => write!(f, "padrão"),
            TemplateOrigin::Personal => write!(f, "pessoal"),
        }
    }
}

pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TemplateStore { dir: dir.into() }
    }

    fn default_path(&self) -> PathBuf {
        self.dir.join(DEFAULT_TEMPLATE_FILE)
    }

    fn personal_path(&self, user: &str) -> PathBuf {
        self.dir.join(format!("modelo_{}.xlsx", sanitize_key(user)))
    }

    pub fn has_default(&self) -> bool {
        self.default_path().exists()
    }

    /// Lê o modelo padrão, sem considerar modelos pessoais.
    pub fn default_template(&self) -> Result<Vec<u8>> {
        let path = self.default_path();
        if !path.exists() {
            return Err(LevantamentoError::MissingTemplate);
        }
        Ok(fs::read(path)?)
    }

    /// Resolve o modelo ativo: o pessoal do usuário quando existir,
    /// senão o padrão.
    pub fn active_template_for(&self, user: &str) -> Result<(Vec<u8>, TemplateOrigin)> {
        let personal = self.personal_path(user);
        if personal.exists() {
            return Ok((fs::read(personal)?, TemplateOrigin::Personal));
        }
        let default = self.default_path();
        if default.exists() {
            return Ok((fs::read(default)?, TemplateOrigin::Default));
        }
        Err(LevantamentoError::MissingTemplate)
    }

    pub fn replace_default(&self, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.default_path(), bytes)?;
        Ok(())
    }

    pub fn store_personal(&self, user: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.personal_path(user), bytes)?;
        Ok(())
    }

    /// Remove o modelo pessoal; retorna `false` quando não havia um.
    pub fn remove_personal(&self, user: &str) -> Result<bool> {
        let path = self.personal_path(user);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}
