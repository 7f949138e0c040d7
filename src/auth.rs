//! Registro de usuários com senhas em argon2
//!
//! O arquivo `usuarios.json` mapeia nome → hash. Entradas antigas em
//! texto plano ainda são aceitas na verificação e sinalizadas para
//! regravação como hash.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{LevantamentoError, Result};

const USERS_FILE: &str = "usuarios.json";
const DEFAULT_ADMIN_PASSWORD: &str = "admin2026";

/// Nome do administrador semeado na primeira execução.
pub const DEFAULT_ADMIN: &str = "Admin";

/// Resultado de uma verificação de senha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Senha correta; `needs_rehash` indica entrada legada em texto
    /// plano que deve ser regravada como hash.
    Valid { needs_rehash: bool },
    Invalid,
}

pub struct UserRegistry {
    path: PathBuf,
    users: BTreeMap<String, String>,
}

impl UserRegistry {
    /// Abre o registro no diretório de dados; semeia o `Admin` quando
    /// o arquivo não existe ou está vazio.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(USERS_FILE);
        let users: BTreeMap<String, String> = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };

        let mut registry = UserRegistry { path, users };
        if registry.users.is_empty() {
            // Entrada legada de propósito: o primeiro login do Admin
            // passa pelo caminho de rehash como qualquer senha antiga.
            registry
                .users
                .insert(DEFAULT_ADMIN.to_string(), DEFAULT_ADMIN_PASSWORD.to_string());
            registry.persist()?;
        }
        Ok(registry)
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.users)?)?;
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.users.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.users.contains_key(name)
    }

    pub fn is_admin(name: &str) -> bool {
        name == DEFAULT_ADMIN
    }

    pub fn register(&mut self, name: &str, password: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LevantamentoError::Auth(
                "nome de usuário não pode ser vazio".to_string(),
            ));
        }
        if self.users.contains_key(name) {
            return Err(LevantamentoError::Auth(format!(
                "usuário '{name}' já existe"
            )));
        }
        let hash = hash_password(password)?;
        self.users.insert(name.to_string(), hash);
        self.persist()
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        if name == DEFAULT_ADMIN {
            return Err(LevantamentoError::Auth(
                "o usuário Admin não pode ser removido".to_string(),
            ));
        }
        if self.users.remove(name).is_none() {
            return Err(LevantamentoError::Auth(format!(
                "usuário '{name}' não encontrado"
            )));
        }
        self.persist()
    }

    pub fn change_password(&mut self, name: &str, new_password: &str) -> Result<()> {
        if !self.users.contains_key(name) {
            return Err(LevantamentoError::Auth(format!(
                "usuário '{name}' não encontrado"
            )));
        }
        let hash = hash_password(new_password)?;
        self.users.insert(name.to_string(), hash);
        self.persist()
    }

    /// Confere a senha sem alterar o registro. Entradas que não são
    /// hashes argon2 são comparadas como texto plano legado.
    pub fn verify(&self, name: &str, password: &str) -> Verification {
        let Some(stored) = self.users.get(name) else {
            return Verification::Invalid;
        };
        if stored.starts_with("$argon2") {
            if verify_password(password, stored) {
                Verification::Valid { needs_rehash: false }
            } else {
                Verification::Invalid
            }
        } else if stored == password {
            Verification::Valid { needs_rehash: true }
        } else {
            Verification::Invalid
        }
    }

    /// Regrava a entrada como hash; chamado após aceitar uma senha
    /// legada.
    pub fn rehash(&mut self, name: &str, password: &str) -> Result<()> {
        self.change_password(name, password)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LevantamentoError::Auth(format!("falha ao gerar hash de senha: {e}")))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
