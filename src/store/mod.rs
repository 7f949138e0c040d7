//! Armazenamento dos levantamentos
//!
//! O acesso é sempre por chave de usuário e a gravação é integral: o
//! conjunto entregue ao `save` substitui tudo o que estava gravado
//! para aquela chave. Não há tranca entre processos; com duas
//! gravações simultâneas da mesma chave vale a que terminar por
//! último.

mod json_file;
mod xlsx;

pub use json_file::JsonFileStore;
pub use xlsx::XlsxStore;

use crate::error::Result;
use levantamento_common::Record;

pub trait RecordStore {
    /// Levantamentos da chave; vazio quando nunca houve gravação.
    fn load(&self, key: &str) -> Result<Vec<Record>>;

    /// Regrava o conjunto inteiro da chave.
    fn save(&mut self, key: &str, records: &[Record]) -> Result<()>;
}

/// Chave de usuário em forma segura para nome de arquivo.
pub(crate) fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key_keeps_safe_chars() {
        assert_eq!(sanitize_key("equipe-01_b"), "equipe-01_b");
    }

    #[test]
    fn test_sanitize_key_replaces_path_chars() {
        assert_eq!(sanitize_key("../maria clara"), "___maria_clara");
    }
}
