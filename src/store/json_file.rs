//! Um arquivo `dados_<chave>.json` por usuário

use std::fs;
use std::path::{Path, PathBuf};

use levantamento_common::Record;

use super::{sanitize_key, RecordStore};
use crate::error::Result;

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    fn file_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("dados_{}.json", sanitize_key(key)))
    }

    /// Chaves que têm arquivo gravado, em ordem alfabética.
    pub fn audit_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        if !self.dir.exists() {
            return Ok(keys);
        }
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(stem) = name
                .strip_prefix("dados_")
                .and_then(|rest| rest.strip_suffix(".json"))
            {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn read_records(path: &Path) -> Result<Vec<Record>> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Vec<Record>> {
        let path = self.file_for(key);
        if path.exists() {
            Self::read_records(&path)
        } else {
            Ok(Vec::new())
        }
    }

    fn save(&mut self, key: &str, records: &[Record]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(records)?;
        fs::write(self.file_for(key), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(id: &str, uc: &str) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("Local".to_string(), "Sala".to_string());
        Record {
            id: id.to_string(),
            installation_code: uc.to_string(),
            equipment_type: "Ar Condicionado".to_string(),
            recorded_at: "01/06/2026 12:00:00".to_string(),
            responsible: "equipe".to_string(),
            fields,
            photos: Vec::new(),
        }
    }

    #[test]
    fn test_unknown_key_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("ninguem").expect("carregar").is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonFileStore::new(dir.path());

        let records = vec![record("1", "UC-1"), record("2", "UC-2")];
        store.save("equipe", &records).expect("gravar");

        let loaded = store.load("equipe").expect("carregar");
        assert_eq!(loaded, records);
        assert!(dir.path().join("dados_equipe.json").is_file());
    }

    #[test]
    fn test_save_overwrites_whole_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonFileStore::new(dir.path());

        store
            .save("equipe", &[record("1", "UC-1"), record("2", "UC-2")])
            .expect("gravar");
        store.save("equipe", &[record("3", "UC-3")]).expect("regravar");

        let loaded = store.load("equipe").expect("carregar");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "3");
    }

    #[test]
    fn test_keys_are_isolated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonFileStore::new(dir.path());

        store.save("a", &[record("1", "UC-1")]).expect("gravar");
        store.save("b", &[record("2", "UC-2")]).expect("gravar");

        assert_eq!(store.load("a").expect("carregar").len(), 1);
        assert_eq!(store.load("b").expect("carregar")[0].id, "2");
    }

    #[test]
    fn test_audit_keys_lists_existing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonFileStore::new(dir.path());

        store.save("bruno", &[record("1", "UC-1")]).expect("gravar");
        store.save("ana", &[record("2", "UC-2")]).expect("gravar");
        fs::write(dir.path().join("outro.txt"), "x").expect("arquivo alheio");

        assert_eq!(
            store.audit_keys().expect("listar"),
            vec!["ana".to_string(), "bruno".to_string()]
        );
    }

    #[test]
    fn test_key_with_path_chars_stays_in_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonFileStore::new(dir.path());

        store.save("../fora", &[record("1", "UC-1")]).expect("gravar");
        assert!(dir.path().join("dados____fora.json").is_file());
    }
}
