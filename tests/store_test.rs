//! Propriedades do armazenamento de levantamentos nos dois backends.
//!
//! ## Histórico
//! - 2026-08-20: criação

use std::collections::BTreeMap;
use std::path::PathBuf;

use levantamento_cargas::store::{JsonFileStore, RecordStore, XlsxStore};
use levantamento_common::{PhotoRef, Record};
use tempfile::tempdir;

fn record(id: &str, uc: &str) -> Record {
    let mut fields = BTreeMap::new();
    fields.insert("Local".to_string(), "Sala".to_string());
    fields.insert("BTUs".to_string(), "9000".to_string());
    Record {
        id: id.to_string(),
        installation_code: uc.to_string(),
        equipment_type: "Ar Condicionado".to_string(),
        recorded_at: "20/08/2026 09:00:00".to_string(),
        responsible: "equipe".to_string(),
        fields,
        photos: vec![PhotoRef {
            physical_path: PathBuf::from("/fotos/IMG_001.jpg"),
            export_name: "foto_01.jpg".to_string(),
            original_name: "IMG_001.jpg".to_string(),
        }],
    }
}

/// Gravar A e depois B deixa só B: sobrescrita total, sem mesclagem.
fn assert_last_write_wins(store: &mut dyn RecordStore) {
    let list_a = vec![record("1", "UC-1"), record("2", "UC-2")];
    let list_b = vec![record("3", "UC-3")];

    store.save("equipe", &list_a).expect("gravar A");
    store.save("equipe", &list_b).expect("gravar B");

    let loaded = store.load("equipe").expect("carregar");
    assert_eq!(loaded, list_b);
}

fn assert_unknown_key_loads_empty(store: &dyn RecordStore) {
    assert!(store.load("ninguém").expect("carregar").is_empty());
}

#[test]
fn test_json_store_last_write_wins() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut store = JsonFileStore::new(dir.path());
    assert_last_write_wins(&mut store);
}

#[test]
fn test_xlsx_store_last_write_wins() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut store = XlsxStore::new(dir.path().join("levantamentos.xlsx"));
    assert_last_write_wins(&mut store);
}

#[test]
fn test_unknown_key_loads_empty_in_both_backends() {
    let dir = tempdir().expect("Failed to create temp dir");
    let json = JsonFileStore::new(dir.path());
    let xlsx = XlsxStore::new(dir.path().join("levantamentos.xlsx"));

    assert_unknown_key_loads_empty(&json);
    assert_unknown_key_loads_empty(&xlsx);
}

#[test]
fn test_json_store_keeps_users_in_separate_files() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut store = JsonFileStore::new(dir.path());

    store.save("ana", &[record("1", "UC-1")]).expect("gravar");
    store.save("bruno", &[record("2", "UC-2")]).expect("gravar");

    assert!(dir.path().join("dados_ana.json").exists());
    assert!(dir.path().join("dados_bruno.json").exists());
    assert_eq!(store.audit_keys().expect("listar"), vec!["ana", "bruno"]);

    let ana = store.load("ana").expect("carregar");
    assert_eq!(ana.len(), 1);
    assert_eq!(ana[0].installation_code, "UC-1");
}

#[test]
fn test_xlsx_store_shares_one_workbook_between_users() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("levantamentos.xlsx");
    let mut store = XlsxStore::new(&path);

    store.save("ana", &[record("1", "UC-1")]).expect("gravar");
    store.save("bruno", &[record("2", "UC-2")]).expect("gravar");
    store.save("ana", &[record("3", "UC-3")]).expect("regravar");

    assert!(path.exists());
    let ana = store.load("ana").expect("carregar");
    let bruno = store.load("bruno").expect("carregar");
    assert_eq!(ana.len(), 1, "as linhas antigas da ana saíram");
    assert_eq!(ana[0].id, "3");
    assert_eq!(bruno.len(), 1, "as linhas do bruno sobreviveram");
    assert_eq!(bruno[0].id, "2");
}

#[test]
fn test_payloads_survive_both_backends() {
    let dir = tempdir().expect("Failed to create temp dir");
    let original = vec![record("7", "UC-7")];

    let mut json = JsonFileStore::new(dir.path());
    json.save("equipe", &original).expect("gravar");
    assert_eq!(json.load("equipe").expect("carregar"), original);

    let mut xlsx = XlsxStore::new(dir.path().join("levantamentos.xlsx"));
    xlsx.save("equipe", &original).expect("gravar");
    assert_eq!(
        xlsx.load("equipe").expect("carregar"),
        original,
        "campos e fotos atravessam o JSON das células"
    );
}
