//! Fluxo de sessão de ponta a ponta: modelo ativo, registros
//! persistidos e exportação do que ficou gravado.
//!
//! ## Histórico
//! - 2026-08-20: criação

use std::collections::BTreeMap;

use levantamento_cargas::session::SessionState;
use levantamento_cargas::store::{JsonFileStore, RecordStore};
use levantamento_cargas::template::{TemplateOrigin, TemplateStore};
use levantamento_common::{export, sample_template, sample_template_legacy};
use tempfile::tempdir;

fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_session_flow_from_template_to_export() {
    let dir = tempdir().expect("Failed to create temp dir");
    let templates = TemplateStore::new(dir.path());
    templates
        .replace_default(&sample_template().expect("gerar modelo"))
        .expect("gravar modelo padrão");

    let mut store = JsonFileStore::new(dir.path());
    let mut session = SessionState::new("ana");
    session.load_from(&store).expect("carregar");

    let (bytes, origin) = templates.active_template_for("ana").expect("resolver");
    assert_eq!(origin, TemplateOrigin::Default);
    session.set_template(bytes, origin).expect("ativar");

    session
        .add_record(
            &mut store,
            "UC-100",
            "Ar Condicionado",
            fields(&[("Local", "Recepção"), ("Tecnologia", "Inverter")]),
            vec![],
        )
        .expect("registrar");
    session
        .add_record(
            &mut store,
            "UC-100",
            "Iluminação",
            fields(&[("Ambiente", "Hall"), ("Tipo Lâmpada", "LED")]),
            vec![],
        )
        .expect("registrar");

    // Outra sessão do mesmo usuário enxerga o que foi persistido
    let mut reloaded = SessionState::new("ana");
    reloaded.load_from(&store).expect("recarregar");
    assert_eq!(reloaded.records().len(), 2);
    assert_eq!(reloaded.records()[0].responsible, "ana");

    // O que está no armazenamento exporta direto
    let handle_bytes = templates
        .active_template_for("ana")
        .expect("resolver")
        .0;
    let outcome = export(&handle_bytes, reloaded.records()).expect("exportar");
    assert_eq!(outcome.appended, 2);
    assert_eq!(outcome.skipped, 0);
}

#[test]
fn test_personal_template_changes_session_schema() {
    let dir = tempdir().expect("Failed to create temp dir");
    let templates = TemplateStore::new(dir.path());
    templates
        .replace_default(&sample_template().expect("gerar modelo"))
        .expect("gravar padrão");
    templates
        .store_personal("bruno", &sample_template_legacy().expect("gerar legado"))
        .expect("gravar pessoal");

    let (bytes, origin) = templates.active_template_for("bruno").expect("resolver");
    assert_eq!(origin, TemplateOrigin::Personal);

    let mut session = SessionState::new("bruno");
    session.set_template(bytes, origin).expect("ativar");
    let handle = session.template().expect("modelo ativo");
    assert_eq!(handle.origin, TemplateOrigin::Personal);

    // O modelo legado também expõe as duas abas do formulário
    let schema = session.schema().expect("esquema");
    assert!(schema.sheet("Ar Condicionado").is_some());
    assert!(schema.sheet("Iluminação").is_some());
}

#[test]
fn test_uploading_new_template_replaces_schema() {
    let dir = tempdir().expect("Failed to create temp dir");
    let templates = TemplateStore::new(dir.path());
    templates
        .replace_default(&sample_template().expect("gerar modelo"))
        .expect("gravar padrão");

    let mut session = SessionState::new("ana");
    let (first, origin) = templates.active_template_for("ana").expect("resolver");
    session.set_template(first, origin).expect("ativar");
    let first_digest = session.template().expect("modelo").digest.clone();

    // Admin troca o modelo padrão; a sessão recarrega e o digest muda
    templates
        .replace_default(&sample_template_legacy().expect("gerar legado"))
        .expect("substituir");
    let (second, origin) = templates.active_template_for("ana").expect("resolver");
    session.set_template(second, origin).expect("reativar");

    assert_ne!(session.template().expect("modelo").digest, first_digest);
}

#[test]
fn test_bulk_removal_persists_immediately() {
    let dir = tempdir().expect("Failed to create temp dir");
    let templates = TemplateStore::new(dir.path());
    templates
        .replace_default(&sample_template().expect("gerar modelo"))
        .expect("gravar padrão");

    let mut store = JsonFileStore::new(dir.path());
    let mut session = SessionState::new("carla");
    let (bytes, origin) = templates.active_template_for("carla").expect("resolver");
    session.set_template(bytes, origin).expect("ativar");

    for uc in ["UC-1", "UC-1", "UC-2"] {
        session
            .add_record(
                &mut store,
                uc,
                "Iluminação",
                fields(&[("Ambiente", "Sala")]),
                vec![],
            )
            .expect("registrar");
    }

    let removed = session
        .remove_by_installation(&mut store, "UC-1")
        .expect("remover em lote");
    assert_eq!(removed, 2);

    let persisted = store.load("carla").expect("carregar");
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].installation_code, "UC-2");
}
