//! Pacote de exportação: planilha + fotos em um único zip
//!
//! O pacote carrega a planilha exportada como `levantamento.xlsx` e as
//! fotos de cada levantamento em `Fotos/<código da UC> - <tipo>/`. As
//! fotos são lidas antes da exportação: arquivo que sumiu do disco sai
//! do levantamento e, por consequência, da coluna Fotos da planilha.

use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};

use log::warn;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{Error, Result};
use crate::exporter::{self, ExportOutcome};
use crate::types::Record;

/// Nome da planilha dentro do pacote
pub const SPREADSHEET_ENTRY: &str = "levantamento.xlsx";

/// Resultado da montagem do pacote
#[derive(Debug)]
pub struct ArchiveOutcome {
    /// Bytes do `.zip` resultante
    pub bytes: Vec<u8>,
    /// Levantamentos acrescentados à planilha
    pub appended: usize,
    /// Levantamentos pulados por não terem aba correspondente
    pub skipped: usize,
    /// Tipos de equipamento sem aba, na ordem do primeiro encontro
    pub skipped_types: Vec<String>,
    /// Fotos gravadas no pacote
    pub photos_included: usize,
    /// Fotos descartadas por arquivo ausente ou ilegível
    pub photos_missing: usize,
}

struct LoadedPhoto {
    entry_path: String,
    data: Vec<u8>,
}

/// Monta o pacote de exportação a partir do modelo e dos levantamentos.
pub fn assemble_archive(template: &[u8], records: &[Record]) -> Result<ArchiveOutcome> {
    let (pruned, photos, photos_missing) = load_photos(records);
    let export: ExportOutcome = exporter::export(template, &pruned)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer
        .start_file(SPREADSHEET_ENTRY, options)
        .map_err(|e| Error::ExportSerialization(e.to_string()))?;
    writer
        .write_all(&export.bytes)
        .map_err(|e| Error::ExportSerialization(e.to_string()))?;

    let mut written: HashSet<String> = HashSet::new();
    let mut photos_included = 0usize;
    for photo in photos {
        if !written.insert(photo.entry_path.clone()) {
            warn!(
                "entrada repetida no pacote, mantendo a primeira: {}",
                photo.entry_path
            );
            continue;
        }
        writer
            .start_file(photo.entry_path.as_str(), options)
            .map_err(|e| Error::ExportSerialization(e.to_string()))?;
        writer
            .write_all(&photo.data)
            .map_err(|e| Error::ExportSerialization(e.to_string()))?;
        photos_included += 1;
    }

    let cursor = writer
        .finish()
        .map_err(|e| Error::ExportSerialization(e.to_string()))?;

    Ok(ArchiveOutcome {
        bytes: cursor.into_inner(),
        appended: export.appended,
        skipped: export.skipped,
        skipped_types: export.skipped_types,
        photos_included,
        photos_missing,
    })
}

/// Carrega as fotos de todos os levantamentos. O que não puder ser
/// lido é removido da cópia do levantamento, com aviso, para que a
/// planilha e o pacote contem a mesma história.
fn load_photos(records: &[Record]) -> (Vec<Record>, Vec<LoadedPhoto>, usize) {
    let mut pruned = Vec::with_capacity(records.len());
    let mut photos = Vec::new();
    let mut missing = 0usize;

    for record in records {
        let folder = format!(
            "Fotos/{} - {}",
            record.installation_code, record.equipment_type
        );
        let mut copy = record.clone();
        copy.photos.retain(|photo| match fs::read(&photo.physical_path) {
            Ok(data) => {
                photos.push(LoadedPhoto {
                    entry_path: format!("{}/{}", folder, photo.export_name),
                    data,
                });
                true
            }
            Err(err) => {
                warn!(
                    "foto '{}' do levantamento {} descartada ({}): {}",
                    photo.export_name,
                    record.id,
                    photo.physical_path.display(),
                    err
                );
                missing += 1;
                false
            }
        });
        pruned.push(copy);
    }

    (pruned, photos, missing)
}

#[cfg(all(test, feature = "excel"))]
mod tests {
    use super::*;
    use crate::types::PhotoRef;
    use calamine::{Data, Reader as CalamineReader, Xlsx};
    use rust_xlsxwriter::Workbook;
    use std::collections::BTreeMap;
    use std::io::Read;
    use std::path::Path;
    use zip::ZipArchive;

    fn template() -> Vec<u8> {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("Ar Condicionado").expect("nome da aba");
        ws.write_string(0, 0, "Local").expect("cabeçalho");
        ws.write_string(0, 1, "Fotos").expect("cabeçalho");
        wb.save_to_buffer().expect("salvar modelo")
    }

    fn record_with_photos(photos: Vec<PhotoRef>) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("Local".to_string(), "Sala 2".to_string());
        Record {
            id: "20260601120000".to_string(),
            installation_code: "UC-123".to_string(),
            equipment_type: "Ar Condicionado".to_string(),
            recorded_at: "01/06/2026 12:00:00".to_string(),
            responsible: "Equipe A".to_string(),
            fields,
            photos,
        }
    }

    fn photo(dir: &Path, name: &str, export_name: &str, data: &[u8]) -> PhotoRef {
        let path = dir.join(name);
        fs::write(&path, data).expect("gravar foto de teste");
        PhotoRef {
            physical_path: path,
            export_name: export_name.to_string(),
            original_name: name.to_string(),
        }
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes.to_vec())).expect("abrir pacote");
        archive.file_names().map(|n| n.to_string()).collect()
    }

    fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).expect("abrir pacote");
        let mut entry = archive.by_name(name).expect("entrada no pacote");
        let mut data = Vec::new();
        entry.read_to_end(&mut data).expect("ler entrada");
        data
    }

    fn fotos_cell(archive_bytes: &[u8]) -> Option<Data> {
        let sheet = read_entry(archive_bytes, SPREADSHEET_ENTRY);
        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(sheet)).expect("abrir planilha");
        let range = xlsx.worksheet_range("Ar Condicionado").expect("ler aba");
        range.get_value((1, 1)).cloned()
    }

    #[test]
    fn test_archive_holds_spreadsheet_and_photo_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rec = record_with_photos(vec![
            photo(dir.path(), "a.jpg", "foto_01.jpg", b"jpeg-a"),
            photo(dir.path(), "b.png", "foto_02.png", b"png-b"),
        ]);

        let outcome = assemble_archive(&template(), &[rec]).expect("montar pacote");
        assert_eq!(outcome.appended, 1);
        assert_eq!(outcome.photos_included, 2);
        assert_eq!(outcome.photos_missing, 0);

        let names = entry_names(&outcome.bytes);
        assert!(names.contains(&SPREADSHEET_ENTRY.to_string()));
        assert!(names.contains(&"Fotos/UC-123 - Ar Condicionado/foto_01.jpg".to_string()));
        assert!(names.contains(&"Fotos/UC-123 - Ar Condicionado/foto_02.png".to_string()));

        assert_eq!(
            read_entry(&outcome.bytes, "Fotos/UC-123 - Ar Condicionado/foto_01.jpg"),
            b"jpeg-a".to_vec()
        );
        assert_eq!(
            fotos_cell(&outcome.bytes),
            Some(Data::String("foto_01.jpg, foto_02.png".to_string()))
        );
    }

    #[test]
    fn test_missing_photo_leaves_column_and_tree_consistent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let existing = photo(dir.path(), "a.jpg", "foto_01.jpg", b"jpeg-a");
        let missing = PhotoRef {
            physical_path: dir.path().join("sumiu.jpg"),
            export_name: "foto_02.jpg".to_string(),
            original_name: "sumiu.jpg".to_string(),
        };
        let rec = record_with_photos(vec![existing, missing]);

        let outcome = assemble_archive(&template(), &[rec]).expect("montagem não aborta");
        assert_eq!(outcome.photos_included, 1);
        assert_eq!(outcome.photos_missing, 1);

        let names = entry_names(&outcome.bytes);
        assert!(!names.iter().any(|n| n.ends_with("foto_02.jpg")));
        assert_eq!(
            fotos_cell(&outcome.bytes),
            Some(Data::String("foto_01.jpg".to_string())),
            "coluna Fotos omite o arquivo ausente"
        );
    }

    #[test]
    fn test_record_without_photos_yields_spreadsheet_only() {
        let rec = record_with_photos(Vec::new());
        let outcome = assemble_archive(&template(), &[rec]).expect("montar pacote");

        assert_eq!(entry_names(&outcome.bytes), vec![SPREADSHEET_ENTRY.to_string()]);
        assert_eq!(outcome.photos_included, 0);
        assert_eq!(fotos_cell(&outcome.bytes), None);
    }

    #[test]
    fn test_colliding_entry_paths_keep_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rec_a = record_with_photos(vec![photo(dir.path(), "a.jpg", "foto_01.jpg", b"aaa")]);
        let rec_b = record_with_photos(vec![photo(dir.path(), "b.jpg", "foto_01.jpg", b"bbb")]);

        let outcome = assemble_archive(&template(), &[rec_a, rec_b]).expect("montar pacote");
        assert_eq!(outcome.photos_included, 1, "entrada repetida não regrava");
        assert_eq!(
            read_entry(&outcome.bytes, "Fotos/UC-123 - Ar Condicionado/foto_01.jpg"),
            b"aaa".to_vec()
        );
    }
}
