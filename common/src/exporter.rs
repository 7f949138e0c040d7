//! Exportação: acrescenta levantamentos a uma cópia do modelo
//!
//! O arquivo devolvido é o modelo original com linhas novas no fim de
//! cada aba alvo. As demais entradas do contêiner são regravadas sem
//! alteração, então formatação, validações, larguras de coluna e abas
//! não tocadas permanecem exatamente como estavam.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use log::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{Error, Result};
use crate::refs::{index_to_col, parse_range};
use crate::types::{Record, FOTOS_HEADER};
use crate::workbook::{self, Container};

/// Resultado da exportação
#[derive(Debug)]
pub struct ExportOutcome {
    /// Bytes do `.xlsx` resultante
    pub bytes: Vec<u8>,
    /// Levantamentos efetivamente acrescentados
    pub appended: usize,
    /// Levantamentos pulados por não terem aba correspondente
    pub skipped: usize,
    /// Tipos de equipamento sem aba, na ordem do primeiro encontro
    pub skipped_types: Vec<String>,
}

/// Acrescenta os levantamentos ao modelo e devolve a planilha nova.
///
/// Cada levantamento vai para a aba cujo nome é igual ao seu tipo de
/// equipamento, logo após a última linha ocupada (linhas que só têm
/// formatação contam como ocupadas). Os valores entram pela posição do
/// cabeçalho atual da aba; campos sem cabeçalho correspondente ficam
/// de fora, e a coluna de fotos recebe os nomes de exportação unidos
/// por vírgula. Levantamentos cujo tipo não tem aba são pulados,
/// contados em `skipped` e listados em `skipped_types`.
pub fn export(template: &[u8], records: &[Record]) -> Result<ExportOutcome> {
    let mut container = Container::open(template)?;

    // agrupa por aba preservando a ordem de chegada
    let mut by_sheet: HashMap<String, Vec<&Record>> = HashMap::new();
    let mut skipped = 0usize;
    let mut skipped_types: Vec<String> = Vec::new();
    for record in records {
        if container.sheet_path(&record.equipment_type).is_some() {
            by_sheet
                .entry(record.equipment_type.clone())
                .or_default()
                .push(record);
        } else {
            warn!(
                "levantamento {} pulado: aba '{}' não existe no modelo",
                record.id, record.equipment_type
            );
            if !skipped_types.contains(&record.equipment_type) {
                skipped_types.push(record.equipment_type.clone());
            }
            skipped += 1;
        }
    }

    let parts: Vec<(String, String)> = container
        .sheets()
        .iter()
        .map(|p| (p.name.clone(), p.path.clone()))
        .collect();

    // remenda o XML de cada aba alvo; as demais ficam intactas
    let mut patched: HashMap<String, String> = HashMap::new();
    let mut appended = 0usize;
    for (name, path) in parts {
        let group = match by_sheet.get(&name) {
            Some(group) => group,
            None => continue,
        };
        let xml = container.read_entry_string(&path)?;
        let headers = workbook::header_row(&xml, container.shared_strings())?;
        let start_row = workbook::max_row(&xml)? + 1;
        debug!(
            "aba '{}': {} levantamento(s) a partir da linha {}",
            name,
            group.len(),
            start_row
        );

        let mut rows_xml = String::new();
        for (offset, record) in group.iter().enumerate() {
            rows_xml.push_str(&record_row_xml(record, start_row + offset as u32, &headers));
        }

        let last_row = start_row + group.len() as u32 - 1;
        let max_col = headers.iter().map(|(col, _)| *col).max().unwrap_or(1);
        let spliced = splice_rows(&xml, &rows_xml)?;
        patched.insert(path, update_dimension(&spliced, last_row, max_col));
        appended += group.len();
    }

    let bytes = rebuild(&mut container, &patched)?;
    Ok(ExportOutcome {
        bytes,
        appended,
        skipped,
        skipped_types,
    })
}

/// Uma linha de levantamento em XML de planilha. Só células com valor
/// são emitidas; texto vai sempre como `inlineStr` para não mexer na
/// tabela de textos compartilhados.
fn record_row_xml(record: &Record, row: u32, headers: &[(u32, String)]) -> String {
    let mut cells = String::new();
    for (col, header) in headers {
        let value = if header == FOTOS_HEADER {
            let names = record.photo_export_names();
            if names.is_empty() {
                None
            } else {
                Some(names.join(", "))
            }
        } else {
            record
                .fields
                .get(header)
                .filter(|v| !v.is_empty())
                .cloned()
        };
        if let Some(value) = value {
            cells.push_str(&format!(
                "<c r=\"{}{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                index_to_col(*col),
                row,
                escape_xml(&value)
            ));
        }
    }
    if cells.is_empty() {
        format!("<row r=\"{row}\"/>")
    } else {
        format!("<row r=\"{row}\">{cells}</row>")
    }
}

/// Insere as linhas novas imediatamente antes de `</sheetData>`.
/// Abas vazias vêm com `<sheetData/>` e ganham o par de fechamento.
fn splice_rows(xml: &str, rows_xml: &str) -> Result<String> {
    if let Some(pos) = xml.rfind("</sheetData>") {
        let mut out = String::with_capacity(xml.len() + rows_xml.len());
        out.push_str(&xml[..pos]);
        out.push_str(rows_xml);
        out.push_str(&xml[pos..]);
        return Ok(out);
    }
    if let Some(pos) = xml.find("<sheetData/>") {
        let tail = pos + "<sheetData/>".len();
        let mut out = String::with_capacity(xml.len() + rows_xml.len() + 24);
        out.push_str(&xml[..pos]);
        out.push_str("<sheetData>");
        out.push_str(rows_xml);
        out.push_str("</sheetData>");
        out.push_str(&xml[tail..]);
        return Ok(out);
    }
    Err(Error::InvalidTemplate(
        "aba sem elemento sheetData".to_string(),
    ))
}

/// Estende `<dimension ref="...">` até a última linha escrita. A
/// ausência do elemento não é erro, ele é opcional no formato.
fn update_dimension(xml: &str, last_row: u32, max_col: u32) -> String {
    const PREFIX: &str = "<dimension ref=\"";
    let start = match xml.find(PREFIX) {
        Some(start) => start,
        None => return xml.to_string(),
    };
    let value_start = start + PREFIX.len();
    let rest = &xml[value_start..];
    let value_len = match rest.find('"') {
        Some(len) => len,
        None => return xml.to_string(),
    };

    let mut end_col = max_col;
    let mut end_row = last_row;
    if let Some(old) = parse_range(&rest[..value_len]) {
        end_col = end_col.max(old.end.col);
        end_row = end_row.max(old.end.row);
    }

    let mut out = String::with_capacity(xml.len() + 8);
    out.push_str(&xml[..value_start]);
    out.push_str(&format!("A1:{}{}", index_to_col(end_col), end_row));
    out.push_str(&rest[value_len..]);
    out
}

/// Regrava o contêiner entrada por entrada, na ordem original,
/// trocando apenas as abas remendadas.
fn rebuild(container: &mut Container, patched: &HashMap<String, String>) -> Result<Vec<u8>> {
    let names: Vec<String> = container.entry_names().to_vec();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for name in names {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| Error::ExportSerialization(e.to_string()))?;
        match patched.get(&name) {
            Some(xml) => writer
                .write_all(xml.as_bytes())
                .map_err(|e| Error::ExportSerialization(e.to_string()))?,
            None => {
                let bytes = container.read_entry(&name)?;
                writer
                    .write_all(&bytes)
                    .map_err(|e| Error::ExportSerialization(e.to_string()))?;
            }
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| Error::ExportSerialization(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
