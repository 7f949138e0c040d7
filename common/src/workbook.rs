//! Acesso ao contêiner xlsx de um modelo
//!
//! O leitor de valores (calamine) não expõe validações de dados nem
//! permite regravar o arquivo preservando a formatação. Este módulo
//! abre o zip do modelo e trabalha no XML das partes: mapeia abas para
//! caminhos via `xl/workbook.xml` + rels, carrega as strings
//! compartilhadas e extrai cabeçalhos, última linha e regras de
//! validação de lista de cada aba.

use std::collections::HashMap;
use std::io::{BufReader, Cursor, Read};

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::refs::{parse_cell, parse_sqref, RangeRef};

/// Uma aba do modelo: nome exibido e caminho da parte XML no zip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPart {
    pub name: String,
    pub path: String,
}

/// Regra de validação de lista de uma aba
#[derive(Debug, Clone, PartialEq)]
pub struct ListValidation {
    /// Intervalos cobertos pela regra (atributo `sqref`)
    pub ranges: Vec<RangeRef>,
    /// Conteúdo de `<formula1>`, ainda não interpretado
    pub formula: String,
}

/// Modelo aberto como contêiner zip
pub struct Container {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    sheets: Vec<SheetPart>,
    entries: Vec<String>,
    shared_strings: Vec<String>,
}

impl Container {
    /// Abre os bytes de um modelo. Falha com `InvalidTemplate` se o
    /// arquivo não for um xlsx legível com ao menos uma aba.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut archive = ZipArchive::new(cursor)
            .map_err(|e| Error::InvalidTemplate(format!("contêiner zip ilegível: {e}")))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| Error::InvalidTemplate(format!("entrada {i} ilegível: {e}")))?;
            entries.push(entry.name().to_string());
        }

        let sheet_ids = parse_workbook_sheets(&mut archive)?;
        let rels = parse_rels(&mut archive)?;
        let shared_strings = parse_shared_strings(&mut archive)?;

        let mut sheets = Vec::with_capacity(sheet_ids.len());
        for (name, rid) in sheet_ids {
            let target = rels.get(&rid).ok_or_else(|| {
                Error::InvalidTemplate(format!("relacionamento '{rid}' ausente para a aba '{name}'"))
            })?;
            sheets.push(SheetPart {
                name,
                path: normalize_target(target),
            });
        }
        if sheets.is_empty() {
            return Err(Error::InvalidTemplate("o modelo não possui abas".to_string()));
        }

        Ok(Container {
            archive,
            sheets,
            entries,
            shared_strings,
        })
    }

    /// Abas na ordem do modelo.
    pub fn sheets(&self) -> &[SheetPart] {
        &self.sheets
    }

    /// Caminho da parte XML de uma aba, pelo nome exato.
    pub fn sheet_path(&self, name: &str) -> Option<&str> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.path.as_str())
    }

    /// Nomes de todas as entradas do zip, na ordem original.
    pub fn entry_names(&self) -> &[String] {
        &self.entries
    }

    pub fn shared_strings(&self) -> &[String] {
        &self.shared_strings
    }

    /// Lê uma entrada do zip como bytes.
    pub fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut entry = self
            .archive
            .by_name(path)
            .map_err(|e| Error::InvalidTemplate(format!("entrada '{path}' ausente: {e}")))?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Lê uma entrada do zip como texto UTF-8.
    pub fn read_entry_string(&mut self, path: &str) -> Result<String> {
        let bytes = self.read_entry(path)?;
        String::from_utf8(bytes)
            .map_err(|_| Error::InvalidTemplate(format!("entrada '{path}' não é UTF-8")))
    }

    /// XML da aba com o nome dado.
    pub fn sheet_xml(&mut self, name: &str) -> Result<String> {
        let path = self
            .sheet_path(name)
            .ok_or_else(|| Error::InvalidTemplate(format!("aba '{name}' não encontrada")))?
            .to_string();
        self.read_entry_string(&path)
    }
}

/// `Target` dos rels pode vir relativo a `xl/` ou absoluto.
fn normalize_target(target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else if target.starts_with("xl/") {
        target.to_string()
    } else {
        format!("xl/{target}")
    }
}

fn attr_text(attr: &Attribute<'_>) -> Result<String> {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .map_err(|e| Error::InvalidTemplate(format!("atributo XML inválido: {e}")))
}

fn text_content(text: &BytesText<'_>) -> Result<String> {
    text.unescape()
        .map(|v| v.into_owned())
        .map_err(|e| Error::InvalidTemplate(format!("texto XML inválido: {e}")))
}

fn parse_workbook_sheets(archive: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<Vec<(String, String)>> {
    let entry = archive
        .by_name("xl/workbook.xml")
        .map_err(|_| Error::InvalidTemplate("xl/workbook.xml ausente".to_string()))?;
    let mut reader = Reader::from_reader(BufReader::new(entry));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::InvalidTemplate(format!("xl/workbook.xml malformado: {e}")))?;
        match event {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = String::new();
                let mut rid = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = attr_text(&attr)?,
                        b"r:id" => rid = attr_text(&attr)?,
                        _ => {}
                    }
                }
                if !name.is_empty() && !rid.is_empty() {
                    sheets.push((name, rid));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn parse_rels(archive: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<HashMap<String, String>> {
    let entry = archive
        .by_name("xl/_rels/workbook.xml.rels")
        .map_err(|_| Error::InvalidTemplate("xl/_rels/workbook.xml.rels ausente".to_string()))?;
    let mut reader = Reader::from_reader(BufReader::new(entry));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::InvalidTemplate(format!("rels malformado: {e}")))?;
        match event {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr_text(&attr)?,
                        b"Target" => target = attr_text(&attr)?,
                        _ => {}
                    }
                }
                if !id.is_empty() && !target.is_empty() {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Strings compartilhadas, com runs de texto rico concatenados.
/// Sem `trim_text`: espaços internos dos cabeçalhos são conteúdo.
fn parse_shared_strings(archive: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<Vec<String>> {
    let entry = match archive.by_name("xl/sharedStrings.xml") {
        Ok(entry) => entry,
        Err(_) => return Ok(Vec::new()),
    };
    let mut reader = Reader::from_reader(BufReader::new(entry));

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_text = false;
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::InvalidTemplate(format!("sharedStrings malformado: {e}")))?;
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(e) if in_text => current.push_str(&text_content(&e)?),
            Event::CData(e) if in_text => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Cabeçalhos da linha 1 de uma aba: pares (coluna 1-based, texto).
///
/// Só células com texto entram no resultado; o texto é resolvido
/// contra as strings compartilhadas quando a célula é do tipo `s`.
pub fn header_row(sheet_xml: &str, shared_strings: &[String]) -> Result<Vec<(u32, String)>> {
    let mut reader = Reader::from_str(sheet_xml);

    let mut headers = Vec::new();
    let mut implied_row = 0u32;
    let mut in_row1 = false;
    let mut next_col = 1u32;
    let mut current_col = 0u32;
    let mut cell_type = String::new();
    let mut in_value = false;
    let mut in_inline_text = false;
    let mut raw = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::InvalidTemplate(format!("XML da aba malformado: {e}")))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                let mut row_num = None;
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"r" {
                        row_num = attr_text(&attr)?.parse::<u32>().ok();
                    }
                }
                let n = row_num.unwrap_or(implied_row + 1);
                implied_row = n;
                if n != 1 {
                    // linha 1 ausente ou já percorrida
                    break;
                }
                if matches!(event, Event::Empty(_)) {
                    break;
                }
                in_row1 = true;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if in_row1 && e.local_name().as_ref() == b"c" =>
            {
                let mut col = None;
                cell_type.clear();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"r" => col = parse_cell(&attr_text(&attr)?).map(|c| c.col),
                        b"t" => cell_type = attr_text(&attr)?,
                        _ => {}
                    }
                }
                current_col = col.unwrap_or(next_col);
                next_col = current_col + 1;
                raw.clear();
            }
            Event::Start(ref e) if in_row1 => match e.local_name().as_ref() {
                b"v" => in_value = true,
                b"t" => in_inline_text = true,
                _ => {}
            },
            Event::Text(e) if in_value || in_inline_text => raw.push_str(&text_content(&e)?),
            Event::CData(e) if in_value || in_inline_text => {
                raw.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" if in_row1 => {
                    let text = match cell_type.as_str() {
                        "s" => raw
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared_strings.get(i))
                            .cloned()
                            .unwrap_or_default(),
                        _ => raw.clone(),
                    };
                    let text = text.trim();
                    if !text.is_empty() {
                        headers.push((current_col, text.to_string()));
                    }
                }
                b"row" if in_row1 => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(headers)
}

/// Maior número de linha presente na aba, contando linhas que só
/// carregam formatação. Zero para uma aba sem linhas.
pub fn max_row(sheet_xml: &str) -> Result<u32> {
    let mut reader = Reader::from_str(sheet_xml);

    let mut max = 0u32;
    let mut implied_row = 0u32;
    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::InvalidTemplate(format!("XML da aba malformado: {e}")))?;
        match event {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                let mut row_num = None;
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"r" {
                        row_num = attr_text(&attr)?.parse::<u32>().ok();
                    }
                }
                let n = row_num.unwrap_or(implied_row + 1);
                implied_row = n;
                if n > max {
                    max = n;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(max)
}

/// Regras de validação de lista da aba (`type="list"` com `formula1`).
pub fn list_validations(sheet_xml: &str) -> Result<Vec<ListValidation>> {
    let mut reader = Reader::from_str(sheet_xml);

    let mut rules = Vec::new();
    let mut is_list = false;
    let mut ranges: Vec<RangeRef> = Vec::new();
    let mut formula = String::new();
    let mut in_formula = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::InvalidTemplate(format!("XML da aba malformado: {e}")))?;
        match event {
            Event::Start(e) if e.local_name().as_ref() == b"dataValidation" => {
                is_list = false;
                ranges.clear();
                formula.clear();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"type" => is_list = attr_text(&attr)? == "list",
                        b"sqref" => ranges = parse_sqref(&attr_text(&attr)?),
                        _ => {}
                    }
                }
            }
            Event::Start(e) if is_list && e.local_name().as_ref() == b"formula1" => {
                in_formula = true;
            }
            Event::Text(e) if in_formula => formula.push_str(&text_content(&e)?),
            Event::End(e) => match e.local_name().as_ref() {
                b"formula1" => in_formula = false,
                b"dataValidation" => {
                    if is_list && !ranges.is_empty() && !formula.trim().is_empty() {
                        rules.push(ListValidation {
                            ranges: std::mem::take(&mut ranges),
                            formula: formula.trim().to_string(),
                        });
                    }
                    is_list = false;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).expect("start_file");
            writer.write_all(content.as_bytes()).expect("write");
        }
        writer.finish().expect("finish").into_inner()
    }

    const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Ar Condicionado" sheetId="1" r:id="rId1"/><sheet name="Listas" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;

    const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    const SHARED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
<si><t>Local</t></si><si><r><t xml:space="preserve">Tipo </t></r><r><t>Lâmpada</t></r></si><si><t>Sala &amp; Copa</t></si>
</sst>"#;

    const SHEET1_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:C3"/><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="str"><v>BTUs</v></c><c r="C1" t="inlineStr"><is><t>Fotos</t></is></c></row>
<row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>9000</v></c></row>
<row r="3"/>
</sheetData><dataValidations count="2"><dataValidation type="list" allowBlank="1" sqref="A2:A1048576"><formula1>"Sim,Não"</formula1></dataValidation><dataValidation type="whole" sqref="B2:B10"><formula1>1</formula1></dataValidation></dataValidations></worksheet>"#;

    const SHEET2_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row><c t="s"><v>1</v></c></row>
</sheetData></worksheet>"#;

    fn template_fixture() -> Vec<u8> {
        zip_with(&[
            ("xl/workbook.xml", WORKBOOK_XML),
            ("xl/_rels/workbook.xml.rels", RELS_XML),
            ("xl/sharedStrings.xml", SHARED_XML),
            ("xl/worksheets/sheet1.xml", SHEET1_XML),
            ("xl/worksheets/sheet2.xml", SHEET2_XML),
        ])
    }

    #[test]
    fn test_open_maps_sheets_in_workbook_order() {
        let container = Container::open(&template_fixture()).expect("abrir modelo");
        let names: Vec<&str> = container.sheets().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ar Condicionado", "Listas"]);
        assert_eq!(
            container.sheet_path("Ar Condicionado"),
            Some("xl/worksheets/sheet1.xml")
        );
        assert_eq!(container.sheet_path("Listas"), Some("xl/worksheets/sheet2.xml"));
        assert_eq!(container.sheet_path("Geladeira"), None);
    }

    #[test]
    fn test_open_rejects_non_zip() {
        let result = Container::open(b"isto nao e um zip");
        assert!(matches!(result, Err(Error::InvalidTemplate(_))));
    }

    #[test]
    fn test_shared_strings_rich_text_and_entities() {
        let container = Container::open(&template_fixture()).expect("abrir modelo");
        assert_eq!(
            container.shared_strings(),
            &[
                "Local".to_string(),
                "Tipo Lâmpada".to_string(),
                "Sala & Copa".to_string()
            ]
        );
    }

    #[test]
    fn test_header_row_resolves_all_cell_types() {
        let container = Container::open(&template_fixture()).expect("abrir modelo");
        let headers =
            header_row(SHEET1_XML, container.shared_strings()).expect("cabeçalhos");
        assert_eq!(
            headers,
            vec![
                (1, "Local".to_string()),
                (2, "BTUs".to_string()),
                (3, "Fotos".to_string())
            ]
        );
    }

    #[test]
    fn test_header_row_without_row_one() {
        let xml = r#"<worksheet><sheetData><row r="4"><c r="A4" t="str"><v>x</v></c></row></sheetData></worksheet>"#;
        let headers = header_row(xml, &[]).expect("cabeçalhos");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_max_row_counts_formatting_only_rows() {
        assert_eq!(max_row(SHEET1_XML).expect("max"), 3);
        // linha sem atributo r conta como a seguinte
        assert_eq!(max_row(SHEET2_XML).expect("max"), 1);
        assert_eq!(max_row("<worksheet><sheetData/></worksheet>").expect("max"), 0);
    }

    #[test]
    fn test_list_validations_filters_non_list_rules() {
        let rules = list_validations(SHEET1_XML).expect("validações");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].formula, "\"Sim,Não\"");
        assert!(rules[0].ranges[0].covers_col(1));
        assert!(!rules[0].ranges[0].covers_col(2));
    }

    #[test]
    fn test_read_entry_string() {
        let mut container = Container::open(&template_fixture()).expect("abrir modelo");
        let xml = container
            .read_entry_string("xl/worksheets/sheet2.xml")
            .expect("ler entrada");
        assert!(xml.contains("sheetData"));
        assert!(container.read_entry_string("xl/nada.xml").is_err());
    }
}
