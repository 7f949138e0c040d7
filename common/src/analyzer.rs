//! Análise do modelo: infere a estrutura dos formulários
//!
//! Cada aba vira um tipo de equipamento; cada cabeçalho da linha 1
//! vira um campo. O tipo do campo sai das validações de lista do
//! modelo (caminho preferido) ou, em modelos antigos sem validação,
//! dos valores já digitados sob o cabeçalho.

use std::io::Cursor;

use calamine::{Data, Range, Reader, Xlsx};
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::refs::{parse_list_formula, ListSource, RangeRef};
use crate::types::{
    FieldKind, FieldSpec, Schema, SheetSchema, FREE_ENTRY_MARKER, UNRESOLVED_LIST_PLACEHOLDER,
};
use crate::workbook::{self, Container, ListValidation, SheetPart};

/// Estratégia de inferência do tipo de campo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStrategy {
    /// Lê as validações de lista embutidas no modelo (autoritativa)
    ValidationBased,
    /// Examina os valores já presentes sob cada cabeçalho (legada,
    /// usada só quando o modelo não traz validação nenhuma)
    ContentHeuristic,
}

/// Analisa um modelo e devolve a estrutura por aba.
///
/// A estratégia é escolhida sozinha: modelos com ao menos uma
/// validação de lista usam `ValidationBased`; os demais caem na
/// heurística de conteúdo.
pub fn analyze(template: &[u8]) -> Result<Schema> {
    let prepared = Prepared::load(template)?;
    let strategy = if prepared.has_list_validations() {
        InferenceStrategy::ValidationBased
    } else {
        InferenceStrategy::ContentHeuristic
    };
    debug!("estratégia de inferência: {:?}", strategy);
    prepared.run(strategy)
}

/// Analisa forçando uma estratégia específica.
pub fn analyze_with(template: &[u8], strategy: InferenceStrategy) -> Result<Schema> {
    Prepared::load(template)?.run(strategy)
}

/// Modelo carregado duas vezes: valores via calamine, validações via
/// o XML do contêiner. Ambos a partir dos mesmos bytes.
struct Prepared {
    xlsx: Xlsx<Cursor<Vec<u8>>>,
    sheets: Vec<(SheetPart, Vec<ListValidation>)>,
}

impl Prepared {
    fn load(template: &[u8]) -> Result<Self> {
        let mut container = Container::open(template)?;
        let xlsx: Xlsx<_> = Xlsx::new(Cursor::new(template.to_vec()))
            .map_err(|e| Error::InvalidTemplate(format!("planilha ilegível: {e}")))?;

        let parts: Vec<SheetPart> = container.sheets().to_vec();
        let mut sheets = Vec::with_capacity(parts.len());
        for part in parts {
            let xml = container.read_entry_string(&part.path)?;
            let rules = workbook::list_validations(&xml)?;
            sheets.push((part, rules));
        }
        Ok(Prepared { xlsx, sheets })
    }

    fn has_list_validations(&self) -> bool {
        self.sheets.iter().any(|(_, rules)| !rules.is_empty())
    }

    fn run(mut self, strategy: InferenceStrategy) -> Result<Schema> {
        let plan: Vec<(String, Vec<ListValidation>)> = self
            .sheets
            .iter()
            .map(|(part, rules)| (part.name.clone(), rules.clone()))
            .collect();

        let mut sheets = Vec::with_capacity(plan.len());
        for (name, rules) in plan {
            let range = self
                .xlsx
                .worksheet_range(&name)
                .map_err(|e| Error::InvalidTemplate(format!("falha ao ler a aba '{name}': {e}")))?;

            let headers = sheet_headers(&range);
            if headers.is_empty() {
                return Err(Error::EmptyTemplate(name));
            }

            let mut fields = Vec::with_capacity(headers.len());
            for (col, header) in headers {
                let field = match strategy {
                    InferenceStrategy::ValidationBased => {
                        self.infer_from_validations(&name, col, &header, &rules)?
                    }
                    InferenceStrategy::ContentHeuristic => {
                        infer_from_content(&range, col, &header)
                    }
                };
                fields.push(field);
            }
            sheets.push(SheetSchema { name, fields });
        }
        Ok(Schema { sheets })
    }

    /// Tipo do campo pela primeira regra de lista que cobre a coluna.
    fn infer_from_validations(
        &mut self,
        sheet: &str,
        col: u32,
        header: &str,
        rules: &[ListValidation],
    ) -> Result<FieldSpec> {
        for rule in rules {
            if !rule.ranges.iter().any(|r| r.covers_col(col)) {
                continue;
            }
            let choices = match parse_list_formula(&rule.formula) {
                ListSource::Literal(items) => items,
                ListSource::Range(range) => match self.resolve_range_values(sheet, &range) {
                    Ok(values) if !values.is_empty() => values,
                    Ok(_) => {
                        warn!(
                            "intervalo vazio na validação da coluna '{}' da aba '{}'",
                            header, sheet
                        );
                        vec![UNRESOLVED_LIST_PLACEHOLDER.to_string()]
                    }
                    Err(err) => {
                        warn!(
                            "validação da coluna '{}' da aba '{}' não resolvida: {}",
                            header, sheet, err
                        );
                        vec![UNRESOLVED_LIST_PLACEHOLDER.to_string()]
                    }
                },
                ListSource::Unresolved(formula) => {
                    warn!(
                        "fórmula de lista não suportada na coluna '{}' da aba '{}': {}",
                        header, sheet, formula
                    );
                    vec![UNRESOLVED_LIST_PLACEHOLDER.to_string()]
                }
            };
            if choices.is_empty() {
                continue;
            }
            return Ok(FieldSpec {
                name: header.to_string(),
                column: col,
                kind: FieldKind::Choice,
                choices,
            });
        }
        Ok(FieldSpec {
            name: header.to_string(),
            column: col,
            kind: FieldKind::Text,
            choices: Vec::new(),
        })
    }

    /// Lê os valores de um intervalo (mesma aba ou outra), na ordem
    /// das células, sem repetições.
    fn resolve_range_values(
        &mut self,
        current_sheet: &str,
        range: &RangeRef,
    ) -> Result<Vec<String>> {
        let sheet_name = range.sheet.as_deref().unwrap_or(current_sheet);
        let data = self.xlsx.worksheet_range(sheet_name).map_err(|e| {
            Error::ValidationRangeUnresolved(format!("aba '{sheet_name}': {e}"))
        })?;

        let (row_lo, row_hi) = range.row_range();
        let (col_lo, col_hi) = range.col_range();
        // intervalos de coluna inteira param no fim dos dados
        let row_hi = match data.end() {
            Some((end_row, _)) => row_hi.min(end_row + 1),
            None => return Ok(Vec::new()),
        };

        let mut values = Vec::new();
        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                if let Some(text) = data.get_value((row - 1, col - 1)).and_then(data_to_string) {
                    if !values.contains(&text) {
                        values.push(text);
                    }
                }
            }
        }
        Ok(values)
    }
}

/// Cabeçalhos da linha 1: pares (coluna 1-based, texto). A enumeração
/// para na primeira célula vazia.
fn sheet_headers(range: &Range<Data>) -> Vec<(u32, String)> {
    let mut headers = Vec::new();
    let end_col = match range.end() {
        Some((_, end_col)) => end_col,
        None => return headers,
    };
    for col in 0..=end_col {
        match range.get_value((0, col)).and_then(data_to_string) {
            Some(text) => headers.push((col + 1, text)),
            None => break,
        }
    }
    headers
}

/// Heurística legada: valores distintos sob o cabeçalho viram opções;
/// o marcador de entrada livre ou a ausência de valores mantém texto.
fn infer_from_content(range: &Range<Data>, col: u32, header: &str) -> FieldSpec {
    let mut values: Vec<String> = Vec::new();
    if let Some((end_row, _)) = range.end() {
        for row in 1..=end_row {
            if let Some(text) = range.get_value((row, col - 1)).and_then(data_to_string) {
                if !values.contains(&text) {
                    values.push(text);
                }
            }
        }
    }

    let marker = FREE_ENTRY_MARKER.to_lowercase();
    let free_entry = values.is_empty() || values.iter().any(|v| v.to_lowercase() == marker);
    if free_entry {
        FieldSpec {
            name: header.to_string(),
            column: col,
            kind: FieldKind::Text,
            choices: Vec::new(),
        }
    } else {
        FieldSpec {
            name: header.to_string(),
            column: col,
            kind: FieldKind::Choice,
            choices: values,
        }
    }
}

/// Texto de uma célula para fins de inferência. Números inteiros
/// perdem o `.0`; booleanos seguem a exibição do Excel pt-BR.
fn data_to_string(data: &Data) -> Option<String> {
    let text = match data {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => {
            if *b {
                "VERDADEIRO".to_string()
            } else {
                "FALSO".to_string()
            }
        }
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.trim().to_string(),
        Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
