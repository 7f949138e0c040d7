//! Resolução de referências de células e intervalos (notação A1)
//!
//! Funções puras usadas pelo analisador para interpretar `sqref` de
//! validações e fórmulas de lista (`"Sim,Não"`, `Listas!$A$1:$A$5`).
//! Linhas e colunas são sempre 1-based aqui.

use regex::Regex;

/// Última linha endereçável de uma aba xlsx.
pub const MAX_ROW: u32 = 1_048_576;

/// Uma célula em coordenadas 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

/// Um intervalo, com aba opcional (`None` = mesma aba da validação)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub sheet: Option<String>,
    pub start: CellRef,
    pub end: CellRef,
}

impl RangeRef {
    /// Intervalo de linhas (mínimo, máximo).
    pub fn row_range(&self) -> (u32, u32) {
        (
            self.start.row.min(self.end.row),
            self.start.row.max(self.end.row),
        )
    }

    /// Intervalo de colunas (mínimo, máximo).
    pub fn col_range(&self) -> (u32, u32) {
        (
            self.start.col.min(self.end.col),
            self.start.col.max(self.end.col),
        )
    }

    /// O intervalo cobre a coluna dada?
    pub fn covers_col(&self, col: u32) -> bool {
        let (lo, hi) = self.col_range();
        col >= lo && col <= hi
    }
}

/// Origem das opções de uma validação de lista
#[derive(Debug, Clone, PartialEq)]
pub enum ListSource {
    /// Lista literal entre aspas na fórmula: `"Sim,Não"`
    Literal(Vec<String>),
    /// Referência a um intervalo de células
    Range(RangeRef),
    /// Fórmula que não sabemos resolver (nome definido, OFFSET etc.)
    Unresolved(String),
}

/// Converte letras de coluna em índice 1-based (`A` → 1, `AA` → 27).
pub fn col_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let v = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        index = index * 26 + v;
    }
    Some(index)
}

/// Converte índice 1-based em letras de coluna (1 → `A`).
pub fn index_to_col(index: u32) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Interpreta uma referência de célula (`B2`, `$B$2`).
pub fn parse_cell(s: &str) -> Option<CellRef> {
    lazy_static::lazy_static! {
        static ref CELL_RE: Regex = Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").unwrap();
    }
    let caps = CELL_RE.captures(s.trim())?;
    let col = col_to_index(caps.get(1)?.as_str())?;
    let row: u32 = caps.get(2)?.as_str().parse().ok()?;
    if row == 0 {
        return None;
    }
    Some(CellRef { row, col })
}

/// Interpreta um intervalo, com aba opcional.
///
/// Aceita `A1:B10`, `B2`, `Listas!$A$1:$A$5`, `'Sala de Bombas'!A1:A9`
/// e intervalos de coluna inteira (`Listas!$A:$A`).
pub fn parse_range(s: &str) -> Option<RangeRef> {
    lazy_static::lazy_static! {
        static ref RANGE_RE: Regex = Regex::new(
            r"^(?:(?:'([^']+)'|([^'!:\s]+))!)?\$?([A-Za-z]{1,3})\$?([0-9]+)(?::\$?([A-Za-z]{1,3})\$?([0-9]+))?$"
        )
        .unwrap();
        static ref COLS_RE: Regex = Regex::new(
            r"^(?:(?:'([^']+)'|([^'!:\s]+))!)?\$?([A-Za-z]{1,3}):\$?([A-Za-z]{1,3})$"
        )
        .unwrap();
    }

    let s = s.trim();
    if let Some(caps) = RANGE_RE.captures(s) {
        let sheet = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string());
        let start = CellRef {
            row: caps.get(4)?.as_str().parse().ok()?,
            col: col_to_index(caps.get(3)?.as_str())?,
        };
        let end = match (caps.get(5), caps.get(6)) {
            (Some(c), Some(r)) => CellRef {
                row: r.as_str().parse().ok()?,
                col: col_to_index(c.as_str())?,
            },
            _ => start,
        };
        if start.row == 0 || end.row == 0 {
            return None;
        }
        return Some(RangeRef { sheet, start, end });
    }

    // Coluna inteira: linhas 1..MAX_ROW
    if let Some(caps) = COLS_RE.captures(s) {
        let sheet = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string());
        let start_col = col_to_index(caps.get(3)?.as_str())?;
        let end_col = col_to_index(caps.get(4)?.as_str())?;
        return Some(RangeRef {
            sheet,
            start: CellRef { row: 1, col: start_col },
            end: CellRef { row: MAX_ROW, col: end_col },
        });
    }

    None
}

/// Interpreta o atributo `sqref` de uma validação: um ou mais
/// intervalos separados por espaço, sempre na própria aba.
pub fn parse_sqref(s: &str) -> Vec<RangeRef> {
    s.split_whitespace().filter_map(parse_range).collect()
}

/// Classifica a fórmula de uma validação de lista.
pub fn parse_list_formula(formula: &str) -> ListSource {
    let f = formula.trim().trim_start_matches('=').trim();

    if f.len() >= 2 && f.starts_with('"') && f.ends_with('"') {
        let inner = &f[1..f.len() - 1];
        let choices: Vec<String> = inner
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        return ListSource::Literal(choices);
    }

    match parse_range(f) {
        Some(range) => ListSource::Range(range),
        None => ListSource::Unresolved(formula.trim().to_string()),
    }
}
