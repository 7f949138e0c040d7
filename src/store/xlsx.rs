//! Registro compartilhado em planilha única
//!
//! Todos os usuários gravam na mesma aba `Levantamentos`; as colunas
//! `dados` e `fotos` carregam JSON serializado. A gravação relê o
//! arquivo, troca as linhas do usuário e regrava o livro inteiro.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use calamine::{open_workbook, Data, Reader, Xlsx};
use log::info;
use rust_xlsxwriter::{Format, Workbook};

use levantamento_common::{PhotoRef, Record};

use super::RecordStore;
use crate::error::{LevantamentoError, Result};

const SHEET_NAME: &str = "Levantamentos";
const HEADERS: [&str; 8] = [
    "id",
    "usuario",
    "cod_instalacao",
    "tipo_equipamento",
    "data_hora",
    "responsavel",
    "dados",
    "fotos",
];

pub struct XlsxStore {
    path: PathBuf,
}

struct StoredRow {
    id: String,
    usuario: String,
    cod_instalacao: String,
    tipo_equipamento: String,
    data_hora: String,
    responsavel: String,
    dados: String,
    fotos: String,
}

impl XlsxStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        XlsxStore { path: path.into() }
    }

    fn read_all(&self) -> Result<Vec<StoredRow>> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path)
            .map_err(|e| LevantamentoError::Store(format!("abrir {}: {e}", self.path.display())))?;
        let range = workbook.worksheet_range(SHEET_NAME).map_err(|e| {
            LevantamentoError::Store(format!("aba '{SHEET_NAME}' ilegível: {e}"))
        })?;

        let mut rows = Vec::new();
        for row in range.rows().skip(1) {
            let cell = |i: usize| row.get(i).map(cell_text).unwrap_or_default();
            rows.push(StoredRow {
                id: cell(0),
                usuario: cell(1),
                cod_instalacao: cell(2),
                tipo_equipamento: cell(3),
                data_hora: cell(4),
                responsavel: cell(5),
                dados: cell(6),
                fotos: cell(7),
            });
        }
        Ok(rows)
    }

    fn write_all(&self, rows: &[StoredRow]) -> Result<()> {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name(SHEET_NAME).map_err(excel_err)?;

        let bold = Format::new().set_bold();
        for (col, name) in HEADERS.iter().enumerate() {
            ws.write_string_with_format(0, col as u16, *name, &bold)
                .map_err(excel_err)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            ws.write_string(r, 0, &row.id).map_err(excel_err)?;
            ws.write_string(r, 1, &row.usuario).map_err(excel_err)?;
            ws.write_string(r, 2, &row.cod_instalacao).map_err(excel_err)?;
            ws.write_string(r, 3, &row.tipo_equipamento).map_err(excel_err)?;
            ws.write_string(r, 4, &row.data_hora).map_err(excel_err)?;
            ws.write_string(r, 5, &row.responsavel).map_err(excel_err)?;
            ws.write_string(r, 6, &row.dados).map_err(excel_err)?;
            ws.write_string(r, 7, &row.fotos).map_err(excel_err)?;
        }

        let buffer = workbook.save_to_buffer().map_err(excel_err)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, buffer)?;
        Ok(())
    }
}

impl RecordStore for XlsxStore {
    fn load(&self, key: &str) -> Result<Vec<Record>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        self.read_all()?
            .into_iter()
            .filter(|row| row.usuario == key)
            .map(StoredRow::into_record)
            .collect()
    }

    fn save(&mut self, key: &str, records: &[Record]) -> Result<()> {
        let mut rows = if self.path.exists() {
            self.read_all()?
        } else {
            Vec::new()
        };
        rows.retain(|row| row.usuario != key);
        for record in records {
            rows.push(StoredRow::from_record(key, record)?);
        }

        info!(
            "regravando {} com {} linha(s)",
            self.path.display(),
            rows.len()
        );
        self.write_all(&rows)
    }
}

impl StoredRow {
    fn from_record(key: &str, record: &Record) -> Result<Self> {
        Ok(StoredRow {
            id: record.id.clone(),
            usuario: key.to_string(),
            cod_instalacao: record.installation_code.clone(),
            tipo_equipamento: record.equipment_type.clone(),
            data_hora: record.recorded_at.clone(),
            responsavel: record.responsible.clone(),
            dados: serde_json::to_string(&record.fields)?,
            fotos: serde_json::to_string(&record.photos)?,
        })
    }

    fn into_record(self) -> Result<Record> {
        let fields: BTreeMap<String, String> = if self.dados.is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&self.dados)?
        };
        let photos: Vec<PhotoRef> = if self.fotos.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&self.fotos)?
        };
        Ok(Record {
            id: self.id,
            installation_code: self.cod_instalacao,
            equipment_type: self.tipo_equipamento,
            recorded_at: self.data_hora,
            responsible: self.responsavel,
            fields,
            photos,
        })
    }
}

fn cell_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn excel_err(e: rust_xlsxwriter::XlsxError) -> LevantamentoError {
    LevantamentoError::Store(e.to_string())
}
