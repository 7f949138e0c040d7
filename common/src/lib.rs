//! Levantamento Cargas Common Library
//!
//! Motor compartilhado de análise e exportação: tipos do levantamento,
//! leitura do modelo, inferência de campos e geração dos arquivos de
//! saída (planilha e pacote com fotos).

pub mod types;
pub mod error;
pub mod refs;
pub mod workbook;
pub mod analyzer;
pub mod exporter;
pub mod archive;
#[cfg(feature = "excel")]
pub mod sample;

pub use types::{
    FieldKind, FieldSpec, PhotoRef, Record, Schema, SheetSchema, FOTOS_HEADER,
    FREE_ENTRY_MARKER, UNRESOLVED_LIST_PLACEHOLDER,
};
pub use error::{Error, Result};
pub use analyzer::{analyze, analyze_with, InferenceStrategy};
pub use exporter::{export, ExportOutcome};
pub use archive::{assemble_archive, ArchiveOutcome, SPREADSHEET_ENTRY};
#[cfg(feature = "excel")]
pub use sample::{sample_template, sample_template_legacy};
