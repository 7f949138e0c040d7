//! Tipos compartilhados do levantamento
//!
//! - FieldSpec/Schema: estrutura inferida de um modelo de planilha
//! - Record: um preenchimento de formulário (registro de equipamento)
//! - PhotoRef: foto anexada a um registro
//!
//! Os nomes de campo na serialização seguem os arquivos `dados_<usuario>.json`
//! já em produção, para que registros antigos continuem legíveis.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Nome convencional da coluna de fotos em qualquer aba do modelo.
pub const FOTOS_HEADER: &str = "Fotos";

/// Valor de célula que marca uma coluna como entrada livre na
/// heurística de conteúdo (comparação sem distinção de maiúsculas).
pub const FREE_ENTRY_MARKER: &str = "Digitável";

/// Opção reserva exibida quando o intervalo de uma validação de lista
/// não pôde ser resolvido.
pub const UNRESOLVED_LIST_PLACEHOLDER: &str = "(opções indisponíveis)";

/// Tipo de campo inferido para uma coluna
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Entrada livre de texto
    #[serde(rename = "texto")]
    Text,
    /// Escolha em lista fechada
    #[serde(rename = "selecao")]
    Choice,
}

impl Default for FieldKind {
    fn default() -> Self {
        FieldKind::Text
    }
}

/// Um campo do formulário, derivado de uma coluna do modelo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    /// Texto do cabeçalho (linha 1)
    #[serde(rename = "nome")]
    pub name: String,

    /// Posição da coluna na aba (1 = coluna A)
    #[serde(rename = "coluna")]
    pub column: u32,

    #[serde(rename = "tipo")]
    pub kind: FieldKind,

    /// Opções da lista, na ordem do modelo (vazio para campos de texto)
    #[serde(rename = "opcoes", skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

/// Campos de uma aba do modelo, na ordem das colunas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSchema {
    /// Nome da aba (= tipo de equipamento)
    #[serde(rename = "aba")]
    pub name: String,

    #[serde(rename = "campos")]
    pub fields: Vec<FieldSpec>,
}

/// Estrutura completa inferida de um modelo, na ordem das abas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    #[serde(rename = "abas")]
    pub sheets: Vec<SheetSchema>,
}

impl Schema {
    /// Busca os campos de uma aba pelo nome exato.
    pub fn sheet(&self, name: &str) -> Option<&SheetSchema> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Nomes das abas, na ordem do modelo.
    pub fn equipment_types(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Foto anexada a um registro. O arquivo físico nunca é copiado no
/// anexo; só na montagem do pacote de exportação.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoRef {
    /// Caminho do arquivo no disco do técnico
    #[serde(rename = "caminho")]
    pub physical_path: PathBuf,

    /// Nome do arquivo dentro do pacote exportado (ex.: `foto_01.jpg`)
    #[serde(rename = "nome_exportacao")]
    pub export_name: String,

    #[serde(rename = "nome_original")]
    pub original_name: String,
}

/// Um registro de levantamento: o preenchimento de um formulário para
/// uma unidade consumidora e um tipo de equipamento.
///
/// Registros nunca são alterados depois de criados; só removidos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    /// Identificador gerado na criação (`%Y%m%d%H%M%S`)
    pub id: String,

    /// Código da unidade consumidora (UC)
    #[serde(rename = "cod_instalacao")]
    pub installation_code: String,

    /// Tipo de equipamento = nome da aba do modelo
    #[serde(rename = "tipo_equipamento")]
    pub equipment_type: String,

    /// Data e hora do preenchimento (`%d/%m/%Y %H:%M:%S`, horário de Brasília)
    #[serde(rename = "data_hora")]
    pub recorded_at: String,

    /// Usuário que preencheu
    #[serde(rename = "responsavel")]
    pub responsible: String,

    /// Respostas do formulário: nome do campo → valor digitado
    #[serde(rename = "dados")]
    pub fields: BTreeMap<String, String>,

    /// Fotos anexadas (ausente nos registros antigos)
    #[serde(rename = "fotos", skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<PhotoRef>,
}

impl Record {
    /// Nomes de exportação das fotos anexadas, na ordem do anexo.
    pub fn photo_export_names(&self) -> Vec<&str> {
        self.photos.iter().map(|p| p.export_name.as_str()).collect()
    }
}
