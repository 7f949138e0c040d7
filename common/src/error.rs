//! Tipos de erro do núcleo

use thiserror::Error;

/// Erro comum do núcleo de análise e exportação
#[derive(Error, Debug)]
pub enum Error {
    /// O arquivo enviado não pôde ser lido como planilha.
    #[error("modelo inválido: {0}")]
    InvalidTemplate(String),

    /// A aba não possui linha de cabeçalho.
    #[error("modelo sem cabeçalho na aba '{0}'")]
    EmptyTemplate(String),

    /// Intervalo referenciado por uma validação de lista não pôde ser lido.
    /// Não aborta a análise: a coluna recebe uma opção reserva.
    #[error("intervalo de validação não resolvido: {0}")]
    ValidationRangeUnresolved(String),

    /// Tipo de equipamento sem aba correspondente no modelo.
    /// Não aborta a exportação: o registro é pulado e contabilizado.
    #[error("tipo de equipamento sem aba correspondente: '{0}'")]
    EquipmentTypeMismatch(String),

    /// Falha na serialização do arquivo exportado. Fatal para a chamada.
    #[error("falha ao gravar a planilha exportada: {0}")]
    ExportSerialization(String),

    #[error("erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("erro de JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("erro no contêiner da planilha: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("erro de XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[cfg(feature = "excel")]
    #[error("erro na geração da planilha: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),
}

/// Alias de Result do núcleo
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_template() {
        let error = Error::InvalidTemplate("assinatura zip ausente".to_string());
        let display = format!("{}", error);
        assert_eq!(display, "modelo inválido: assinatura zip ausente");
    }

    #[test]
    fn test_error_display_empty_template() {
        let error = Error::EmptyTemplate("Iluminação".to_string());
        let display = format!("{}", error);
        assert!(display.contains("sem cabeçalho"));
        assert!(display.contains("Iluminação"));
    }

    #[test]
    fn test_error_display_equipment_mismatch() {
        let error = Error::EquipmentTypeMismatch("Geladeira".to_string());
        let display = format!("{}", error);
        assert!(display.contains("sem aba correspondente"));
        assert!(display.contains("Geladeira"));
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "arquivo não encontrado");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn test_error_debug() {
        let error = Error::ExportSerialization("teste".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("ExportSerialization"));
        assert!(debug.contains("teste"));
    }
}
