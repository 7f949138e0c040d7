//! Modelo de demonstração
//!
//! Gera o modelo de duas abas usado na documentação e nos testes:
//! `Ar Condicionado` e `Iluminação`, com validações de lista nas
//! colunas de escolha. A variante legada troca as validações por
//! linhas de conteúdo, no jeito dos modelos antigos.

use rust_xlsxwriter::{
    Color, DataValidation, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
};

use crate::error::Result;

// última linha da grade, índice 0-based
const LAST_ROW: u32 = 1_048_575;

/// Modelo de exemplo com validações de lista nas colunas de escolha.
pub fn sample_template() -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = header_format();

    let ws = workbook.add_worksheet();
    ws.set_name("Ar Condicionado")?;
    write_headers(ws, &["Local", "BTUs", "Tecnologia", "Marca", "Fotos"], &header)?;
    ws.add_data_validation(
        1,
        1,
        LAST_ROW,
        1,
        &DataValidation::new().allow_list_strings(&["9000", "12000", "18000", "24000", "30000"])?,
    )?;
    ws.add_data_validation(
        1,
        2,
        LAST_ROW,
        2,
        &DataValidation::new().allow_list_strings(&["Inverter", "Convencional"])?,
    )?;

    let ws = workbook.add_worksheet();
    ws.set_name("Iluminação")?;
    write_headers(
        ws,
        &["Ambiente", "Tipo Lâmpada", "Potência (W)", "Qtd", "Fotos"],
        &header,
    )?;
    ws.add_data_validation(
        1,
        1,
        LAST_ROW,
        1,
        &DataValidation::new().allow_list_strings(&[
            "LED",
            "Fluorescente",
            "Incandescente",
            "Vapor de Sódio",
        ])?,
    )?;

    Ok(workbook.save_to_buffer()?)
}

/// Variante sem validação nenhuma: as colunas de escolha carregam os
/// valores possíveis como linhas de conteúdo e as de texto levam o
/// marcador de entrada livre, como nos modelos antigos.
pub fn sample_template_legacy() -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = header_format();

    let ws = workbook.add_worksheet();
    ws.set_name("Ar Condicionado")?;
    write_headers(ws, &["Local", "BTUs", "Tecnologia", "Marca", "Fotos"], &header)?;
    ws.write_string(1, 0, "Digitável")?;
    ws.write_string(1, 1, "9000")?;
    ws.write_string(2, 1, "12000")?;
    ws.write_string(3, 1, "18000")?;
    ws.write_string(1, 2, "Inverter")?;
    ws.write_string(2, 2, "Convencional")?;
    ws.write_string(1, 3, "Digitável")?;

    let ws = workbook.add_worksheet();
    ws.set_name("Iluminação")?;
    write_headers(
        ws,
        &["Ambiente", "Tipo Lâmpada", "Potência (W)", "Qtd", "Fotos"],
        &header,
    )?;
    ws.write_string(1, 0, "Digitável")?;
    ws.write_string(1, 1, "LED")?;
    ws.write_string(2, 1, "Fluorescente")?;
    ws.write_string(3, 1, "Incandescente")?;
    ws.write_string(1, 2, "Digitável")?;
    ws.write_string(1, 3, "Digitável")?;

    Ok(workbook.save_to_buffer()?)
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD9E1F2))
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
}

fn write_headers(ws: &mut Worksheet, names: &[&str], format: &Format) -> Result<()> {
    for (col, name) in names.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *name, format)?;
        ws.set_column_width(col as u16, 18)?;
    }
    Ok(())
}
