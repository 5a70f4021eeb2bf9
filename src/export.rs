//! Spreadsheet and PDF export of a cost computation
//!
//! Numbers follow the pt-BR convention: `.` groups thousands, `,` separates
//! two decimals, currency is prefixed with `R$`.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::NaiveDate;
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rgb};
use regex::Regex;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::{CostError, Result};
use crate::models::CostComputation;

pub const REPORT_TITLE: &str = "Relatório de Custo de Produção";
pub const UNMAPPED_LABEL: &str = "Não Mapeado";
const MISSING_UNIT: &str = "N/A";
const SHEET_NAME: &str = "Cálculo de Custo";
const XLSX_CURRENCY: &str = "\"R$\"#,##0.00";
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
const COLUMNS: [&str; 5] = [
    "Matéria-Prima",
    "Quantidade Utilizada",
    "Unidade",
    "Custo Unitário (MP)",
    "Subtotal (R$)",
];

/// One table row of the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub material: String,
    pub total_quantity: f64,
    pub unit: String,
    pub unit_cost: Option<f64>,
    pub subtotal: f64,
}

impl ReportRow {
    /// Display cells in column order
    pub fn cells(&self) -> [String; 5] {
        [
            self.material.clone(),
            format_decimal(self.total_quantity),
            self.unit.clone(),
            self.unit_cost
                .map(format_currency)
                .unwrap_or_else(|| UNMAPPED_LABEL.to_string()),
            format_currency(self.subtotal),
        ]
    }
}

/// Everything an exported document shows, independent of the file format
#[derive(Debug, Clone, PartialEq)]
pub struct CostReport {
    pub product_name: String,
    pub produced_quantity: f64,
    pub export_date: NaiveDate,
    pub total_cost: f64,
    pub unit_cost: f64,
    pub rows: Vec<ReportRow>,
}

impl CostReport {
    pub fn new(
        computation: &CostComputation,
        product_name: &str,
        produced_quantity: f64,
        export_date: NaiveDate,
    ) -> Self {
        let unit_cost = if produced_quantity > 0.0 {
            computation.total_cost / produced_quantity
        } else {
            0.0
        };

        let rows = computation
            .line_items
            .iter()
            .map(|item| ReportRow {
                material: item.material.name.clone(),
                total_quantity: item.total_quantity,
                unit: item
                    .material
                    .standard_unit
                    .clone()
                    .unwrap_or_else(|| MISSING_UNIT.to_string()),
                unit_cost: item.material.unit_cost,
                subtotal: item.subtotal,
            })
            .collect();

        Self {
            product_name: product_name.to_string(),
            produced_quantity,
            export_date,
            total_cost: computation.total_cost,
            unit_cost,
            rows,
        }
    }

    pub fn quantity_label(&self) -> String {
        format!("{} Unidades", self.produced_quantity)
    }

    pub fn date_label(&self) -> String {
        self.export_date.format("%d/%m/%Y").to_string()
    }

    /// Label/value pairs of the header block
    pub fn header(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Produto:", self.product_name.clone()),
            ("Quantidade Produzida:", self.quantity_label()),
            ("Data da Exportação:", self.date_label()),
            ("Custo Total do Lote:", format_currency(self.total_cost)),
            ("Custo por Unidade:", format_currency(self.unit_cost)),
        ]
    }
}

/// `1234.5` -> `1.234,50`
pub fn format_decimal(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    format!("{}{},{}", sign, grouped, fraction)
}

/// `1234.5` -> `R$ 1.234,50`
pub fn format_currency(value: f64) -> String {
    let formatted = format_decimal(value);
    match formatted.strip_prefix('-') {
        Some(magnitude) => format!("-R$ {}", magnitude),
        None => format!("R$ {}", formatted),
    }
}

/// `custo_<product name>.<extension>` with whitespace runs replaced by `_`
pub fn export_file_name(product_name: &str, extension: &str) -> String {
    format!(
        "custo_{}.{}",
        WHITESPACE.replace_all(product_name.trim(), "_"),
        extension
    )
}

/// Build an `.xlsx` workbook for a computation
pub fn to_spreadsheet(
    computation: &CostComputation,
    product_name: &str,
    produced_quantity: f64,
    export_date: NaiveDate,
) -> Result<Vec<u8>> {
    let report = CostReport::new(computation, product_name, produced_quantity, export_date);
    report_to_spreadsheet(&report)
}

pub fn report_to_spreadsheet(report: &CostReport) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    let currency = Format::new().set_num_format(XLSX_CURRENCY);
    let bold_currency = Format::new().set_bold().set_num_format(XLSX_CURRENCY);

    worksheet.write_string_with_format(0, 0, REPORT_TITLE, &bold)?;

    worksheet.write_string(2, 0, "Produto:")?;
    worksheet.write_string(2, 1, &report.product_name)?;
    worksheet.write_string(3, 0, "Quantidade Produzida:")?;
    worksheet.write_string(3, 1, &report.quantity_label())?;
    worksheet.write_string(4, 0, "Data da Exportação:")?;
    worksheet.write_string(4, 1, &report.date_label())?;

    worksheet.write_string(6, 0, "Custo Total do Lote:")?;
    worksheet.write_number_with_format(6, 1, report.total_cost, &bold_currency)?;
    worksheet.write_string(7, 0, "Custo por Unidade:")?;
    worksheet.write_number_with_format(7, 1, report.unit_cost, &bold_currency)?;

    const TABLE_HEADER_ROW: u32 = 9;
    for (col, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(TABLE_HEADER_ROW, col as u16, *title, &bold)?;
    }

    for (i, row) in report.rows.iter().enumerate() {
        let r = TABLE_HEADER_ROW + 1 + i as u32;
        worksheet.write_string(r, 0, &row.material)?;
        worksheet.write_number(r, 1, row.total_quantity)?;
        worksheet.write_string(r, 2, &row.unit)?;
        match row.unit_cost {
            Some(cost) => worksheet.write_number_with_format(r, 3, cost, &currency)?,
            None => worksheet.write_string(r, 3, UNMAPPED_LABEL)?,
        };
        worksheet.write_number_with_format(r, 4, row.subtotal, &currency)?;
    }

    for (col, width) in [30.0, 20.0, 10.0, 20.0, 20.0].into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width)?;
    }

    workbook.push_worksheet(worksheet);
    Ok(workbook.save_to_buffer()?)
}

// A4 page geometry, millimetres from the bottom-left corner
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 14.0;
const FIRST_TABLE_TOP: f32 = 237.0;
const NEXT_TABLE_TOP: f32 = 277.0;
const TABLE_BOTTOM: f32 = 25.0;
const ROW_HEIGHT: f32 = 7.0;
const COLUMN_X: [f32; 5] = [14.0, 84.0, 118.0, 134.0, 168.0];

fn rows_fitting(top: f32) -> usize {
    // one line goes to the column header
    (((top - TABLE_BOTTOM) / ROW_HEIGHT) as usize).saturating_sub(1)
}

/// Split `row_count` table rows into per-page ranges. Always at least one page.
pub fn paginate(row_count: usize) -> Vec<Range<usize>> {
    let mut pages = Vec::new();
    let mut start = 0;
    let mut capacity = rows_fitting(FIRST_TABLE_TOP);

    loop {
        let end = (start + capacity).min(row_count);
        pages.push(start..end);
        if end >= row_count {
            break;
        }
        start = end;
        capacity = rows_fitting(NEXT_TABLE_TOP);
    }
    pages
}

fn export_error(error: impl std::fmt::Display) -> CostError {
    CostError::Export(error.to_string())
}

/// Build an A4 PDF report for a computation
pub fn to_pdf(
    computation: &CostComputation,
    product_name: &str,
    produced_quantity: f64,
    export_date: NaiveDate,
) -> Result<Vec<u8>> {
    let report = CostReport::new(computation, product_name, produced_quantity, export_date);
    report_to_pdf(&report)
}

pub fn report_to_pdf(report: &CostReport) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(REPORT_TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(export_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(export_error)?;

    let pages = paginate(report.rows.len());
    let page_count = pages.len();

    for (page_number, range) in pages.into_iter().enumerate() {
        let layer = if page_number == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        let top = if page_number == 0 {
            draw_header(&layer, report, &regular, &bold);
            FIRST_TABLE_TOP
        } else {
            NEXT_TABLE_TOP
        };

        draw_table(&layer, report, range, top, &regular, &bold);

        layer.use_text(
            format!("Página {} de {}", page_number + 1, page_count),
            10.0,
            Mm(MARGIN_LEFT),
            Mm(10.0),
            &regular,
        );
    }

    doc.save_to_bytes().map_err(export_error)
}

fn draw_header(
    layer: &PdfLayerReference,
    report: &CostReport,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    layer.use_text(REPORT_TITLE, 18.0, Mm(MARGIN_LEFT), Mm(PAGE_HEIGHT - 20.0), bold);

    let left = [
        ("Produto:", report.product_name.clone()),
        ("Quantidade Produzida:", report.quantity_label()),
        ("Data do Relatório:", report.date_label()),
    ];
    for (i, (label, value)) in left.iter().enumerate() {
        let y = Mm(PAGE_HEIGHT - 35.0 - 7.0 * i as f32);
        layer.use_text(*label, 11.0, Mm(MARGIN_LEFT), y, regular);
        layer.use_text(value.as_str(), 11.0, Mm(58.0), y, bold);
    }

    let right = [
        ("Custo Total do Lote:", format_currency(report.total_cost)),
        ("Custo por Unidade:", format_currency(report.unit_cost)),
    ];
    for (i, (label, value)) in right.iter().enumerate() {
        let y = Mm(PAGE_HEIGHT - 35.0 - 7.0 * i as f32);
        layer.use_text(*label, 11.0, Mm(120.0), y, regular);
        layer.set_fill_color(Color::Rgb(Rgb::new(0.16, 0.65, 0.27, None)));
        layer.use_text(value.as_str(), 11.0, Mm(160.0), y, bold);
        layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }
}

fn draw_table(
    layer: &PdfLayerReference,
    report: &CostReport,
    range: Range<usize>,
    top: f32,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let headers = ["Matéria-Prima", "Qtd. Utilizada", "Un.", "Custo Unit. (MP)", "Subtotal"];
    for (x, title) in COLUMN_X.iter().zip(headers) {
        layer.use_text(title, 10.0, Mm(*x), Mm(top), bold);
    }

    for (line, row) in report.rows[range].iter().enumerate() {
        let y = Mm(top - ROW_HEIGHT * (line + 1) as f32);
        let mut cells = row.cells();
        cells[0] = truncate(&cells[0], 36);
        for (x, cell) in COLUMN_X.iter().zip(cells) {
            layer.use_text(cell, 9.0, Mm(*x), y, regular);
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars - 1).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::compute_cost;
    use crate::models::RawMaterialUsage;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn computation() -> CostComputation {
        let materials = vec![
            RawMaterialUsage {
                name: "Aço".to_string(),
                quantity_used_per_unit: 2.0,
                standard_unit: Some("KG".to_string()),
                unit_cost: Some(5.0),
                ..Default::default()
            },
            RawMaterialUsage {
                name: "Cola".to_string(),
                quantity_used_per_unit: 1.0,
                ..Default::default()
            },
        ];
        compute_cost(&materials, 3.0).unwrap()
    }

    #[test]
    fn decimal_formatting() {
        assert_eq!(format_decimal(0.0), "0,00");
        assert_eq!(format_decimal(6.0), "6,00");
        assert_eq!(format_decimal(999.999), "1.000,00");
        assert_eq!(format_decimal(1234.5), "1.234,50");
        assert_eq!(format_decimal(1234567.891), "1.234.567,89");
        assert_eq!(format_decimal(-12.3), "-12,30");
        assert_eq!(format_decimal(-0.001), "0,00");
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(30.0), "R$ 30,00");
        assert_eq!(format_currency(1234.5), "R$ 1.234,50");
        assert_eq!(format_currency(-1.0), "-R$ 1,00");
    }

    #[test]
    fn report_unit_cost_guards_zero_quantity() {
        let report = CostReport::new(&computation(), "Mesa", 0.0, date());
        assert_eq!(report.unit_cost, 0.0);
        assert_eq!(report.header()[4].1, "R$ 0,00");
    }

    #[test]
    fn file_names_replace_whitespace() {
        assert_eq!(export_file_name("Mesa de  Jantar", "xlsx"), "custo_Mesa_de_Jantar.xlsx");
        assert_eq!(export_file_name("Cadeira\tAlta", "pdf"), "custo_Cadeira_Alta.pdf");
    }

    #[test]
    fn report_header_and_rows() {
        let report = CostReport::new(&computation(), "Mesa", 3.0, date());

        let header = report.header();
        assert_eq!(header[0], ("Produto:", "Mesa".to_string()));
        assert_eq!(header[1].1, "3 Unidades");
        assert_eq!(header[2].1, "09/03/2024");
        assert_eq!(header[3].1, "R$ 30,00");
        assert_eq!(header[4].1, "R$ 10,00");

        assert_eq!(
            report.rows[0].cells(),
            ["Aço", "6,00", "KG", "R$ 5,00", "R$ 30,00"].map(String::from)
        );
        assert_eq!(
            report.rows[1].cells(),
            ["Cola", "3,00", "N/A", "Não Mapeado", "R$ 0,00"].map(String::from)
        );
    }

    #[test]
    fn pagination_covers_every_row_once() {
        assert_eq!(paginate(0), vec![0..0]);
        assert_eq!(paginate(5), vec![0..5]);

        let first = rows_fitting(FIRST_TABLE_TOP);
        let next = rows_fitting(NEXT_TABLE_TOP);
        let pages = paginate(first + next + 1);
        assert_eq!(pages, vec![0..first, first..first + next, first + next..first + next + 1]);
    }

    #[test]
    fn spreadsheet_is_a_zip_archive() {
        let bytes = to_spreadsheet(&computation(), "Mesa", 3.0, date()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn pdf_has_pdf_signature() {
        let bytes = to_pdf(&computation(), "Mesa", 3.0, date()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_pdf_spans_several_pages() {
        let materials: Vec<_> = (0..80)
            .map(|i| RawMaterialUsage {
                name: format!("Material {}", i),
                quantity_used_per_unit: 1.0,
                unit_cost: Some(1.0),
                ..Default::default()
            })
            .collect();
        let computation = compute_cost(&materials, 1.0).unwrap();
        assert_eq!(paginate(computation.line_items.len()).len(), 3);
        let bytes = to_pdf(&computation, "Grande", 1.0, date()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
