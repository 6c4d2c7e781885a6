//! Recommended trades spreadsheet

use crate::core::allocation::AllocationRow;
use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, XlsxError};
use std::io::Write;
use std::path::Path;
use tracing::debug;

pub const SHEET_NAME: &str = "Recommended Trades";
pub const HEADERS: [&str; 4] = [
    "Ticker",
    "Stock Price",
    "Market Capitalization",
    "Number of Shares to Buy",
];
pub const NOT_AVAILABLE: &str = "N/A";

const COLUMN_WIDTH: f64 = 18.0;
const HEADER_BACKGROUND: u32 = 0x0A0A23;
const HEADER_FONT: u32 = 0xFFFFFF;

struct Formats {
    header: Format,
    text: Format,
    dollar: Format,
    integer: Format,
}

impl Formats {
    fn new() -> Self {
        let bordered = Format::new().set_border(FormatBorder::Thin);
        Formats {
            header: bordered
                .clone()
                .set_bold()
                .set_font_color(Color::RGB(HEADER_FONT))
                .set_background_color(Color::RGB(HEADER_BACKGROUND)),
            text: bordered.clone(),
            dollar: bordered.clone().set_num_format("$0.00"),
            integer: bordered.set_num_format("0"),
        }
    }
}

/// Renders the allocation rows into an in-memory xlsx workbook.
pub fn render_workbook(rows: &[AllocationRow]) -> Result<Vec<u8>, XlsxError> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let columns = [
        &formats.text,
        &formats.dollar,
        &formats.dollar,
        &formats.integer,
    ];
    for (col, (header, format)) in HEADERS.iter().zip(columns).enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, COLUMN_WIDTH)?;
        sheet.set_column_format(col, format)?;
        sheet.write_string_with_format(0, col, *header, &formats.header)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string_with_format(r, 0, &row.symbol, &formats.text)?;

        for (col, value) in [(1, row.price), (2, row.market_cap)] {
            match value.and_then(|v| v.to_f64()) {
                Some(v) => sheet.write_number_with_format(r, col, v, &formats.dollar)?,
                None => sheet.write_blank(r, col, &formats.dollar)?,
            };
        }

        match row.shares {
            Ok(shares) => sheet.write_number_with_format(r, 3, shares as f64, &formats.integer)?,
            Err(_) => sheet.write_string_with_format(r, 3, NOT_AVAILABLE, &formats.text)?,
        };
    }

    workbook.save_to_buffer()
}

/// Writes the recommended trades to `path`.
///
/// The workbook goes to a temporary file next to `path` and is renamed into
/// place once complete; on any failure no file is left at `path`.
pub fn write_recommended_trades<P: AsRef<Path>>(path: P, rows: &[AllocationRow]) -> Result<()> {
    let path = path.as_ref();
    let buffer = render_workbook(rows)
        .with_context(|| format!("Failed to render spreadsheet for {}", path.display()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".equalweight-")
        .suffix(".xlsx")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    tmp.write_all(&buffer)
        .and_then(|_| tmp.as_file().sync_all())
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;

    tmp.persist(path)
        .with_context(|| format!("Failed to save output file: {}", path.display()))?;

    debug!(rows = rows.len(), path = %path.display(), "Saved spreadsheet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocation::Unpriceable;
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn row(
        symbol: &str,
        price: Option<Decimal>,
        shares: Result<u64, Unpriceable>,
    ) -> AllocationRow {
        AllocationRow {
            symbol: symbol.to_string(),
            price,
            market_cap: price.map(|p| p * dec!(1000)),
            position_size: dec!(5000),
            shares,
        }
    }

    fn read_back(path: &Path) -> Vec<Vec<Data>> {
        let mut workbook: Xlsx<_> = open_workbook(path).expect("Failed to open workbook");
        let range = workbook
            .worksheet_range(SHEET_NAME)
            .expect("Missing worksheet");
        range.rows().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("trades.xlsx");
        let rows = vec![
            row("A", Some(dec!(100)), Ok(50)),
            row("B", Some(dec!(250)), Ok(20)),
            row("ZERO", Some(Decimal::ZERO), Err(Unpriceable::NonPositivePrice(Decimal::ZERO))),
            row("GONE", None, Err(Unpriceable::MissingQuote)),
        ];

        write_recommended_trades(&path, &rows).unwrap();
        let sheet = read_back(&path);

        assert_eq!(sheet.len(), 5);
        let headers: Vec<String> = sheet[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(headers, HEADERS);

        let tickers: Vec<String> = sheet[1..].iter().map(|r| r[0].to_string()).collect();
        assert_eq!(tickers, vec!["A", "B", "ZERO", "GONE"]);

        assert_eq!(sheet[1][1], Data::Float(100.0));
        assert_eq!(sheet[1][2], Data::Float(100_000.0));
        assert_eq!(sheet[1][3], Data::Float(50.0));
        assert_eq!(sheet[2][3], Data::Float(20.0));
        assert_eq!(sheet[3][3], Data::String(NOT_AVAILABLE.to_string()));
        assert_eq!(sheet[4][3], Data::String(NOT_AVAILABLE.to_string()));
    }

    #[test]
    fn test_leaves_no_temp_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("trades.xlsx");
        write_recommended_trades(&path, &[row("A", Some(dec!(1)), Ok(1))]).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("trades.xlsx")]);
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("trades.xlsx");
        std::fs::write(&path, "stale").unwrap();

        write_recommended_trades(&path, &[row("A", Some(dec!(1)), Ok(1))]).unwrap();
        assert_eq!(read_back(&path).len(), 2);
    }

    #[test]
    fn test_unwritable_path_names_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("trades.xlsx");

        let err = write_recommended_trades(&path, &[]).unwrap_err();
        assert!(err.to_string().contains("trades.xlsx"));
        assert!(!path.exists());
    }
}
