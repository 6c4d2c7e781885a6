use anyhow::{Context, Result, anyhow, bail};
use std::io::Read;
use std::path::Path;
use tracing::debug;

const TICKER_COLUMN: &str = "Ticker";

/// Loads the ordered ticker list from a CSV file with a `Ticker` column.
pub fn load_tickers<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open ticker file: {}", path.display()))?;

    let tickers = read_tickers(file)
        .with_context(|| format!("Failed to read ticker file: {}", path.display()))?;
    debug!(count = tickers.len(), path = %path.display(), "Loaded tickers");
    Ok(tickers)
}

/// Reads tickers from CSV data, keeping file order and skipping blank cells.
pub fn read_tickers<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let column = rdr
        .headers()?
        .iter()
        .position(|h| h == TICKER_COLUMN)
        .ok_or_else(|| anyhow!("Missing '{}' column", TICKER_COLUMN))?;

    let mut tickers = Vec::new();
    for record in rdr.records() {
        let record = record?;
        match record.get(column) {
            Some(symbol) if !symbol.is_empty() => tickers.push(symbol.to_string()),
            _ => continue,
        }
    }

    if tickers.is_empty() {
        bail!("No tickers found");
    }
    Ok(tickers)
}
