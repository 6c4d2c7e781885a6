use super::ui;
use crate::core::allocation::{self, Allocation};
use crate::core::config::AppConfig;
use crate::core::prompt;
use crate::core::quote::{self, Quote, QuoteProvider};
use crate::core::{report, tickers};
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use indicatif::ProgressBar;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

/// Fetches quotes for every ticker, one batch at a time.
///
/// The result is aligned with `tickers`.
pub async fn fetch_quotes(
    provider: &(dyn QuoteProvider + Send + Sync),
    tickers: &[String],
    batch_size: usize,
) -> Result<Vec<Option<Quote>>> {
    let total = tickers.len().div_ceil(batch_size.max(1));
    let pb = ui::new_progress_bar(total as u64, true);
    pb.set_message("Fetching quotes...");

    fetch_quotes_with_progress(provider, tickers, batch_size, &pb).await
}

/// Same as [`fetch_quotes`], reporting to `pb`. The bar is cleared on every exit.
async fn fetch_quotes_with_progress(
    provider: &(dyn QuoteProvider + Send + Sync),
    tickers: &[String],
    batch_size: usize,
    pb: &ProgressBar,
) -> Result<Vec<Option<Quote>>> {
    let result = fetch_all_batches(provider, tickers, batch_size, pb).await;
    pb.finish_and_clear();
    result
}

async fn fetch_all_batches(
    provider: &(dyn QuoteProvider + Send + Sync),
    tickers: &[String],
    batch_size: usize,
    pb: &ProgressBar,
) -> Result<Vec<Option<Quote>>> {
    let mut quotes: Vec<Option<Quote>> = vec![None; tickers.len()];
    let total = tickers.len().div_ceil(batch_size.max(1));

    let mut offset = 0;
    for (i, batch) in quote::batches(tickers, batch_size).enumerate() {
        let describe = || {
            format!(
                "Failed to fetch batch {}/{} ({} symbols, {}..{})",
                i + 1,
                total,
                batch.len(),
                batch[0],
                batch[batch.len() - 1]
            )
        };

        debug!(batch = i + 1, total, size = batch.len(), "Fetching quote batch");
        let fetched = provider.fetch_batch(batch).await.with_context(describe)?;
        if fetched.len() != batch.len() {
            bail!(
                "{}: expected {} quotes, got {}",
                describe(),
                batch.len(),
                fetched.len()
            );
        }

        for (slot, quote) in quotes[offset..offset + batch.len()].iter_mut().zip(fetched) {
            *slot = quote;
        }
        offset += batch.len();
        pb.inc(1);
    }

    Ok(quotes)
}

/// Runs the whole pipeline: tickers, portfolio value, quotes, allocation, spreadsheet.
pub async fn run<R, W>(
    config: &AppConfig,
    provider: &(dyn QuoteProvider + Send + Sync),
    input: R,
    mut output: W,
) -> Result<Allocation>
where
    R: BufRead,
    W: Write,
{
    let tickers = tickers::load_tickers(&config.tickers_path)?;
    info!(count = tickers.len(), "Loaded ticker list");

    let portfolio_value = prompt::prompt_portfolio_value(input, &mut output, None)?;

    let quotes = fetch_quotes(provider, &tickers, config.provider.batch_size).await?;
    let allocation = allocation::allocate(&tickers, &quotes, portfolio_value);

    for (row, reason) in allocation.unpriceable() {
        warn!(symbol = %row.symbol, %reason, "Skipping unpriceable ticker");
    }

    report::write_recommended_trades(&config.output_path, &allocation.rows)?;
    info!(path = %config.output_path.display(), "Wrote recommended trades");

    writeln!(output, "{}", display_summary(&allocation))?;
    writeln!(output, "Saved. Data in {}", config.output_path.display())?;
    Ok(allocation)
}

fn display_summary(allocation: &Allocation) -> String {
    let priced = allocation.rows.len() - allocation.unpriceable().count();

    let mut out = format!(
        "\n{}\n\n",
        ui::style_text("Recommended Trades", ui::StyleType::Title)
    );
    out.push_str(&format!(
        "Portfolio value: {}\nTickers: {} ({} priced)\nPosition size: {}\n",
        ui::dollars(allocation.portfolio_value),
        allocation.rows.len(),
        priced,
        ui::dollars(allocation.position_size),
    ));
    out.push_str(&format!(
        "{} {}\n{} {}\n",
        ui::style_text("Total cost:", ui::StyleType::TotalLabel),
        ui::style_text(&ui::dollars(allocation.total_cost()), ui::StyleType::TotalValue),
        ui::style_text("Uninvested cash:", ui::StyleType::TotalLabel),
        ui::style_text(&ui::dollars(allocation.uninvested()), ui::StyleType::Subtle),
    ));

    if priced < allocation.rows.len() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Ticker"),
            ui::header_cell("Price"),
            ui::header_cell("Reason"),
        ]);
        for (row, reason) in allocation.unpriceable() {
            table.add_row(vec![
                Cell::new(&row.symbol),
                ui::format_optional_cell(row.price, ui::dollars),
                Cell::new(ui::style_text(&reason.to_string(), ui::StyleType::Error)),
            ]);
        }
        out.push_str(&format!(
            "\n{}\n{table}\n",
            ui::style_text("Unpriceable tickers (no shares recommended):", ui::StyleType::Error)
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockQuoteProvider {
        prices: HashMap<String, Decimal>,
        calls: Mutex<Vec<Vec<String>>>,
        fail_on: Option<String>,
    }

    impl MockQuoteProvider {
        fn new(prices: &[(&str, Decimal)]) -> Self {
            Self {
                prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
                calls: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl QuoteProvider for MockQuoteProvider {
        async fn fetch_batch(&self, symbols: &[String]) -> anyhow::Result<Vec<Option<Quote>>> {
            self.calls.lock().unwrap().push(symbols.to_vec());
            if let Some(bad) = &self.fail_on {
                if symbols.contains(bad) {
                    return Err(anyhow!("HTTP error: 500 Internal Server Error"));
                }
            }
            Ok(symbols
                .iter()
                .map(|s| {
                    self.prices.get(s).map(|p| Quote {
                        symbol: s.clone(),
                        price: Some(*p),
                        market_cap: Some(p * dec!(1000)),
                    })
                })
                .collect())
        }
    }

    fn tickers(len: usize) -> Vec<String> {
        (0..len).map(|i| format!("T{i}")).collect()
    }

    #[tokio::test]
    async fn test_fetch_quotes_batches_in_order() {
        let symbols = tickers(250);
        let prices: Vec<(String, Decimal)> = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), Decimal::from(i + 1)))
            .collect();
        let refs: Vec<(&str, Decimal)> = prices.iter().map(|(s, p)| (s.as_str(), *p)).collect();
        let provider = MockQuoteProvider::new(&refs);

        let quotes = fetch_quotes(&provider, &symbols, 100).await.unwrap();

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![100, 100, 50]
        );
        assert_eq!(quotes.len(), 250);
        for (i, quote) in quotes.iter().enumerate() {
            let quote = quote.as_ref().unwrap();
            assert_eq!(quote.symbol, symbols[i]);
            assert_eq!(quote.price, Some(Decimal::from(i + 1)));
        }
    }

    #[tokio::test]
    async fn test_fetch_quotes_error_names_batch() {
        let symbols = tickers(150);
        let mut provider = MockQuoteProvider::new(&[]);
        provider.fail_on = Some("T120".to_string());

        let err = fetch_quotes(&provider, &symbols, 100).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch batch 2/2 (50 symbols, T100..T149)"
        );
        assert!(format!("{err:#}").contains("HTTP error: 500"));
    }

    #[tokio::test]
    async fn test_fetch_quotes_clears_progress_on_error() {
        let symbols = tickers(150);
        let mut provider = MockQuoteProvider::new(&[]);
        provider.fail_on = Some("T0".to_string());

        let pb = ProgressBar::hidden();
        let result = fetch_quotes_with_progress(&provider, &symbols, 100, &pb).await;
        assert!(result.is_err());
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 0);
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_quotes_clears_progress_on_success() {
        let symbols = tickers(3);
        let provider = MockQuoteProvider::new(&[("T0", dec!(1.25))]);

        let pb = ProgressBar::hidden();
        let quotes = fetch_quotes_with_progress(&provider, &symbols, 2, &pb)
            .await
            .unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 2);
        assert_eq!(quotes[0].as_ref().unwrap().price, Some(dec!(1.25)));
        assert!(quotes[1].is_none());
    }

    #[tokio::test]
    async fn test_run_writes_spreadsheet() {
        let dir = tempfile::TempDir::new().unwrap();
        let tickers_path = dir.path().join("tickers.csv");
        std::fs::write(&tickers_path, "Ticker\nA\nB\nZERO\nGONE\n").unwrap();

        let config = AppConfig {
            tickers_path,
            output_path: dir.path().join("trades.xlsx"),
            ..AppConfig::default()
        };
        let provider = MockQuoteProvider::new(&[("A", dec!(100)), ("B", dec!(250)), ("ZERO", Decimal::ZERO)]);

        let mut output = Vec::new();
        let allocation = run(&config, &provider, "abc\n20000\n".as_bytes(), &mut output)
            .await
            .unwrap();

        assert_eq!(allocation.position_size, dec!(5000));
        assert_eq!(allocation.rows[0].shares, Ok(50));
        assert_eq!(allocation.rows[1].shares, Ok(20));
        assert!(allocation.rows[2].shares.is_err());
        assert!(allocation.rows[3].shares.is_err());
        assert!(config.output_path.exists());

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Error: 'abc' is not a positive number"));
        assert!(output.contains("ZERO"));
        assert!(output.contains("no quote returned"));
        assert!(output.contains(&format!("Saved. Data in {}", config.output_path.display())));
    }

    #[tokio::test]
    async fn test_run_missing_ticker_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig {
            tickers_path: dir.path().join("missing.csv"),
            output_path: dir.path().join("trades.xlsx"),
            ..AppConfig::default()
        };
        let provider = MockQuoteProvider::new(&[]);

        let err = run(&config, &provider, "100\n".as_bytes(), Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
        assert!(provider.calls.lock().unwrap().is_empty());
        assert!(!config.output_path.exists());
    }
}
