//! Interactive portfolio value input

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use std::io::{BufRead, Write};
use tracing::debug;

pub const PORTFOLIO_PROMPT: &str = "Enter the value of your portfolio (USD$): ";

const CANCEL_WORDS: [&str; 3] = ["q", "quit", "exit"];

/// Parses a positive dollar amount, tolerating a leading `$` and `,` separators.
pub fn parse_portfolio_value(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    cleaned
        .parse::<Decimal>()
        .ok()
        .filter(|v| *v > Decimal::ZERO)
}

/// Prompts until a valid portfolio value is entered.
///
/// `max_attempts` of `None` keeps asking; otherwise the last failed attempt
/// becomes an error. End of input or a cancel word aborts.
pub fn prompt_portfolio_value<R, W>(
    mut input: R,
    mut output: W,
    max_attempts: Option<usize>,
) -> Result<Decimal>
where
    R: BufRead,
    W: Write,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        write!(output, "{PORTFOLIO_PROMPT}")?;
        output.flush()?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read portfolio value")?;
        let entry = line.trim();

        if read == 0 || CANCEL_WORDS.contains(&entry.to_lowercase().as_str()) {
            bail!("Portfolio value input cancelled");
        }

        if let Some(value) = parse_portfolio_value(entry) {
            debug!(%value, attempt, "Accepted portfolio value");
            return Ok(value);
        }

        if max_attempts.is_some_and(|max| attempt >= max) {
            bail!("Invalid portfolio value: '{}'", entry);
        }
        writeln!(output, "Error: '{entry}' is not a positive number")?;
    }
}
