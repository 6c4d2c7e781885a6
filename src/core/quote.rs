//! Quote abstractions and batching

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Upper bound on symbols per batch quote call.
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: Option<Decimal>,
    pub market_cap: Option<Decimal>,
}

/// Source of latest quotes for a batch of symbols.
///
/// The returned vector is aligned with `symbols`: entry `i` holds the quote
/// for `symbols[i]`, or `None` when the source has nothing for that symbol.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_batch(&self, symbols: &[String]) -> Result<Vec<Option<Quote>>>;
}

/// Splits `symbols` into consecutive batches of at most `size` entries.
pub fn batches<T>(symbols: &[T], size: usize) -> impl Iterator<Item = &[T]> {
    symbols.chunks(size.max(1))
}
