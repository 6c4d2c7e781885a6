use crate::core::quote::Quote;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt::Display;

/// Why a row could not be turned into a share count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unpriceable {
    MissingQuote,
    MissingPrice,
    NonPositivePrice(Decimal),
    ShareCountOutOfRange,
}

impl Display for Unpriceable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unpriceable::MissingQuote => write!(f, "no quote returned"),
            Unpriceable::MissingPrice => write!(f, "quote has no price"),
            Unpriceable::NonPositivePrice(price) => write!(f, "non-positive price {price}"),
            Unpriceable::ShareCountOutOfRange => write!(f, "share count out of range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRow {
    pub symbol: String,
    pub price: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub position_size: Decimal,
    pub shares: Result<u64, Unpriceable>,
}

impl AllocationRow {
    pub fn cost(&self) -> Decimal {
        match (self.shares, self.price) {
            (Ok(shares), Some(price)) => Decimal::from(shares) * price,
            _ => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub portfolio_value: Decimal,
    pub position_size: Decimal,
    pub rows: Vec<AllocationRow>,
}

impl Allocation {
    /// Dollar amount spent by the recommended trades.
    pub fn total_cost(&self) -> Decimal {
        self.rows.iter().map(AllocationRow::cost).sum()
    }

    pub fn uninvested(&self) -> Decimal {
        self.portfolio_value - self.total_cost()
    }

    pub fn unpriceable(&self) -> impl Iterator<Item = (&AllocationRow, Unpriceable)> {
        self.rows
            .iter()
            .filter_map(|row| row.shares.err().map(|reason| (row, reason)))
    }
}

/// Equal share of `portfolio_value` for each of `count` constituents.
pub fn position_size(portfolio_value: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    portfolio_value / Decimal::from(count)
}

/// Whole shares affordable with `position_size` at `price`.
pub fn shares_to_buy(price: Decimal, position_size: Decimal) -> Result<u64, Unpriceable> {
    if price <= Decimal::ZERO {
        return Err(Unpriceable::NonPositivePrice(price));
    }
    position_size
        .checked_div(price)
        .map(|shares| shares.floor().max(Decimal::ZERO))
        .and_then(|shares| shares.to_u64())
        .ok_or(Unpriceable::ShareCountOutOfRange)
}

/// Builds one row per ticker, in ticker order.
///
/// `quotes` must be aligned with `tickers`; a `None` entry marks a symbol the
/// quote source did not return.
pub fn allocate(
    tickers: &[String],
    quotes: &[Option<Quote>],
    portfolio_value: Decimal,
) -> Allocation {
    let position_size = position_size(portfolio_value, tickers.len());

    let rows = tickers
        .iter()
        .enumerate()
        .map(|(i, symbol)| {
            let quote = quotes.get(i).and_then(Option::as_ref);
            let price = quote.and_then(|q| q.price);
            let shares = match (quote, price) {
                (None, _) => Err(Unpriceable::MissingQuote),
                (Some(_), None) => Err(Unpriceable::MissingPrice),
                (Some(_), Some(price)) => shares_to_buy(price, position_size),
            };
            AllocationRow {
                symbol: symbol.clone(),
                price,
                market_cap: quote.and_then(|q| q.market_cap),
                position_size,
                shares,
            }
        })
        .collect();

    Allocation {
        portfolio_value,
        position_size,
        rows,
    }
}
