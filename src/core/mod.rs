//! Core business logic abstractions

pub mod allocation;
pub mod config;
pub mod log;
pub mod prompt;
pub mod quote;
pub mod report;
pub mod tickers;

// Re-export main types for cleaner imports
pub use allocation::{Allocation, AllocationRow, Unpriceable};
pub use quote::{Quote, QuoteProvider};
