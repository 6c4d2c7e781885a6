pub mod setup;
pub mod trades;
pub mod ui;
