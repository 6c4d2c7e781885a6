pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::{debug, info};

pub async fn run<R, W>(config_path: Option<&str>, input: R, output: W) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    info!("Equal-weight trade sizer starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let token = config.api_token()?;
    let provider = providers::IexCloudProvider::new(&config.provider.base_url, &token);

    cli::trades::run(&config, &provider, input, output).await?;
    Ok(())
}
