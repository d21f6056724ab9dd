use anyhow::{Context, Result};
use catalog_harvester::application::{HarvestError, HarvestSession, SessionConfig};
use catalog_harvester::infrastructure::{
    init_logging_with_config, log_system_info, ConfigManager, HttpClient, OutputWriter,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let started_at = Utc::now();

    let config_manager = ConfigManager::new()?;
    let config = config_manager.initialize_on_first_run().await?;

    init_logging_with_config(&config.logging)?;
    log_system_info();
    info!("Configuration: {:?}", config_manager.config_path());

    let session_config = SessionConfig::from_app_config(&config)?;
    let http_client =
        HttpClient::with_config(&config.http).map_err(|e| HarvestError::SessionSetup(e.to_string()))?;

    let mut session = HarvestSession::new(session_config, Arc::new(http_client), &config.selectors)?;
    let report = session.run().await?;
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    info!("Run summary: {}", serde_json::to_string(&report)?);

    let mut writer = OutputWriter::new(session.config().output_dir(), &config.output.basename)
        .with_list_delimiter(&config.output.list_delimiter);
    if session.config().timestamp_outputs() {
        writer = writer.with_timestamp(started_at);
    }

    let paths = writer
        .write_all(session.aggregator().records(), &config.output.formats)
        .await
        .context("Failed to write output files")?;
    for path in paths {
        info!("Output: {:?}", path);
    }

    Ok(())
}
