use anyhow::Result;
use std::path::Path;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

use adsieve::config::Config;
use adsieve::engine::SettingsUpdate;
use adsieve::init::setup_logging;
use adsieve::pipeline::{Decision, RequestDetails};
use adsieve::service::AdblockService;
use adsieve::session::MemorySession;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "adsieve.toml".to_string());
    let config_exists = Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting adsieve...");
    if !config_exists {
        info!("Config file {} not found, using defaults.", config_path);
    }

    // 3. Service + one session standing in for the browser
    let service = AdblockService::start(config)?;
    let session = MemorySession::new("stdin");
    service.bind_session(&session);
    let settings_tx = service.settings_sender();

    // 4. Request loop
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received.");
                break;
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(arg) = line.strip_prefix(":adblock") {
            let enabled = match arg.trim() {
                "on" => true,
                "off" => false,
                other => {
                    warn!("Expected ':adblock on|off', got '{}'", other);
                    continue;
                }
            };
            settings_tx.send(SettingsUpdate::adblock(enabled)).await?;
            stdout
                .write_all(format!("adblock {}\n", if enabled { "on" } else { "off" }).as_bytes())
                .await?;
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(url) = parts.next() else { continue };
        let mut details = RequestDetails::new(url, parts.next().unwrap_or("other"));
        if let Some(referrer) = parts.next() {
            details = details.with_referrer(referrer);
        }

        let kind = details.resource_type.clone();
        let decision = session.dispatch(details).await;
        let verdict = match decision {
            Decision::Allow => "allow".to_string(),
            Decision::Cancel => "cancel".to_string(),
            Decision::Redirect(target) => format!("redirect {target}"),
        };
        stdout
            .write_all(format!("{verdict}\t{url}\n").as_bytes())
            .await?;

        if kind == "mainFrame" && service.dom_cleaner_for(url).is_some() {
            stdout
                .write_all(format!("inject-dom-cleaner\t{url}\n").as_bytes())
                .await?;
        }
        stdout.flush().await?;
    }

    let stats = service.stats();
    info!(
        "Processed {} requests ({} cancelled, {} redirected)",
        stats.total_requests, stats.cancelled, stats.redirected
    );
    Ok(())
}
