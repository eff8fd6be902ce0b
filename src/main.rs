use alliance_monitor::models::RunOutcome;
use alliance_monitor::plugins::notifiers::TelegramNotifier;
use alliance_monitor::utils::logging::{self, LIFECYCLE};
use alliance_monitor::{AllianceMonitor, AppConfig};
use anyhow::{Context, Result, anyhow};
use tokio::sync::watch;
use tracing::{error, info};

const BANNER: &str = r#"
╔═══════════════════════════════════════════╗
║   Alliance Monitor v0.1                   ║
║   Watching the alliance title for changes ║
╚═══════════════════════════════════════════╝
"#;

#[tokio::main]
async fn main() -> Result<()> {
    println!("{}", BANNER);

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging).context("Failed to initialise logging")?;

    info!(target: LIFECYCLE, "🔧 Checking configuration...");
    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        error!("💡 Check the .env file and make sure every setting is filled in");
        info!(target: LIFECYCLE, "✅ Monitoring finished");
        return Err(e.into());
    }

    let notifier = TelegramNotifier::new(&config.telegram, config.site.root_url());
    let mut monitor = AllianceMonitor::new(config, Box::new(notifier))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    if let Err(e) = monitor.start().await {
        error!("❌ {}", e);
        info!(target: LIFECYCLE, "✅ Monitoring finished");
        return Err(e.into());
    }

    match monitor.run(shutdown_rx).await {
        RunOutcome::Stopped => Ok(()),
        RunOutcome::NetworkFailure => Err(anyhow!("monitoring stopped after a network failure")),
    }
}
