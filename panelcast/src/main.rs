//! panelcast entry point.
//!
//! ```text
//! panelcast                      Mirror using panelcast.toml
//! panelcast --config <path>      Load a custom config TOML
//! panelcast --dry-run            Diff and apply to an in-memory panel only
//! panelcast --gen-config         Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use panelcast::config::PanelcastConfig;
use panelcast::daemon::Daemon;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "panelcast", about = "Mirror the screen onto a serial-attached panel")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "panelcast.toml")]
    config: PathBuf,

    /// Apply updates to an in-memory panel instead of the serial link.
    #[arg(long)]
    dry_run: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&PanelcastConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // A bad config file aborts startup with a non-zero exit.
    let config = PanelcastConfig::load(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("panelcast v{}", env!("CARGO_PKG_VERSION"));
    if cli.config.is_file() {
        info!("config: {}", cli.config.display());
    } else {
        info!("no config at {}; using defaults", cli.config.display());
    }
    info!("panel: {}x{}", config.panel.width, config.panel.height);
    info!("update mode: {}", config.update.mode);
    info!(
        "thresholds: {}% changed, {} pixels minimum region",
        config.update.change_threshold, config.update.min_update_region
    );

    let daemon = Daemon::new(config, cli.dry_run);
    let stop = daemon.stop_handle();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, finishing current cycle");
        stop.cancel();
    });

    daemon.run().await?;
    info!("exited cleanly");

    Ok(())
}
