use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kannel_monitor::fetch::StatusClient;
use kannel_monitor::settings::MonitorConfig;
use kannel_monitor::web::{start_web_server, AppState};
use kannel_monitor::xpath::TagScanner;
use kannel_monitor::{aggregate, report};

#[derive(Parser)]
#[command(name = "kannel-monitor")]
#[command(about = "Aggregated status dashboard for Kannel bearerbox instances", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the status dashboard
    Serve {
        /// Path to the configuration file
        #[arg(short, long, default_value = "kannel-monitor.toml")]
        config: PathBuf,

        /// Port for the web dashboard
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Address to bind the web dashboard to
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,

        /// Path to store log files
        #[arg(short, long, default_value = "logs")]
        log_dir: PathBuf,

        /// Directory holding kannel.css and kannel.js
        #[arg(short, long, default_value = "assets")]
        assets_dir: PathBuf,
    },
    /// Poll all instances once and print a text report
    Report {
        /// Path to the configuration file
        #[arg(short, long, default_value = "kannel-monitor.toml")]
        config: PathBuf,

        /// Also save the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Poll all instances once and write the aggregated status as JSON
    Export {
        /// Path to the configuration file
        #[arg(short, long, default_value = "kannel-monitor.toml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long, default_value = "kannel-status.json")]
        output: PathBuf,
    },
}

fn status_client(config: &MonitorConfig) -> anyhow::Result<StatusClient> {
    StatusClient::new(
        Duration::from_secs(config.fetch_timeout_secs),
        TagScanner::new(config.scan_mode),
    )
}

fn init_console_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            port,
            bind,
            log_dir,
            assets_dir,
        } => {
            // Set up logging
            std::fs::create_dir_all(&log_dir)?;
            let file_appender = RollingFileAppender::new(Rotation::HOURLY, &log_dir, "kannel-monitor.log");
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
                .with(fmt::layer().with_writer(std::io::stdout))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();

            info!("Starting Kannel status monitor");
            info!("Config: {:?}", config);

            let monitor_config = MonitorConfig::load(&config)?;
            for instance in &monitor_config.instances {
                info!(name = %instance.name, url = %instance.display_url(), "Monitoring instance");
            }
            info!(
                refresh_secs = monitor_config.refresh_secs,
                fetch_timeout_secs = monitor_config.fetch_timeout_secs,
                scan_mode = ?monitor_config.scan_mode,
                "Dashboard settings"
            );
            info!("Web dashboard: http://{}:{}", bind, port);

            let client = status_client(&monitor_config)?;
            let state = AppState::new(Arc::new(monitor_config), client);

            tokio::select! {
                result = start_web_server(state, &bind, port, assets_dir) => result?,
                _ = tokio::signal::ctrl_c() => info!("Shutting down..."),
            }

            Ok(())
        }
        Commands::Report { config, output } => {
            init_console_logging();
            let monitor_config = MonitorConfig::load(&config)?;
            let client = status_client(&monitor_config)?;
            let data = aggregate::collect(&client, &monitor_config).await;
            let text = report::generate_report(&data);
            println!("{}", text);
            if let Some(output) = output {
                std::fs::write(&output, &text)?;
                println!("\nReport saved to {:?}", output);
            }
            Ok(())
        }
        Commands::Export { config, output } => {
            init_console_logging();
            let monitor_config = MonitorConfig::load(&config)?;
            let client = status_client(&monitor_config)?;
            let data = aggregate::collect(&client, &monitor_config).await;
            std::fs::write(&output, serde_json::to_string_pretty(&data)?)?;
            println!("Exported status to {:?}", output);
            Ok(())
        }
    }
}
