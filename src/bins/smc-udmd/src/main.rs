//! SMC Tester Mock UDM
//!
//! Serves the tester's testcase script to the AMF under test:
//! - Subscriber identity
//! - Full script and single testcases
//!
//! Registers once with the NRF at startup and runs until interrupted.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use smc_sbi::{SbiClient, SbiRequest, SbiServer, SbiServerConfig};
use smc_testcase::load_script;
use smc_udmd::{nf_profile, udm_nrf_register, udm_sbi_request_handler};

/// SMC Tester Mock UDM
#[derive(Parser, Debug)]
#[command(name = "smc-udmd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mock UDM serving the SMC tester script", long_about = None)]
struct Args {
    /// Testcase script path
    #[arg(short = 's', long, default_value = "testcases.yaml")]
    script: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'e', long, default_value = "info")]
    log_level: String,

    /// Disable color output
    #[arg(short = 'm', long)]
    no_color: bool,

    /// SBI server address
    #[arg(long, default_value = "127.0.0.12")]
    sbi_addr: String,

    /// SBI server port
    #[arg(long, default_value = "7777")]
    sbi_port: u16,

    /// NRF host
    #[arg(long, default_value = "127.0.0.10")]
    nrf_host: String,

    /// NRF port
    #[arg(long, default_value = "7777")]
    nrf_port: u16,

    /// Skip NRF registration
    #[arg(long)]
    no_nrf: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    log::info!("SMC Mock UDM v{} starting...", env!("CARGO_PKG_VERSION"));

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let script = Arc::new(
        load_script(&args.script)
            .with_context(|| format!("Failed to load testcase script {}", args.script))?,
    );
    log::info!("Serving {} testcase(s) for SUPI {}", script.len(), script.supi);

    let sbi_addr: SocketAddr = format!("{}:{}", args.sbi_addr, args.sbi_port)
        .parse()
        .context("Invalid SBI address")?;
    let sbi_server = SbiServer::new(SbiServerConfig::new(sbi_addr));

    let served = script.clone();
    sbi_server
        .start(move |request: SbiRequest| {
            let script = served.clone();
            async move { udm_sbi_request_handler(&script, &request) }
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start SBI server: {}", e))?;
    log::info!("SBI HTTP/2 server listening on {}", sbi_addr);

    if args.no_nrf {
        log::info!("NRF registration disabled");
    } else {
        let nf_instance_id = uuid::Uuid::new_v4().to_string();
        let nrf = SbiClient::with_host_port(args.nrf_host.clone(), args.nrf_port);
        let profile = nf_profile(&nf_instance_id, &args.sbi_addr, args.sbi_port);
        if let Err(e) = udm_nrf_register(&nrf, &nf_instance_id, &profile).await {
            log::warn!(
                "NRF registration at {}:{} failed: {}",
                args.nrf_host,
                args.nrf_port,
                e
            );
        }
    }

    log::info!("SMC Mock UDM ready");

    let mut interval = tokio::time::interval(Duration::from_millis(100));
    while !shutdown.load(Ordering::SeqCst) {
        interval.tick().await;
    }

    log::info!("Shutting down...");
    sbi_server
        .stop()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to stop SBI server: {}", e))?;

    log::info!("SMC Mock UDM stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(args: &Args) -> Result<()> {
    let mut builder = env_logger::Builder::new();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    builder.filter_level(level);
    builder.format_timestamp_millis();

    if args.no_color {
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.init();

    Ok(())
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        shutdown.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    Ok(())
}
