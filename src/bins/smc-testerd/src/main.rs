//! SMC Tester Daemon
//!
//! Replays a testcase script against a UE and AMF under test:
//! - Serves the four-step Security Mode Command exchange on a TCP socket
//! - Patches each captured message as the current testcase prescribes
//! - Stores the UE's response per testcase in MongoDB
//! - Signals the AMF (testcase enable, deregistration) over SBI

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use smc_dbi::{masked_db_uri, MongoConfig, MongoResultStore};
use smc_testcase::load_script;
use smc_testerd::{ControlDispatcher, Driver, SbiControlChannel, TesterConfig, TesterSm};
use tokio::net::TcpListener;

/// SMC Tester - NAS Security Mode Command fault injection
#[derive(Parser, Debug)]
#[command(name = "smc-testerd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "NAS Security Mode Command fault-injection tester", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, default_value = "/etc/smc-tester/testerd.yaml")]
    config: String,

    /// Testcase script path
    #[arg(short = 's', long, default_value = "testcases.yaml")]
    script: String,

    /// Protocol listen address (overrides the configuration file)
    #[arg(long)]
    listen: Option<String>,

    /// AMF SBI host (overrides the configuration file)
    #[arg(long)]
    amf_host: Option<String>,

    /// AMF SBI port (overrides the configuration file)
    #[arg(long)]
    amf_port: Option<u16>,

    /// MongoDB URI (overrides the configuration file)
    #[arg(long)]
    db_uri: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'e', long, default_value = "info")]
    log_level: String,

    /// Disable color output
    #[arg(short = 'm', long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    log::info!("SMC Tester v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = TesterConfig::load_or_default(&args.config)?;
    apply_overrides(&mut config, &args);

    let script = load_script(&args.script)
        .with_context(|| format!("Failed to load testcase script {}", args.script))?;
    log::info!(
        "Loaded {} testcase(s) for SUPI {}",
        script.len(),
        script.supi
    );

    let mongo = MongoConfig::from(&config.db);
    let store = MongoResultStore::connect(&mongo)
        .await
        .with_context(|| format!("Failed to open result store {}", masked_db_uri(&mongo.uri)))?;

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;

    let channel = SbiControlChannel::new(&config.amf_sbi);
    log::info!(
        "AMF control endpoint: http://{}:{}{}",
        config.amf_sbi.host,
        config.amf_sbi.port,
        config.amf_sbi.base_path
    );
    let control = ControlDispatcher::new(Arc::new(channel), config.control.policy());

    let sm = TesterSm::new(
        Arc::new(script),
        config.layout,
        config.retry.policy(),
        Arc::new(store),
    );

    let summary = Driver::new(sm, control, config.dereg_delay())
        .run(listener)
        .await
        .context("Connection loop failed")?;

    log::info!(
        "SMC Tester finished: {} completed, {} aborted",
        summary.completed,
        summary.aborted
    );
    Ok(())
}

/// Command-line values win over the configuration file
fn apply_overrides(config: &mut TesterConfig, args: &Args) {
    if let Some(listen) = &args.listen {
        config.listen = listen.clone();
    }
    if let Some(host) = &args.amf_host {
        config.amf_sbi.host = host.clone();
    }
    if let Some(port) = args.amf_port {
        config.amf_sbi.port = port;
    }
    if let Some(uri) = &args.db_uri {
        config.db.uri = uri.clone();
    }
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
