use color_eyre::{eyre::eyre, eyre::WrapErr, Result};
use ospad::config::DriverConfig;
use ospad::device::attach;
use ospad::protocol::RppalTransport;
use ospad::sink::LoggingSink;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = DriverConfig::resolve_path(std::env::args().nth(1).map(PathBuf::from))?;
    DriverConfig::ensure_default_config(&config_path).await?;
    let config = DriverConfig::load(&config_path).await?;
    info!("Loaded config from {}: {:?}", config_path.display(), config);

    let transport = RppalTransport::open(config.bus.number, config.bus.address)
        .wrap_err_with(|| format!("Failed to open /dev/i2c-{}", config.bus.number))?;

    let handle = attach(
        Box::new(transport),
        Box::new(LoggingSink::new()),
        config.device_settings(),
    )
    .await
    .map_err(|e| eyre!("Failed to attach pad: {}", e))?;

    if config.device.calibrate_on_attach {
        if let Err(e) = handle.request_calibration().await {
            warn!("Calibration request failed: {}", e);
        }
    }

    debug!("{}", handle.debug_dump().await);
    info!("Polling, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .wrap_err("Failed to listen for Ctrl-C")?;

    info!("Last sample:\n{}", handle.debug_dump().await);
    handle.detach().await;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env(&std::env::var("RUST_LOG")?);
    Ok(())
}

fn setup_logging_env(directives: &str) {
    FmtSubscriber::builder()
        .with_env_filter(log_filter(directives))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::new(directives)
}
