mod bridge;
mod clipboard;
mod config;
mod error;
mod logging;
mod runtime;
mod transport;

use anyhow::Context;
use tokio::io::BufReader;
use vkdeck_core::RpcGateway;

use clipboard::SystemClipboard;
use config::AppConfig;
use runtime::AppRuntime;
use transport::StdioTransport;

fn main() {
    if let Err(error) = run() {
        eprintln!("vkdeck: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = AppConfig::resolve().context("loading configuration failed")?;
    let level = logging::init(&config.log_level).context("logger setup failed")?;
    log::debug!("log level {level}, backend {:?}", config.backend.command);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("tokio runtime failed to start")?;
    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let transport = StdioTransport::spawn(&config.backend.command)
        .context("backend failed to start")?;
    let mut gateway = RpcGateway::new(transport);
    if let Some(timeout) = config.timeout() {
        gateway = gateway.with_timeout(timeout);
    }
    let clipboard = SystemClipboard::new();

    let app = AppRuntime::bootstrap(gateway, clipboard).await;
    log::info!("serving ui at revision {}", app.revision());
    app.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("ui loop failed")?;
    Ok(())
}
