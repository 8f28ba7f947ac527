pub mod buffer;
pub mod config;
pub mod gesture;
pub mod landmarks;
pub mod pipeline;
pub mod transport;
mod utils;

use config::PipelineConfig;

pub fn run() {
    // Initialize logging (reads RUST_LOG env var). Logs go to stderr so
    // stdout stays a clean message stream.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("signflow starting up...");

    let result = (|| -> anyhow::Result<()> {
        let config = PipelineConfig::from_env()?;
        if config.debug {
            log::info!("debug mode: landmarks are echoed in detection results");
        }

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(transport::serve_stdio(config))
    })();

    if let Err(err) = result {
        log::error!("signflow failed: {err:?}");
        std::process::exit(1);
    }

    log::info!("signflow shut down");
}
