use color_eyre::Result;
use geoarchive::cli::{parse_args, run_cli_command};
use geoarchive::config::ClientConfig;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = std::env::var("GEOARCHIVE_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let command = parse_args(std::env::args());
    let config = ClientConfig::from_env();
    run_cli_command(command, &config)
}
