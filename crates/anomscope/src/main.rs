use anomscope::cli::{LogFormat, parse_cli};
use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing(cli.log_format);
    anomscope::run(cli)
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Human => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
