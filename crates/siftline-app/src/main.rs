use clap::Parser;
use siftline_app::Cli;

/// Parse command-line flags, run one pipeline invocation, and exit with the
/// run's classified status code (§8 IP8).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let outcome = siftline_app::run(&cli).await?;
    std::process::exit(siftline_app::exit_code(&outcome));
}
