use std::path::PathBuf;

use clap::Parser;
use edgebalance::run;

#[derive(Parser, Debug)]
#[command(name = "edgebalance", about = "Layer-7 reverse proxy and load balancer")]
struct Cli {
    /// Path to the gateway configuration file.
    #[arg(short, long, default_value = "gateway.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    run(cli.config).await
}
