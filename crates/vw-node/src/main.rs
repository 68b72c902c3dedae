mod cli;
mod supervisor;

use clap::Parser;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vw_telemetry::init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => supervisor::run(args).await,
        Command::Check(args) => {
            let (config, problems) = vw_config::load(&args.config)?;
            for p in &problems {
                println!("{p}");
            }
            println!("config is valid: {} chain(s) configured", config.chains.len());
            Ok(())
        }
    }
}
