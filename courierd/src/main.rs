use std::str::FromStr;

use clap::{Parser, Subcommand};
use rst_common::with_tokio::tokio;

use prople_courier_node::TransportKind;

use prople_courierd::errors::CourierError;
use prople_courierd::svc::demo::Demo;

#[derive(Parser)]
#[command(name = "courierd")]
#[command(version = "1.0")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "demo")]
    #[command(about = "Running the two party credential issuance scenario")]
    Demo {
        #[arg(short, long, value_name = "FILE")]
        #[arg(required = true)]
        config: Option<String>,

        /// overrides the configured transport, `memory` or `http`
        #[arg(short, long, value_name = "KIND")]
        transport: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CourierError> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Demo { config, transport } => {
            let config_file = config
                .to_owned()
                .ok_or(CourierError::ConfigError("missing config file".to_string()))?;

            let transport = transport
                .as_deref()
                .map(TransportKind::from_str)
                .transpose()
                .map_err(|err| CourierError::ConfigError(err.to_string()))?;

            let _ = Demo::new(config_file, transport).run().await?;
        }
    }

    Ok(())
}
