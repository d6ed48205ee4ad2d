mod cli;

use anyhow::Result;
use clap::Parser;

use cli::args::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    cli::logging::init(&args)?;

    match args.command {
        Command::Run { config, output } => cli::commands::run(&config, output).await,
        Command::Validate { config } => cli::commands::validate(&config),
        Command::Parse { declared_type, file } => cli::commands::parse(declared_type, &file),
    }
}
