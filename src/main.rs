#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

use agent_en_place::cli::Cli;
use agent_en_place::commands;

fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::run::execute(&cli.run_options())?;
    Ok(())
}
