//! Main entry point for the vdc CLI

use clap::Parser;
use vdc::cli::Cli;
use vdc::commands::execute_command;
use vdc::prompt::TerminalPrompter;
use vdc::Config;

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging; --verbose raises the level to debug
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut prompter = TerminalPrompter::new();

    // Execute the command
    if let Err(e) = execute_command(cli.command, &config, &mut prompter) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
