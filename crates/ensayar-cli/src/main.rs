//! Ensayador CLI entry point

use clap::Parser;
use ensayador::{
    init_logging, Cli, CliConfig, CliResult, Commands, TestRunner, Verbosity,
};
use ensayar::TestRegistry;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logging(config.verbosity);

    // Fixtures registered by linked game code before main took over
    let global = TestRegistry::global();
    let mut registry = match global.lock() {
        Ok(mut guard) => std::mem::take(&mut *guard),
        Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };

    let runner = TestRunner::new(config);
    match cli.command {
        Commands::Run(args) => {
            let _report = runner.run(&mut registry, &args)?;
            Ok(())
        }
        Commands::List(args) => {
            for name in runner.list(&registry, &args)? {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Tree(args) => {
            print!("{}", runner.tree(&registry, &args)?);
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };
    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(cli.color.into())
}
