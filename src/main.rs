use clap::Parser;
use juliet::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{call, error},
    utils::{handle_error_and_exit, Result},
};

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Call(_) => "call",
        Command::Phase(_) => "phase",
        Command::Error(_) => "error",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Call(args) => call::call(&args, None)?,
        Command::Phase(args) => call::call(
            &args.call,
            Some(call::PhaseOptions {
                merge_outliers: !args.no_merge_outliers,
            }),
        )?,
        Command::Error(args) => error::error_rates(&args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
