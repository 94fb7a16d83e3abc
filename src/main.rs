//! sops-init — provision an age key for SOPS.
//!
//! Entry point and error handling boundary. Library errors carry their
//! own exit codes; anything else is reported through `anyhow` and exits 1.

mod cli;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::args::Cli;
use sops_init::constants::ENV_LOG;
use sops_init::env::Env;
use sops_init::init::{InitError, Installer, Mode, exit};
use sops_init::input;

fn main() {
    // Debug output never includes key material.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("sops_init=warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match run(cli.mode()) {
        Ok(()) => exit::SUCCESS,
        Err(err) => match err.downcast_ref::<InitError>() {
            Some(init_err) => {
                cli::print_error(init_err);
                init_err.exit_code()
            }
            None => {
                cli::print_error(&format!("{err:#}"));
                exit::FAILURE
            }
        },
    };
    process::exit(code);
}

fn run(mode: Mode) -> Result<()> {
    let cwd = std::env::current_dir().context("could not determine the working directory")?;
    let installer = Installer::prepare(&Env::real(), cwd)?;

    cli::print_keys_path(&installer.keys_path());

    // Only prompt mode reads from the operator; skip the tty probe otherwise.
    let key = match mode {
        Mode::Generate => installer.acquire_generated()?,
        Mode::Prompt => installer.acquire_prompted(input::select_input().as_mut())?,
    };
    let report = installer.install(&key)?;

    cli::print_report(&report);
    Ok(())
}
