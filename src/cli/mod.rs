//! CLI argument parsing and terminal output.
//!
//! Uses clap derive macros for argument definitions. Results go to stdout
//! in a stable `Label: value` form; diagnostics go to stderr.

pub mod args;

use std::path::Path;

use sops_init::init::InitReport;
use sops_init::keys::store::AppendOutcome;
use sops_init::policy::PolicyOutcome;

/// Announce which key store this run targets.
pub fn print_keys_path(path: &Path) {
    println!("Using keys_path: {}", path.display());
}

/// Print the outcome of a successful run.
///
/// The "already present" notice goes to stderr so stdout keeps the same
/// shape on every successful run.
pub fn print_report(report: &InitReport) {
    use colored::Colorize;

    if report.key_outcome == AppendOutcome::AlreadyPresent {
        eprintln!(
            "{} Key already present in {}. No changes made.",
            "ℹ".dimmed(),
            report.keys_path.display(),
        );
    }
    if report.policy_outcome == PolicyOutcome::Existing {
        tracing::info!(path = %report.sops_config.display(), "kept existing SOPS config");
    }

    println!("Age public key: {}", report.public_key);
    println!("Installed key to: {}", report.keys_path.display());
    println!("SOPS config: {}", report.sops_config.display());
}

/// Print a single-line error to stderr.
pub fn print_error(err: &dyn std::fmt::Display) {
    use colored::Colorize;
    eprintln!("{} {err}", "Error:".red().bold());
}
