//! snapborg: LVM snapshot backups with borg.
//!
//! Reads `/etc/snapborg/snapborg.toml` (or `--config`), then snapshots,
//! archives and tears down each configured volume before pruning.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, info_span};

use snapborg::backup::{run_backup, teardown_all};
use snapborg::check::plan;
use snapborg::exit_codes;
use snapborg::io::borg::Borg;
use snapborg::io::command::SystemRunner;
use snapborg::io::config::{Config, DEFAULT_CONFIG_PATH, load_config};
use snapborg::io::passphrase::read_passphrase;
use snapborg::logging;

#[derive(Parser)]
#[command(
    name = "snapborg",
    version,
    about = "Crash-consistent LVM snapshot backups with borg"
)]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log every command line without executing it.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Snapshot, archive and tear down every volume, then prune and report.
    Backup,
    /// Unmount and remove every volume's snapshot (recovery after a failed run).
    Teardown,
    /// Validate the configuration and print the derived plan. Runs nothing.
    Check,
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

/// Errors returned here happen before any external command runs.
fn run(cli: Cli) -> Result<i32> {
    let mut config = load_config(&cli.config)?;
    if cli.dry_run {
        config.dry_run = true;
    }
    match cli.command {
        Command::Backup => cmd_backup(&config),
        Command::Teardown => cmd_teardown(&config),
        Command::Check => cmd_check(&config),
    }
}

fn cmd_backup(config: &Config) -> Result<i32> {
    logging::init(&config.log)?;
    let _span = info_span!("cmd_backup").entered();
    let passphrase = read_passphrase(&config.passphrase_file)?;
    let borg = Borg::new(config, passphrase);
    let runner = SystemRunner::from_config(config);

    match run_backup(&runner, config, &borg) {
        Ok(summary) => {
            for archive in &summary.archives {
                println!("backup: archive={archive}");
            }
            println!("backup: report_failed={}", summary.report_failed);
            info!(
                archives = summary.archives.len(),
                pruned = summary.pruned_volumes,
                teardown_failed = summary.teardown.failed,
                report_failed = summary.report_failed,
                "done"
            );
            Ok(exit_codes::OK)
        }
        Err(err) => {
            error!(err = %format!("{err:#}"), "backup aborted");
            eprintln!("{:#}", err);
            Ok(exit_codes::FAILED)
        }
    }
}

fn cmd_teardown(config: &Config) -> Result<i32> {
    logging::init(&config.log)?;
    let _span = info_span!("cmd_teardown").entered();
    let runner = SystemRunner::from_config(config);
    let report = teardown_all(&runner, config);
    println!(
        "teardown: steps={} failed={}",
        report.attempted, report.failed
    );
    Ok(exit_codes::OK)
}

fn cmd_check(config: &Config) -> Result<i32> {
    read_passphrase(&config.passphrase_file)?;
    for entry in plan(config)? {
        println!("check: {entry}");
    }
    println!(
        "check: repository={} dry_run={}",
        config.repository.display(),
        config.dry_run
    );
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backup_with_defaults() {
        let cli = Cli::parse_from(["snapborg", "backup"]);
        assert!(matches!(cli.command, Command::Backup));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!cli.dry_run);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["snapborg", "teardown", "--dry-run", "-c", "/tmp/x.toml"]);
        assert!(matches!(cli.command, Command::Teardown));
        assert!(cli.dry_run);
        assert_eq!(cli.config, PathBuf::from("/tmp/x.toml"));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["snapborg"]).is_err());
    }
}
