//! Reporter: log `borg info` for the most recent archives.

use tracing::{error, instrument};

use crate::io::borg::Borg;
use crate::io::command::{CommandRunner, CommandSpec, RunOptions};

pub fn info_command(borg: &Borg, count: usize) -> CommandSpec {
    borg.command("info")
        .arg("--last")
        .arg(count.to_string())
        .arg(borg.repository_arg())
}

/// Log details of the last `count` archives. Read-only.
///
/// Runs after every archive is written and pruned, so a failure here is
/// logged and reported back as `false` rather than failing the run.
#[instrument(skip_all, fields(count))]
pub fn log_last_archives<R: CommandRunner>(runner: &R, borg: &Borg, count: usize) -> bool {
    let spec = info_command(borg, count);
    match runner.run(&spec, RunOptions::REPORT) {
        Ok(outcome) if outcome.success => true,
        Ok(_) => {
            error!(command = %spec, "report of last archives failed");
            false
        }
        Err(err) => {
            error!(command = %spec, err = %format!("{err:#}"), "report of last archives failed");
            false
        }
    }
}
