//! Helpers for running child processes with combined, bounded output.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    /// Stdout and stderr interleaved in arrival order.
    pub output: Vec<u8>,
    pub truncated: usize,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn output_lossy(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.output).into_owned();
        if self.truncated > 0 {
            text.push_str(&format!("\n[output truncated {} bytes]\n", self.truncated));
        }
        text
    }
}

#[derive(Debug, Default)]
struct SharedBuffer {
    bytes: Vec<u8>,
    truncated: usize,
}

/// Run a command to completion, capturing stdout and stderr into one buffer.
///
/// Both pipes are drained concurrently while the child runs. `output_limit_bytes`
/// bounds the bytes kept in memory; the rest is counted and discarded. With a
/// `timeout` the child is killed once it elapses; without one the call blocks
/// until the child exits.
///
/// Only the direct child is killed. Processes it started may keep the pipes
/// open, so after a timeout the reader threads are detached instead of joined
/// and the output collected so far is returned.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs()), output_limit_bytes))]
pub fn run_process(
    mut cmd: Command,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
) -> Result<ProcessOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let buffer = Arc::new(Mutex::new(SharedBuffer::default()));
    let stdout_buffer = Arc::clone(&buffer);
    let stderr_buffer = Arc::clone(&buffer);
    let stdout_handle =
        thread::spawn(move || read_into_shared(stdout, output_limit_bytes, &stdout_buffer));
    let stderr_handle =
        thread::spawn(move || read_into_shared(stderr, output_limit_bytes, &stderr_buffer));

    let mut timed_out = false;
    let status = match timeout {
        Some(limit) => match child.wait_timeout(limit).context("wait for command")? {
            Some(status) => status,
            None => {
                warn!(timeout_secs = limit.as_secs(), "command timed out, killing");
                timed_out = true;
                child.kill().context("kill command")?;
                child.wait().context("wait command after kill")?
            }
        },
        None => child.wait().context("wait for command")?,
    };

    if timed_out {
        drop(stdout_handle);
        drop(stderr_handle);
    } else {
        join_reader(stdout_handle).context("join stdout")?;
        join_reader(stderr_handle).context("join stderr")?;
    }

    let collected = {
        let mut guard = buffer
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        std::mem::take(&mut *guard)
    };

    if collected.truncated > 0 {
        warn!(truncated = collected.truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(ProcessOutput {
        status,
        output: collected.bytes,
        truncated: collected.truncated,
        timed_out,
    })
}

fn join_reader(handle: thread::JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_into_shared<R: Read>(
    mut reader: R,
    limit: usize,
    buffer: &Mutex<SharedBuffer>,
) -> Result<()> {
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let mut shared = buffer
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        let remaining = limit.saturating_sub(shared.bytes.len());
        let keep = n.min(remaining);
        shared.bytes.extend_from_slice(&chunk[..keep]);
        shared.truncated += n - keep;
    }

    Ok(())
}
