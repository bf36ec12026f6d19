// src/exec/process.rs

//! Real process runner on `tokio::process`.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::output::OutputSink;
use crate::errors::BuildError;
use crate::inventory::BoxFuture;

use super::backend::{Invocation, ProcessBackend};

/// Exit code reported for a process killed on request.
pub const TERMINATED_EXIT_CODE: i32 = -1;

/// Backend spawning OS processes.
#[derive(Debug, Clone, Default)]
pub struct RealProcessBackend;

impl ProcessBackend for RealProcessBackend {
    fn run(
        &self,
        invocation: Invocation,
        output: OutputSink,
        cancel: watch::Receiver<bool>,
    ) -> BoxFuture<'static, i32> {
        Box::pin(run_process(invocation, output, cancel))
    }
}

fn build_command(inv: &Invocation) -> Command {
    let mut cmd = if !inv.shell {
        let mut c = Command::new(&inv.program);
        c.args(&inv.args);
        c
    } else if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(inv.command_line());
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(inv.command_line());
        c
    };

    cmd.current_dir(&inv.cwd)
        .envs(&inv.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

async fn run_process(inv: Invocation, output: OutputSink, mut cancel: watch::Receiver<bool>) -> i32 {
    if *cancel.borrow() {
        debug!(task = %inv.task, "run already terminated; not starting process");
        return TERMINATED_EXIT_CODE;
    }

    info!(task = %inv.task, cmd = %inv, cwd = ?inv.cwd, "starting task process");

    let mut child = match build_command(&inv).spawn() {
        Ok(child) => child,
        Err(e) => {
            output.error(&BuildError::Spawn {
                reason: format!("{}: {e}", inv.program),
            });
            return 1;
        }
    };

    let mut pumps: Vec<JoinHandle<()>> = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(pump_lines(stdout, output.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(pump_lines(stderr, output.clone()));
    }

    tokio::select! {
        status = child.wait() => {
            // Drain whatever the process wrote before exiting.
            for pump in pumps {
                let _ = pump.await;
            }
            match status {
                Ok(status) => {
                    let code = status.code().unwrap_or(TERMINATED_EXIT_CODE);
                    info!(task = %inv.task, exit_code = code, success = status.success(), "task process exited");
                    code
                }
                Err(e) => {
                    output.error(&BuildError::Spawn {
                        reason: format!("waiting for {}: {e}", inv.program),
                    });
                    1
                }
            }
        }

        _ = cancelled(&mut cancel) => {
            info!(task = %inv.task, "termination requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(task = %inv.task, error = %e, "failed to kill child process");
            }
            // Grandchildren may still hold the pipes open.
            for pump in pumps {
                pump.abort();
            }
            TERMINATED_EXIT_CODE
        }
    }
}

/// Forward every line of `reader` to `output`.
fn pump_lines<R>(reader: R, output: OutputSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => output.line(line),
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "stopped reading process output");
                    break;
                }
            }
        }
    })
}

/// Resolves once `cancel` reads `true`. Never resolves if the sender is gone
/// without having cancelled.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
