//! Run handle: owns one analyzer child process for one document snapshot.
//!
//! [`spawn`] launches the analyzer and hands the child to a tokio task. The
//! task streams the document to stdin (then closes it), captures stdout and
//! stderr, reaps the process, and reports back over the event channel. The
//! controller keeps only the [`LiveRun`]; dropping it, or calling
//! [`LiveRun::cancel`], kills the process and silences the task.

use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

use flint_types::{Diagnostic, Document, DocumentId, RunId};

use crate::types::{CheckError, CheckerConfig, RunEvent};

/// Receives the diagnostics of a completed run.
pub(crate) type ReportCallback = Box<dyn FnOnce(Vec<Diagnostic>) + Send + 'static>;

/// A run the controller still considers current for its document.
pub(crate) struct LiveRun {
    id: RunId,
    document: Document,
    report: ReportCallback,
    started: Instant,
    /// Firing or dropping this tells the task to kill the process.
    kill_tx: oneshot::Sender<()>,
}

impl LiveRun {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Kill the process. Fire-and-forget: the task reaps it and never
    /// reports.
    pub fn cancel(self) {
        let _ = self.kill_tx.send(());
    }

    /// Hand the diagnostics to the caller, consuming the run.
    pub fn deliver(self, diagnostics: Vec<Diagnostic>) {
        (self.report)(diagnostics);
    }
}

/// Captured output of a run whose stdout reached EOF.
struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Launch the analyzer for `document` and start its supervising task.
///
/// Must be called from within a tokio runtime.
pub(crate) fn spawn(
    id: RunId,
    document: Document,
    report: ReportCallback,
    config: &CheckerConfig,
    event_tx: mpsc::Sender<RunEvent>,
) -> Result<LiveRun, CheckError> {
    let mut cmd = Command::new(config.program());
    cmd.args(config.args_for(&document))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = config.working_dir_for(&document) {
        cmd.current_dir(dir);
    }
    // Own process group so wrappers (npx, shell shims) die with the run.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|source| CheckError::Spawn {
        program: config.program().to_path_buf(),
        source,
    })?;

    tracing::debug!(
        run = %id,
        document = %document.id(),
        path = %document.path().display(),
        pid = ?child.id(),
        bytes = document.len(),
        column_unit = document.column_unit().as_str(),
        "Spawned analyzer"
    );

    let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
    let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
        terminate(&mut child);
        return Err(CheckError::Spawn {
            program: config.program().to_path_buf(),
            source: std::io::Error::other("analyzer pipes were not captured"),
        });
    };

    let (kill_tx, kill_rx) = oneshot::channel();
    let input = document.text().to_owned();
    tokio::spawn(supervise(
        id,
        document.id(),
        child,
        Pipes {
            stdin,
            stdout,
            stderr,
        },
        input,
        kill_rx,
        event_tx,
    ));

    Ok(LiveRun {
        id,
        document,
        report,
        started: Instant::now(),
        kill_tx,
    })
}

struct Pipes {
    stdin: ChildStdin,
    stdout: ChildStdout,
    stderr: ChildStderr,
}

async fn supervise(
    run: RunId,
    document: DocumentId,
    mut child: Child,
    pipes: Pipes,
    input: String,
    mut kill_rx: oneshot::Receiver<()>,
    event_tx: mpsc::Sender<RunEvent>,
) {
    let captured = tokio::select! {
        captured = capture(run, pipes, &input) => Some(captured),
        _ = &mut kill_rx => None,
    };
    let Some(captured) = captured else {
        tracing::debug!(run = %run, %document, "Run cancelled while streaming");
        terminate(&mut child);
        return;
    };

    let status = tokio::select! {
        status = child.wait() => Some(status),
        _ = &mut kill_rx => None,
    };
    let Some(status) = status else {
        tracing::debug!(run = %run, %document, "Run cancelled before exit");
        terminate(&mut child);
        return;
    };

    let event = match (captured, status) {
        (Ok(captured), Ok(status)) => {
            if !captured.stderr.is_empty() {
                tracing::debug!(
                    run = %run,
                    stderr = %String::from_utf8_lossy(&captured.stderr).trim(),
                    "Analyzer stderr"
                );
            }
            RunEvent::Finished {
                document,
                run,
                status,
                output: String::from_utf8_lossy(&captured.stdout).into_owned(),
            }
        }
        (Err(e), _) => RunEvent::Failed {
            document,
            run,
            error: format!("{e:#}"),
        },
        (_, Err(e)) => RunEvent::Failed {
            document,
            run,
            error: format!("waiting for analyzer: {e}"),
        },
    };

    // A closed channel means the controller is gone; nobody is waiting.
    let _ = event_tx.send(event).await;
}

/// Write the document and read both output streams concurrently, so a
/// chatty analyzer cannot stall on a full pipe while we are still writing.
async fn capture(run: RunId, pipes: Pipes, input: &str) -> Result<Captured> {
    let Pipes {
        stdin,
        stdout,
        stderr,
    } = pipes;

    let (written, stdout, stderr) = tokio::join!(
        write_input(stdin, input),
        read_to_end(stdout),
        read_to_end(stderr),
    );

    // The analyzer may exit before consuming everything (config errors);
    // its report is still worth reading.
    if let Err(e) = written {
        tracing::debug!(run = %run, "Analyzer did not accept full input: {e:#}");
    }
    let stderr = stderr.unwrap_or_else(|e| {
        tracing::debug!(run = %run, "Failed to read analyzer stderr: {e:#}");
        Vec::new()
    });
    let stdout = stdout.context("reading analyzer stdout")?;

    Ok(Captured { stdout, stderr })
}

async fn write_input(mut stdin: ChildStdin, input: &str) -> Result<()> {
    stdin
        .write_all(input.as_bytes())
        .await
        .context("writing document to stdin")?;
    stdin.shutdown().await.context("closing stdin")?;
    // Dropping stdin closes the pipe: end of document.
    Ok(())
}

async fn read_to_end(mut reader: impl AsyncRead + Unpin) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Kill the child (and its process group on Unix). Not awaited; tokio
/// reaps the process once `child` is dropped.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: `pid` belongs to a child we still own and have not
            // reaped, so it cannot have been recycled.
            unsafe {
                if libc::killpg(pid as i32, libc::SIGKILL) == 0 {
                    return;
                }
            }
        }
    }
    let _ = child.start_kill();
}
