//! Backend that runs a local agent program per query.
//!
//! The message is written to the child's stdin. `ask` returns the collected
//! stdout; `stream` republishes stdout line by line on the event channels.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use orbit_core::backend::{Backend, StreamRequest};
use orbit_core::error::{OrbitError, Result};
use orbit_core::event::StreamEvent;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};

use crate::event_bus::LocalEventBus;

pub struct ProcessBackend {
    program: String,
    args: Vec<String>,
    bus: Arc<LocalEventBus>,
}

impl ProcessBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>, bus: Arc<LocalEventBus>) -> Self {
        Self {
            program: program.into(),
            args,
            bus,
        }
    }

    /// Spawns the program with piped stdio.
    fn spawn(&self) -> Result<Child> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                OrbitError::backend(format!("Failed to start '{}': {}", self.program, e))
            })?;
        tracing::debug!("[ProcessBackend] Started '{}'", self.program);
        Ok(child)
    }

    /// Writes `message` to the child's stdin and closes it.
    ///
    /// Runs alongside the output readers so a child that answers before it
    /// has read all of its input cannot fill the stdout pipe and stall.
    async fn feed(&self, stdin: Option<ChildStdin>, message: &str) -> Result<()> {
        let Some(mut stdin) = stdin else {
            return Ok(());
        };
        let written = async {
            stdin.write_all(message.as_bytes()).await?;
            stdin.shutdown().await
        };
        match written.await {
            Ok(()) => {
                tracing::trace!("[ProcessBackend] Wrote {} byte message", message.len());
                Ok(())
            }
            // The program exited (or closed stdin) without reading it all.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("[ProcessBackend] '{}' closed stdin early", self.program);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn failure_message(status: std::process::ExitStatus, stderr: &str) -> String {
        let stderr = stderr.trim();
        if stderr.is_empty() {
            format!("backend exited with {}", status)
        } else {
            stderr.to_string()
        }
    }
}

#[async_trait]
impl Backend for ProcessBackend {
    async fn ask(&self, message: &str) -> Result<String> {
        let mut child = self.spawn()?;
        let stdin = child.stdin.take();
        let (fed, output) = tokio::join!(self.feed(stdin, message), child.wait_with_output());
        fed?;
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OrbitError::backend(Self::failure_message(
                output.status,
                &stderr,
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end().to_string())
    }

    async fn stream(&self, request: StreamRequest) -> Result<()> {
        let mut child = self.spawn()?;
        let stdin = child.stdin.take();
        let message = request.message();
        let submission = request.submission;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OrbitError::internal("child stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| OrbitError::internal("child stderr was not captured"))?;

        let forward = async {
            let mut lines = BufReader::new(stdout).lines();
            let mut count = 0usize;
            while let Some(line) = lines.next_line().await? {
                self.bus
                    .emit_event(submission, &StreamEvent::Chunk(format!("{line}\n")));
                count += 1;
            }
            Ok::<usize, std::io::Error>(count)
        };
        let collect_stderr = async {
            let mut text = String::new();
            stderr.read_to_string(&mut text).await.map(|_| text)
        };

        let (fed, forwarded, stderr_text) =
            tokio::join!(self.feed(stdin, &message), forward, collect_stderr);
        if let Err(e) = fed {
            // The exit status below decides how the stream ends.
            tracing::warn!("[ProcessBackend] Failed to write the message: {}", e);
        }
        let status = child.wait().await?;

        let event = match (forwarded, status.success()) {
            (Ok(count), true) => {
                tracing::debug!("[ProcessBackend] Stream finished after {} line(s)", count);
                StreamEvent::Done
            }
            (Ok(_), false) => {
                let stderr_text = stderr_text.unwrap_or_default();
                StreamEvent::Error(Self::failure_message(status, &stderr_text))
            }
            (Err(e), _) => StreamEvent::Error(format!("Failed to read backend output: {}", e)),
        };

        if let StreamEvent::Error(message) = &event {
            tracing::warn!("[ProcessBackend] Stream failed: {}", message);
        }
        self.bus.emit_event(submission, &event);
        Ok(())
    }
}
