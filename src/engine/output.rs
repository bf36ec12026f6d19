// src/engine/output.rs

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::errors::BuildError;

/// Line terminator of the output stream.
pub const LINE_END: &str = "\r\n";

/// Writing end of a run's text stream.
///
/// Process output and engine diagnostics are interleaved on the same channel,
/// one chunk per line. Sends never block; if the reader is gone the text is
/// dropped (diagnostics still reach the log).
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: mpsc::UnboundedSender<String>,
}

impl OutputSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// A fresh sink and the receiver reading from it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Write one line verbatim (terminator appended).
    pub fn line(&self, text: impl AsRef<str>) {
        let _ = self.tx.send(format!("{}{LINE_END}", text.as_ref()));
    }

    /// Write an engine status line and log it.
    pub fn status(&self, task: &str, text: impl AsRef<str>) {
        let text = text.as_ref();
        info!(task = %task, "{text}");
        self.line(text);
    }

    /// Write a build error's message and log it.
    pub fn error(&self, err: &BuildError) {
        warn!(error = ?err, "{err}");
        self.line(err.to_string());
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
