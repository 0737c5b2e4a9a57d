//! Best-effort clipboard access
//!
//! Copying a short link must never fail the request: callers turn a
//! `ClipboardError` into a notice for the user.

use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("no clipboard tool is available")]
    Unavailable,
    #[error("clipboard access was denied: {0}")]
    Denied(String),
}

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Pipes text into the first platform clipboard tool that runs.
#[derive(Debug, Default)]
pub struct SystemClipboard;

const TOOLS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip", &[]),
];

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut last_failure = None;

        for (program, args) in TOOLS {
            let mut child = match Command::new(program)
                .args(*args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
            {
                Ok(child) => child,
                // Not installed, try the next one.
                Err(_) => continue,
            };

            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(text.as_bytes()) {
                    last_failure = Some(format!("{}: {}", program, e));
                    let _ = child.wait();
                    continue;
                }
            }

            match child.wait() {
                Ok(status) if status.success() => {
                    tracing::debug!(tool = program, "copied text to clipboard");
                    return Ok(());
                }
                Ok(status) => last_failure = Some(format!("{} exited with {}", program, status)),
                Err(e) => last_failure = Some(format!("{}: {}", program, e)),
            }
        }

        match last_failure {
            Some(reason) => Err(ClipboardError::Denied(reason)),
            None => Err(ClipboardError::Unavailable),
        }
    }
}
