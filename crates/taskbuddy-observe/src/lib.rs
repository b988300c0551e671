use anyhow::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use taskbuddy_core::runtime_dir;

/// Append-only operation log under the workspace runtime dir, with an
/// optional verbose echo to stderr.
pub struct Observer {
    log_path: PathBuf,
    verbose: bool,
}

impl Observer {
    pub fn new(workspace: &Path) -> Result<Self> {
        let dir = runtime_dir(workspace);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            log_path: dir.join("observe.log"),
            verbose: false,
        })
    }

    /// Enable or disable verbose logging to stderr.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Record one tool invocation with its outcome.
    pub fn record_tool_call(&self, name: &str, success: bool) -> Result<()> {
        self.verbose_log(&format!("tool {name} success={success}"));
        self.append_log_line(&format!(
            "{} TOOL name={name} success={success}",
            Utc::now().to_rfc3339()
        ))
    }

    /// Record one completed chat turn.
    pub fn record_chat_turn(&self, question: &str, answer_chars: usize) -> Result<()> {
        self.append_log_line(&format!(
            "{} CHAT question={:?} answer_chars={answer_chars}",
            Utc::now().to_rfc3339(),
            question
        ))
    }

    /// Log a message to stderr with `[taskbuddy]` prefix when verbose
    /// mode is on.
    pub fn verbose_log(&self, msg: &str) {
        if self.verbose {
            eprintln!("[taskbuddy] {msg}");
        }
    }

    /// Log a warning — always written to the log file, and to stderr.
    pub fn warn_log(&self, msg: &str) {
        eprintln!("[taskbuddy WARN] {msg}");
        let _ = self.append_log_line(&format!("{} WARN {msg}", Utc::now().to_rfc3339()));
    }

    fn append_log_line(&self, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}
