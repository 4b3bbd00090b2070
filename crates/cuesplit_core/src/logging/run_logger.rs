//! Per-cuesheet run log.
//!
//! Lines go to `<logs>/<name>.log` and to an optional callback. Tool output
//! is kept in a bounded tail so a failing step can replay the last lines;
//! in compact mode that tail is the only place tool output lands.
//!
//! Workers share one logger through an `Arc`; every method takes `&self`.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};
use crate::naming::clean_file_stem;

pub struct RunLogger {
    name: String,
    log_path: Option<PathBuf>,
    file: Mutex<Option<BufWriter<File>>>,
    callback: Option<LogCallback>,
    config: LogConfig,
    tail: Mutex<VecDeque<String>>,
    /// Percentage of the last progress line written.
    last_progress: Mutex<u32>,
}

impl RunLogger {
    /// Log to `<log_dir>/<name>.log`, truncating an older log of the same run.
    pub fn new(
        name: impl AsRef<str>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> io::Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", clean_file_stem(name.as_ref())));
        let file = File::create(&log_path)?;

        let mut logger = Self::detached(name, config, callback);
        logger.log_path = Some(log_path);
        logger.file = Mutex::new(Some(BufWriter::new(file)));
        Ok(logger)
    }

    /// Logger without a file: callback and tail only.
    pub fn detached(name: impl AsRef<str>, config: LogConfig, callback: Option<LogCallback>) -> Self {
        Self {
            name: name.as_ref().to_string(),
            log_path: None,
            file: Mutex::new(None),
            callback,
            tail: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
            last_progress: Mutex::new(0),
        }
    }

    /// Cuesheet stem or album title the run is named after.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level >= self.config.level {
            self.emit(message);
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Command line about to run.
    pub fn command(&self, command: &str) {
        self.info(&MessagePrefix::Command.format(command));
    }

    pub fn phase(&self, name: &str) {
        self.info(&MessagePrefix::Phase.format(name));
    }

    pub fn success(&self, message: &str) {
        self.info(&MessagePrefix::Success.format(message));
    }

    /// Finished-track counter. In compact mode only every
    /// `progress_step` percent (and 100%) is written.
    ///
    /// Returns whether a line was written.
    pub fn progress(&self, done: usize, total: usize) -> bool {
        let percent = match total {
            0 => 100,
            _ => (done.min(total) * 100 / total) as u32,
        };

        if self.config.compact {
            let step = self.config.progress_step.max(1);
            let mut last = self.last_progress.lock();
            if percent < 100 && percent / step <= *last / step {
                return false;
            }
            *last = percent;
        }

        self.info(&format!("Progress: {}/{} tracks ({}%)", done, total, percent));
        true
    }

    /// Combined stdout/stderr of a tool, blank lines dropped.
    pub fn tool_output(&self, output: &str) {
        let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();

        if self.config.error_tail > 0 {
            let mut tail = self.tail.lock();
            for line in &lines {
                if tail.len() == self.config.error_tail {
                    tail.pop_front();
                }
                tail.push_back((*line).to_string());
            }
        }

        if !self.config.compact {
            for line in lines {
                self.emit(line);
            }
        }
    }

    /// Replay the tail under a `[tool/tail]` header.
    pub fn show_tail(&self, tool: &str) {
        let lines = self.tail();
        if lines.is_empty() {
            return;
        }
        self.emit(&format!("[{}/tail]", tool));
        for line in &lines {
            self.emit(line);
        }
    }

    /// Last tool output lines, oldest first.
    pub fn tail(&self) -> Vec<String> {
        self.tail.lock().iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }

    fn emit(&self, message: &str) {
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };

        if let Some(file) = self.file.lock().as_mut() {
            let _ = writeln!(file, "{}", line);
        }
        if let Some(callback) = &self.callback {
            callback(&line);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.flush();
    }
}
