//! Logger collaborator used to report runtime failures and `print` output.

use std::cell::RefCell;

use tracing::{debug, error, info};

/// Log sink for messages meant for the performer.
pub trait Logger {
    fn info(&self, msg: &str);
    fn error(&self, msg: &str);
    fn debug(&self, msg: &str);
}

/// Forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, msg: &str) {
        info!(target: "cadenza", "{msg}");
    }

    fn error(&self, msg: &str) {
        error!(target: "cadenza", "{msg}");
    }

    fn debug(&self, msg: &str) {
        debug!(target: "cadenza", "{msg}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
    Debug,
}

/// Keeps every message in memory, e.g. to show in a log pane.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: RefCell<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.borrow().clone()
    }

    fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.messages(LogLevel::Info)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(LogLevel::Error)
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    fn push(&self, level: LogLevel, msg: &str) {
        self.entries.borrow_mut().push((level, msg.to_string()));
    }
}

impl Logger for MemoryLogger {
    fn info(&self, msg: &str) {
        self.push(LogLevel::Info, msg);
    }

    fn error(&self, msg: &str) {
        self.push(LogLevel::Error, msg);
    }

    fn debug(&self, msg: &str) {
        self.push(LogLevel::Debug, msg);
    }
}
