//! Progress reporting
//!
//! The orchestrator reports progress through a [`Reporter`] passed in by the
//! caller. Verbose runs print to stderr; quiet runs use [`NoopReporter`].

use colored::Colorize;
use std::sync::{Arc, Mutex};

/// Observer for task progress
pub trait Reporter: Send + Sync {
    fn on_info(&self, message: &str);
    fn on_start(&self, message: &str);
    fn on_succeed(&self, message: &str);
    fn on_fail(&self, message: &str);
}

/// Reporter that drops every message
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn on_info(&self, _message: &str) {}
    fn on_start(&self, _message: &str) {}
    fn on_succeed(&self, _message: &str) {}
    fn on_fail(&self, _message: &str) {}
}

/// Reporter printing symbol-prefixed lines to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn on_info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".blue(), message);
    }

    fn on_start(&self, message: &str) {
        eprintln!("{} {}", "›".cyan(), message);
    }

    fn on_succeed(&self, message: &str) {
        eprintln!("{} {}", "✔".green(), message);
    }

    fn on_fail(&self, message: &str) {
        eprintln!("{} {}", "✖".red(), message.red());
    }
}

/// Pick the reporter for a run
pub fn reporter_for(verbose: bool) -> Arc<dyn Reporter> {
    if verbose {
        Arc::new(ConsoleReporter)
    } else {
        Arc::new(NoopReporter)
    }
}

/// Kind of a recorded progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Info,
    Start,
    Succeed,
    Fail,
}

/// Reporter keeping every event in memory, for inspection after a run
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<(EventKind, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in order
    pub fn events(&self) -> Vec<(EventKind, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Messages of one kind
    pub fn messages(&self, kind: EventKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, message)| message)
            .collect()
    }

    fn record(&self, kind: EventKind, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((kind, message.to_string()));
        }
    }
}

impl Reporter for RecordingReporter {
    fn on_info(&self, message: &str) {
        self.record(EventKind::Info, message);
    }

    fn on_start(&self, message: &str) {
        self.record(EventKind::Start, message);
    }

    fn on_succeed(&self, message: &str) {
        self.record(EventKind::Succeed, message);
    }

    fn on_fail(&self, message: &str) {
        self.record(EventKind::Fail, message);
    }
}
