use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

/// Append-only JSONL event sink used for pipeline observability.
///
/// Every record is `{"timestamp", "event", "meta"}` on its own line. Write
/// failures are logged and swallowed: observability must never interrupt the
/// response path.
#[derive(Clone)]
pub struct EventLog {
    file: Arc<Mutex<Option<File>>>,
}

impl EventLog {
    /// Opens (creating parent directories as needed) the JSONL file at `path`.
    /// If the file cannot be opened, events are dropped with a warning.
    pub fn open(path: &str) -> Self {
        let file = open_append(path)
            .map_err(|e| warn!("Event log unavailable at {path}: {e}"))
            .ok();
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    /// An event log that discards everything. Used in tests.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            file: Arc::new(Mutex::new(None)),
        }
    }

    /// Appends one event record and mirrors it to the tracing stream.
    pub fn emit(&self, event: &str, meta: Value) {
        tracing::info!(target: "events", "{event} :: {meta}");
        let record = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "meta": meta,
        });

        let mut guard = match self.file.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(file) = guard.as_mut() {
            if let Err(e) = writeln!(file, "{record}") {
                warn!("Failed to write event log: {e}");
            }
        }
    }
}

fn open_append(path: &str) -> std::io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
