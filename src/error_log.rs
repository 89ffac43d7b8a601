use std::fs::OpenOptions;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;

const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Append-only text log of identifiers that could not be enriched.
///
/// Writing is best effort: a log that cannot be opened or written is reported
/// through `tracing` and otherwise ignored.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: Utf8PathBuf,
}

impl ErrorLog {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn log(&self, cnpj: &str, message: &str) {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let line = format_line(&timestamp, cnpj, message);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(err) = result {
            tracing::warn!(path = %self.path, %cnpj, "could not write error log: {err}");
        }
    }
}

pub fn format_line(timestamp: &str, cnpj: &str, message: &str) -> String {
    format!("{timestamp} - error processing {cnpj}: {message}\n")
}
