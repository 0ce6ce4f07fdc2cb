/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! ChromeLogger batch formatter, backing the browser-console handler
//! (spec.md §4.8 "ChromeLogger", §6 "ChromeLogger"). Accumulates rows across
//! calls; the handler reads `payload()` once at shutdown.

use super::Formatter;
use crate::level::Level;
use crate::record::Record;
use serde_json::{json, Value};
use std::sync::Mutex;

/// One accumulated `[messageParts, backtrace, type]` row.
#[derive(Debug, Clone)]
pub struct ChromeRow {
    pub message_parts: Vec<Value>,
    pub backtrace: String,
    pub kind: &'static str,
}

fn kind_for(level: Level) -> &'static str {
    match level {
        Level::Emergency | Level::Alert | Level::Critical | Level::Error => "error",
        Level::Warning => "warn",
        Level::Notice | Level::Info => "info",
        Level::Debug => "log",
    }
}

#[derive(Default)]
pub struct ChromeLoggerFormatter {
    rows: Mutex<Vec<ChromeRow>>,
}

impl ChromeLoggerFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the currently accumulated rows.
    pub fn get_rows(&self) -> Vec<ChromeRow> {
        self.rows.lock().expect("chrome row lock poisoned").clone()
    }

    /// Clears the accumulated rows (used when a batch is flushed).
    pub fn reset(&self) {
        self.rows.lock().expect("chrome row lock poisoned").clear();
    }

    /// The full batch payload for the `X-ChromeLogger-Data` header
    /// (spec.md §6): `{version, columns, rows}`.
    pub fn payload(&self) -> String {
        let rows = self.get_rows();
        let rows_json: Vec<Value> = rows
            .iter()
            .map(|r| json!([r.message_parts, r.backtrace, r.kind]))
            .collect();
        json!({
            "version": "4.1.0",
            "columns": ["log", "backtrace", "type"],
            "rows": rows_json,
        })
        .to_string()
    }

    /// Approximate size in bytes of the current accumulated payload, used by
    /// the browser-console handler to enforce the 240000-byte cap.
    pub fn payload_len(&self) -> usize {
        self.payload().len()
    }
}

impl Formatter for ChromeLoggerFormatter {
    fn format(&self, record: &Record) -> String {
        let backtrace = record
            .root
            .get("file_line")
            .or_else(|| record.data.get("file_line"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_owned())
            .unwrap_or_else(|| "unknown".to_owned());

        let row = ChromeRow {
            message_parts: vec![Value::String(record.message.clone())],
            backtrace,
            kind: kind_for(record.level),
        };
        let line = json!([row.message_parts, row.backtrace, row.kind]);
        self.rows.lock().expect("chrome row lock poisoned").push(row);
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn derives_row_type_from_level() {
        let fmt = ChromeLoggerFormatter::new();
        let rec = Record {
            context: String::new(),
            level: Level::Error,
            message: "boom".into(),
            root: Map::new(),
            data: Map::new(),
        };
        fmt.format(&rec);
        let rows = fmt.get_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "error");
        assert_eq!(rows[0].backtrace, "unknown");
    }

    #[test]
    fn payload_contains_version_and_columns() {
        let fmt = ChromeLoggerFormatter::new();
        let rec = Record {
            context: String::new(),
            level: Level::Info,
            message: "hi".into(),
            root: Map::new(),
            data: Map::new(),
        };
        fmt.format(&rec);
        let payload = fmt.payload();
        assert!(payload.contains("\"version\":\"4.1.0\""));
        assert!(payload.contains("\"columns\":[\"log\",\"backtrace\",\"type\"]"));
        fmt.reset();
        assert!(fmt.get_rows().is_empty());
    }
}
