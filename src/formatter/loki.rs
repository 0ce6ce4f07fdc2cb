/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Grafana Loki push-API formatter (spec.md §4.8 "Loki", §6 "Loki push
//! endpoint"). Grounded on `aurowora-log_loki`'s `LokiStream`/`LokiPush`
//! wire types (`task.rs`) and `hrxi-tracing-loki`'s label handling.

use super::Formatter;
use crate::record::Record;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Formats a record as one Loki push-API request body containing a single
/// stream/value pair. Carries the constructor-supplied static labels (spec.md
/// §9 "Stateful formatters", immutable here, so no internal lock is needed).
#[derive(Debug, Clone)]
pub struct LokiFormatter {
    static_labels: HashMap<String, String>,
}

impl LokiFormatter {
    pub fn new(static_labels: HashMap<String, String>) -> Self {
        Self { static_labels }
    }
}

impl Formatter for LokiFormatter {
    fn format(&self, record: &Record) -> String {
        let mut labels = self.static_labels.clone();
        labels.insert("level".to_owned(), sanitize_label_value(record.level.name()));
        if !record.context.is_empty() {
            labels.insert("context".to_owned(), sanitize_label_value(&record.context));
        }

        let ts = resolve_timestamp_ns(record);

        let mut line = format!("\"{}\"", record.message.replace('"', "\\\""));
        if !record.data.is_empty() {
            if let Ok(data_json) = serde_json::to_string(&Value::Object(record.data.clone())) {
                line.push(' ');
                line.push_str(&data_json);
            }
        }

        let stream: Map<String, Value> =
            labels.into_iter().map(|(k, v)| (k, Value::String(v))).collect();

        let payload = serde_json::json!({
            "streams": [{
                "stream": stream,
                "values": [[ts.to_string(), line]],
            }]
        });
        payload.to_string()
    }
}

/// Resolves the nanosecond timestamp for a push, per spec.md §4.8: use
/// `record.timestamp` if present and an integer (seconds → nanos) or a
/// parseable number, otherwise current wall-clock.
///
/// NOTE (spec.md §9 open question, preserved verbatim): Loki only restricts
/// label *keys*, not values, but this formatter sanitizes label *values*
/// anyway, matching the source system's behavior rather than "fixing" it.
fn resolve_timestamp_ns(record: &Record) -> u128 {
    let candidate = record.root.get("timestamp").or_else(|| record.data.get("timestamp"));
    if let Some(v) = candidate {
        if let Some(n) = v.as_i64() {
            return (n as u128) * 1_000_000_000;
        }
        if let Some(n) = v.as_f64() {
            return (n * 1_000_000_000.0) as u128;
        }
        if let Some(s) = v.as_str() {
            if let Ok(n) = s.parse::<i64>() {
                return (n as u128) * 1_000_000_000;
            }
        }
    }
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_nanos()
}

/// Sanitizes a label value to `[a-zA-Z0-9_]`, prefixing `_` if the result
/// doesn't start with a letter or underscore (spec.md §4.8).
fn sanitize_label_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    match out.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => out,
        _ => format!("_{}", out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use serde_json::Map;

    #[test]
    fn sanitizes_forbidden_characters_and_leading_digit() {
        assert_eq!(sanitize_label_value("9abc"), "_9abc");
        assert_eq!(sanitize_label_value("a-b c"), "a_b_c");
        assert_eq!(sanitize_label_value("ok_value"), "ok_value");
    }

    #[test]
    fn includes_level_and_context_labels() {
        let fmt = LokiFormatter::new(HashMap::new());
        let rec = Record {
            context: "OrderSvc".into(),
            level: Level::Error,
            message: "failed".into(),
            root: Map::new(),
            data: Map::new(),
        };
        let out = fmt.format(&rec);
        assert!(out.contains("\"level\":\"error\""));
        assert!(out.contains("\"context\":\"OrderSvc\""));
        assert!(out.contains("\"failed\""));
    }
}
