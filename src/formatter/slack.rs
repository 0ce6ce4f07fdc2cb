/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Slack incoming-webhook payload formatter (spec.md §4.8 "Slack").

use super::Formatter;
use crate::level::Level;
use crate::record::Record;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default, Clone, Copy)]
pub struct SlackFormatter;

/// `(emoji, color)` tabulated by level, per spec.md §4.8.
fn emoji_and_color(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::Emergency | Level::Alert | Level::Critical => ("rotating_light", "danger"),
        Level::Error => ("x", "#ff0000"),
        Level::Warning => ("warning", "warning"),
        Level::Notice | Level::Info => ("speech_balloon", "#2196F3"),
        Level::Debug => ("bug", "#607D8B"),
    }
}

impl Formatter for SlackFormatter {
    fn format(&self, record: &Record) -> String {
        let (emoji, color) = emoji_and_color(record.level);
        let text = format!(":{}: {}", emoji, record.message);

        let mut out = json!({ "text": text });

        if !record.context.is_empty() || !record.data.is_empty() {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("system clock before epoch")
                .as_secs();

            let mut fields = Vec::new();
            if !record.context.is_empty() {
                fields.push(json!({ "title": "Context", "value": record.context, "short": true }));
            }
            fields.push(json!({ "title": "Level", "value": record.level.to_string(), "short": true }));
            if !record.data.is_empty() {
                let data_json = serde_json::to_string_pretty(&Value::Object(record.data.clone()))
                    .unwrap_or_default();
                fields.push(json!({
                    "title": "Data",
                    "value": format!("```{}```", data_json),
                    "short": false,
                }));
            }

            out["attachments"] = json!([{
                "color": color,
                "fields": fields,
                "footer": "logmux",
                "ts": ts,
            }]);
        }

        out.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn includes_emoji_prefix_in_text() {
        let rec = Record {
            context: String::new(),
            level: Level::Error,
            message: "boom".into(),
            root: Map::new(),
            data: Map::new(),
        };
        let out = SlackFormatter.format(&rec);
        assert!(out.contains(":x: boom"));
        assert!(!out.contains("attachments"));
    }

    #[test]
    fn adds_attachment_when_context_present() {
        let rec = Record {
            context: "svc".into(),
            level: Level::Warning,
            message: "careful".into(),
            root: Map::new(),
            data: Map::new(),
        };
        let out = SlackFormatter.format(&rec);
        assert!(out.contains("attachments"));
        assert!(out.contains("\"warning\""));
    }
}
