/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Microsoft Teams MessageCard payload formatter (spec.md §4.8 "Teams
//! MessageCard").

use super::Formatter;
use crate::level::Level;
use crate::record::Record;
use serde_json::{json, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct TeamsFormatter;

fn theme_color(level: Level) -> &'static str {
    match level {
        Level::Emergency => "FF0000",
        Level::Alert => "DC3545",
        Level::Critical | Level::Error => "DC3545",
        Level::Warning => "FFC107",
        Level::Notice => "17A2B8",
        Level::Info => "007BFF",
        Level::Debug => "6C757D",
    }
}

fn emoji(level: Level) -> &'static str {
    match level {
        Level::Emergency | Level::Alert | Level::Critical => "\u{1F6A8}",
        Level::Error => "\u{274C}",
        Level::Warning => "\u{26A0}\u{FE0F}",
        Level::Notice | Level::Info => "\u{2139}\u{FE0F}",
        Level::Debug => "\u{1F41B}",
    }
}

fn truncate(value: &str) -> String {
    if value.chars().count() > 100 {
        let prefix: String = value.chars().take(97).collect();
        format!("{}...", prefix)
    } else {
        value.to_owned()
    }
}

fn value_to_display(v: &Value) -> String {
    match v {
        Value::String(s) => truncate(s),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_owned(),
        Value::Number(_) => truncate(&v.to_string()),
        Value::Array(_) | Value::Object(_) => truncate(&v.to_string()),
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl Formatter for TeamsFormatter {
    fn format(&self, record: &Record) -> String {
        let summary: String = record.message.chars().take(80).collect();

        let mut facts = vec![json!({ "name": "Level", "value": record.level.to_string() })];
        if !record.context.is_empty() {
            facts.push(json!({ "name": "Context", "value": record.context }));
        }
        if let Some(ts) = record.root.get("timestamp").or_else(|| record.data.get("timestamp")) {
            facts.push(json!({ "name": "Timestamp", "value": value_to_display(ts) }));
        }

        let mut shown = 0usize;
        for (k, v) in &record.data {
            if k == "timestamp" {
                continue;
            }
            if shown == 5 {
                let remaining = record.data.len() - shown - (if record.data.contains_key("timestamp") { 1 } else { 0 });
                facts.push(json!({
                    "name": "Additional Fields",
                    "value": format!("+{} more...", remaining),
                }));
                break;
            }
            facts.push(json!({ "name": capitalize(k), "value": value_to_display(v) }));
            shown += 1;
        }

        let mut activity_subtitle = None;
        if !record.context.is_empty() {
            activity_subtitle = Some(format!("Context: {}", record.context));
        }

        let mut section = json!({
            "activityTitle": record.message,
            "facts": facts,
        });
        if let Some(subtitle) = activity_subtitle {
            section["activitySubtitle"] = json!(subtitle);
        }

        let card = json!({
            "@type": "MessageCard",
            "@context": "http://schema.org/extensions",
            "summary": summary,
            "themeColor": theme_color(record.level),
            "title": format!("{} {}", emoji(record.level), record.level.to_string().to_uppercase()),
            "sections": [section],
        });
        card.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn truncates_summary_to_80_chars() {
        let long = "x".repeat(200);
        let rec = Record {
            context: String::new(),
            level: Level::Info,
            message: long,
            root: Map::new(),
            data: Map::new(),
        };
        let out = TeamsFormatter.format(&rec);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["summary"].as_str().unwrap().len(), 80);
    }

    #[test]
    fn caps_data_facts_at_five_with_additional_marker() {
        let mut data = Map::new();
        for i in 0..7 {
            data.insert(format!("k{}", i), Value::String(format!("v{}", i)));
        }
        let rec = Record {
            context: String::new(),
            level: Level::Error,
            message: "m".into(),
            root: Map::new(),
            data,
        };
        let out = TeamsFormatter.format(&rec);
        assert!(out.contains("more..."));
    }
}
