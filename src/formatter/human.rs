/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use super::Formatter;
use crate::record::Record;
use std::fmt::Write as _;

/// Multi-line indented text, meant for interactive consoles (spec.md §4.8
/// "Human").
#[derive(Debug, Default, Clone, Copy)]
pub struct HumanFormatter;

impl Formatter for HumanFormatter {
    fn format(&self, record: &Record) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} [{}]", record.level, record.context);
        let _ = writeln!(out, "  {}", record.message);
        if !record.data.is_empty() {
            for (k, v) in &record.data {
                let _ = writeln!(out, "    {}: {}", k, v);
            }
        }
        out.pop(); // drop the trailing newline
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use serde_json::Map;

    #[test]
    fn indents_data_entries() {
        let mut data = Map::new();
        data.insert("user".into(), "alice".into());
        let rec = Record {
            context: "svc".into(),
            level: Level::Error,
            message: "boom".into(),
            root: Map::new(),
            data,
        };
        let out = HumanFormatter.format(&rec);
        assert!(out.contains("error [svc]"));
        assert!(out.contains("  boom"));
        assert!(out.contains("    user: \"alice\""));
    }
}
