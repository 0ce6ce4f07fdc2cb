/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use super::Formatter;
use crate::record::Record;
use serde_json::Value;

/// Single-line text formatter: `context level message data`. This is the
/// handler default (spec.md §3, §4.8 "Line").
#[derive(Debug, Default, Clone, Copy)]
pub struct LineFormatter;

impl Formatter for LineFormatter {
    fn format(&self, record: &Record) -> String {
        let data = serde_json::to_string(&Value::Object(record.data.clone()))
            .unwrap_or_else(|_| "{}".to_owned());
        format!("[{}] {}: {} {}", record.context, record.level, record.message, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use serde_json::Map;

    #[test]
    fn formats_context_level_message_and_data() {
        let rec = Record {
            context: "svc".into(),
            level: Level::Warning,
            message: "oops".into(),
            root: Map::new(),
            data: Map::new(),
        };
        assert_eq!(LineFormatter.format(&rec), "[svc] warning: oops {}");
    }
}
