/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use super::Formatter;
use crate::record::Record;

/// Canonical JSON formatter; field order matches the record's own insertion
/// order (spec.md §4.8 "JSON").
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, record: &Record) -> String {
        serde_json::to_string(&record.to_json()).unwrap_or_else(|_| "{}".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use serde_json::Map;

    #[test]
    fn preserves_root_field_order() {
        let mut root = Map::new();
        root.insert("host".into(), "h1".into());
        root.insert("env".into(), "prod".into());
        let rec = Record {
            context: "svc".into(),
            level: Level::Info,
            message: "hi".into(),
            root,
            data: Map::new(),
        };
        let out = JsonFormatter.format(&rec);
        assert!(out.find("\"host\"").unwrap() < out.find("\"env\"").unwrap());
    }
}
