/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! The record model and message interpolation (spec.md §3, §4.1).

use crate::level::Level;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A nullary callable contributing a value to every record it's registered on.
/// Producers are evaluated once per record (spec.md §4.1 step 2/3); caching
/// must not extend beyond a single record (spec.md §9 "Callable extras").
pub type Producer = Arc<dyn Fn() -> Value + Send + Sync>;

/// Call-site context passed by the caller of `Logger::log`. An ordered map so
/// that interpolation and `data` serialization are deterministic.
pub type CallContext = Map<String, Value>;

/// A fully-built record, ready to hand to a `Formatter`.
///
/// Matches the wire shape in spec.md §6:
/// `{ context, level, message, <root fields...>, data: { ... } }`.
#[derive(Debug, Clone)]
pub struct Record {
    pub context: String,
    pub level: Level,
    pub message: String,
    /// Additional root-level fields registered via `addField`, evaluated for
    /// this record.
    pub root: Map<String, Value>,
    /// Call-site context merged with extras registered via `addExtra`.
    pub data: Map<String, Value>,
}

impl Record {
    /// Renders this record as the canonical JSON wire form (spec.md §6),
    /// preserving field insertion order.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("context".into(), Value::String(self.context.clone()));
        obj.insert("level".into(), Value::String(self.level.name().to_owned()));
        obj.insert("message".into(), Value::String(self.message.clone()));
        for (k, v) in &self.root {
            obj.entry(k.clone()).or_insert_with(|| v.clone());
        }
        obj.insert("data".into(), Value::Object(self.data.clone()));
        Value::Object(obj)
    }
}

/// First-wins registry of named producers, shared by root fields (C2) and
/// extras (C2). Both `addField` and `addExtra` use one of these.
#[derive(Default, Clone)]
pub struct ProducerRegistry {
    entries: Vec<(String, Producer)>,
}

impl ProducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `producer` under `name` unless `name` is already registered
    /// (spec.md §3 "first registration wins; idempotent").
    pub fn add(&mut self, name: impl Into<String>, producer: Producer) {
        let name = name.into();
        if self.entries.iter().any(|(n, _)| n == &name) {
            return;
        }
        self.entries.push((name, producer));
    }

    /// Evaluates every registered producer, returning the resulting map in
    /// registration order.
    pub fn evaluate(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, producer) in &self.entries {
            out.insert(name.clone(), producer());
        }
        out
    }
}

/// Builds finished `Record`s from root-field and extra producer registries
/// (spec.md §4.1).
#[derive(Default, Clone)]
pub struct RecordBuilder {
    fields: ProducerRegistry,
    extras: ProducerRegistry,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, name: impl Into<String>, producer: Producer) {
        self.fields.add(name, producer);
    }

    pub fn add_extra(&mut self, name: impl Into<String>, producer: Producer) {
        self.extras.add(name, producer);
    }

    /// Builds the finished record for one log call (spec.md §4.1).
    pub fn build(
        &self,
        context: &str,
        level: Level,
        message: &str,
        call_context: CallContext,
    ) -> Record {
        let root = self.fields.evaluate();

        // Evaluate extras, but the caller's own keys win over extras
        // registered under the same name (spec.md §3 "existing keys win").
        let mut data = self.extras.evaluate();
        for (k, v) in call_context {
            data.insert(k, v);
        }

        let mut lookup = data.clone();
        for (k, v) in &root {
            lookup.entry(k.clone()).or_insert_with(|| v.clone());
        }

        let message = interpolate(message, &lookup);

        Record { context: context.to_owned(), level, message, root, data }
    }
}

/// Substitutes `{identifier}` placeholders in `template` using `lookup`
/// (spec.md §4.1 "Interpolation language"). Unknown placeholders and
/// unmatched braces are left verbatim. Single-pass: substituted text is
/// never re-scanned for further placeholders.
pub fn interpolate(template: &str, lookup: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i + 1..].find('}') {
                let name = &template[i + 1..i + 1 + end];
                // Identifiers never contain another '{', otherwise this is
                // just a literal brace followed by other text.
                if !name.contains('{') {
                    match lookup.get(name) {
                        Some(v) => {
                            out.push_str(&scalarize(v));
                            i = i + 1 + end + 1;
                            continue;
                        }
                        None => {
                            out.push_str(&template[i..=i + 1 + end]);
                            i = i + 1 + end + 1;
                            continue;
                        }
                    }
                }
            }
        }
        // Copy one char verbatim (handles the unmatched-brace case too).
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Renders a `Value` the way interpolation substitutes it: scalars as their
/// plain string form, everything else (maps, lists) as compact JSON.
fn scalarize(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_owned(),
        Value::Bool(_) | Value::Number(_) => v.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn substitutes_known_placeholder() {
        let lookup = map(&[("name", Value::String("w".into()))]);
        assert_eq!(interpolate("Hello {name}!", &lookup), "Hello w!");
    }

    #[test]
    fn leaves_unknown_placeholder_verbatim() {
        let lookup = Map::new();
        assert_eq!(interpolate("Hello {name}!", &lookup), "Hello {name}!");
    }

    #[test]
    fn compact_json_for_non_scalars() {
        let lookup = map(&[("m", Value::Array(vec![1.into(), 2.into(), 3.into()]))]);
        assert_eq!(interpolate("{m}", &lookup), "[1,2,3]");
    }

    #[test]
    fn unmatched_braces_preserved() {
        let lookup = Map::new();
        assert_eq!(interpolate("a { b", &lookup), "a { b");
        assert_eq!(interpolate("a } b", &lookup), "a } b");
    }

    #[test]
    fn substitution_is_single_pass() {
        let lookup = map(&[("x", Value::String("{y}".into()))]);
        assert_eq!(interpolate("{x}", &lookup), "{y}");
    }

    #[test]
    fn add_field_first_wins() {
        let mut reg = ProducerRegistry::new();
        reg.add("k", Arc::new(|| Value::String("first".into())));
        reg.add("k", Arc::new(|| Value::String("second".into())));
        assert_eq!(reg.evaluate().get("k").unwrap(), "first");
    }

    #[test]
    fn builder_merges_root_and_extras_with_call_context_winning() {
        let mut b = RecordBuilder::new();
        b.add_field("host", Arc::new(|| Value::String("h1".into())));
        b.add_extra("tag", Arc::new(|| Value::String("REQ-42".into())));

        let rec = b.build("svc", Level::Info, "{tag} processed", Map::new());
        assert_eq!(rec.message, "REQ-42 processed");
        assert_eq!(rec.data.get("tag").unwrap(), "REQ-42");
        assert_eq!(rec.root.get("host").unwrap(), "h1");
        assert!(!rec.data.contains_key("host"));

        let mut call_ctx = Map::new();
        call_ctx.insert("tag".into(), Value::String("CALLER".into()));
        let rec2 = b.build("svc", Level::Info, "{tag}", call_ctx);
        assert_eq!(rec2.message, "CALLER");
    }
}
