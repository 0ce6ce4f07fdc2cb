/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Conditional decorator (spec.md §4.6): routes each record to the first
//! handler whose predicate matches, falling back to a default handler if
//! none do.

use crate::formatter::Formatter;
use crate::handler::{Handler, HandlerId, HandlerKind, Streamable};
use crate::level::Level;
use crate::record::Record;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// A predicate over `(level, message, data)`, matching the call-site triple
/// spec.md describes rather than the fully-built record's extra fields.
pub type Predicate = Arc<dyn Fn(Level, &str, &serde_json::Map<String, serde_json::Value>) -> bool + Send + Sync>;

pub struct ConditionalHandler {
    id: HandlerId,
    name: Mutex<Option<String>>,
    rules: Vec<(Predicate, Arc<dyn Streamable>)>,
    fallback: Option<Arc<dyn Streamable>>,
}

impl ConditionalHandler {
    pub fn new(rules: Vec<(Predicate, Arc<dyn Streamable>)>, fallback: Option<Arc<dyn Streamable>>) -> Self {
        Self { id: HandlerId::new(), name: Mutex::new(None), rules, fallback }
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        for (predicate, handler) in &self.rules {
            if predicate(record.level, &record.message, &record.data) {
                return handler.invoke(record);
            }
        }
        self.fallback.as_ref().and_then(|h| h.invoke(record))
    }

    /// Every contained handler, rules then fallback, for propagating
    /// `set_context`/`set_format`/`set_stream` (spec.md §4.6 "propagate to
    /// every contained handler").
    fn contained(&self) -> impl Iterator<Item = &Arc<dyn Streamable>> {
        self.rules.iter().map(|(_, h)| h).chain(self.fallback.iter())
    }
}

impl Handler for ConditionalHandler {
    fn invoke(&self, record: &Record) -> Option<String> {
        self.invoke_impl(record)
    }

    fn set_context(&self, context: &str) {
        for handler in self.contained() {
            handler.set_context(context);
        }
    }

    fn set_format(&self, formatter: Arc<dyn Formatter>) {
        for handler in self.contained() {
            handler.set_format(formatter.clone());
        }
    }

    fn set_handler_name(&self, name: Option<String>) {
        *self.name.lock().expect("name lock poisoned") = name;
    }

    fn handler_name(&self) -> Option<String> {
        self.name.lock().expect("name lock poisoned").clone()
    }

    fn handler_id(&self) -> &HandlerId {
        &self.id
    }

    fn min_level(&self) -> Level {
        Level::Debug
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Conditional
    }
}

/// Lets several contained handlers share one `set_stream` override: each
/// gets its own handle onto the same underlying writer, serialized by a
/// mutex (`Box<dyn Write>` itself isn't `Clone`).
struct SharedWriter(Arc<Mutex<Box<dyn Write + Send>>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("shared writer lock poisoned").write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().expect("shared writer lock poisoned").flush()
    }
}

impl Streamable for ConditionalHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        let shared = stream.map(|w| Arc::new(Mutex::new(w)));
        for handler in self.contained() {
            handler.set_stream(shared.clone().map(|w| Box::new(SharedWriter(w)) as Box<dyn Write + Send>));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ConsoleHandler;
    use serde_json::Map;
    use std::sync::Mutex as StdMutex;

    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);
    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn spy() -> (Arc<ConsoleHandler>, Arc<StdMutex<Vec<u8>>>) {
        let handler = Arc::new(ConsoleHandler::new(Level::Debug));
        let buf = Arc::new(StdMutex::new(Vec::new()));
        handler.set_stream(Some(Box::new(SharedBuf(buf.clone()))));
        (handler, buf)
    }

    fn rec(level: Level, msg: &str, data: Map<String, serde_json::Value>) -> Record {
        Record { context: "ctx".into(), level, message: msg.into(), root: Map::new(), data }
    }

    #[test]
    fn routes_to_first_matching_predicate_with_fallback() {
        let (h1, b1) = spy();
        let (h2, b2) = spy();
        let (h3, b3) = spy();

        let is_error: Predicate = Arc::new(|level, _msg, _data| level == Level::Error);
        let is_admin: Predicate = Arc::new(|_level, _msg, data| {
            matches!(data.get("user"), Some(serde_json::Value::String(s)) if s == "admin")
        });

        let cond = ConditionalHandler::new(vec![(is_error, h1), (is_admin, h2)], Some(h3));

        cond.invoke(&rec(Level::Error, "e", Map::new()));
        let mut admin_ctx = Map::new();
        admin_ctx.insert("user".into(), "admin".into());
        cond.invoke(&rec(Level::Info, "i", admin_ctx));
        cond.invoke(&rec(Level::Info, "i2", Map::new()));

        assert_eq!(b1.lock().unwrap().len() > 0, true);
        assert_eq!(b2.lock().unwrap().len() > 0, true);
        assert_eq!(b3.lock().unwrap().len() > 0, true);
    }

    #[test]
    fn no_match_and_no_fallback_returns_absent() {
        let never: Predicate = Arc::new(|_, _, _| false);
        let (h1, _) = spy();
        let cond = ConditionalHandler::new(vec![(never, h1)], None);
        assert!(cond.invoke(&rec(Level::Info, "x", Map::new())).is_none());
    }
}
