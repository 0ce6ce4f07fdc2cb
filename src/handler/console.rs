/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Console / error-stream sinks: bind to the process's stdout or stderr and
//! are never closed (spec.md §4.7 "Console / error-stream").

use super::{write_to_stream, HandlerCore, HandlerKind, Streamable};
use crate::level::Level;
use crate::record::Record;
use std::io::{self, Write};
use std::sync::Mutex;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Stdout,
    Stderr,
}

/// Writes to stdout by default, or stderr when `is_error_stream` is used.
/// The sentinel stream itself is borrowed, never closed (spec.md §5
/// "Shared-resource policy").
pub struct ConsoleHandler {
    core: HandlerCore,
    target: Target,
    stream: Mutex<Option<Box<dyn Write + Send>>>,
}

impl ConsoleHandler {
    pub fn new(min_level: Level) -> Self {
        Self { core: HandlerCore::new(min_level), target: Target::Stdout, stream: Mutex::new(None) }
    }

    pub fn error_stream(min_level: Level) -> Self {
        Self { core: HandlerCore::new(min_level), target: Target::Stderr, stream: Mutex::new(None) }
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        if !self.core.responsible(record.level) {
            return None;
        }
        let payload = self.core.format(record);

        let mut guard = self.stream.lock().expect("stream lock poisoned");
        if let Some(stream) = guard.as_mut() {
            return write_to_stream(stream.as_mut(), &payload);
        }
        drop(guard);

        match self.target {
            Target::Stdout => write_to_stream(&mut io::stdout(), &payload),
            Target::Stderr => write_to_stream(&mut io::stderr(), &payload),
        }
    }

    pub fn kind_tag(&self) -> HandlerKind {
        match self.target {
            Target::Stdout => HandlerKind::Console,
            Target::Stderr => HandlerKind::ErrorStream,
        }
    }
}

impl Streamable for ConsoleHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        *self.stream.lock().expect("stream lock poisoned") = stream;
    }
}

impl crate::handler::Handler for ConsoleHandler {
    fn invoke(&self, record: &Record) -> Option<String> {
        self.invoke_impl(record)
    }

    fn set_context(&self, context: &str) {
        self.core.set_context_inner(context);
    }

    fn set_format(&self, formatter: std::sync::Arc<dyn crate::formatter::Formatter>) {
        self.core.set_format_inner(formatter);
    }

    fn set_handler_name(&self, name: Option<String>) {
        self.core.set_name(name);
    }

    fn handler_name(&self) -> Option<String> {
        self.core.name()
    }

    fn handler_id(&self) -> &super::HandlerId {
        self.core.id()
    }

    fn min_level(&self) -> Level {
        self.core.min_level()
    }

    fn kind(&self) -> HandlerKind {
        self.kind_tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use serde_json::Map;

    #[test]
    fn stream_override_captures_output_instead_of_real_stream() {
        let handler = ConsoleHandler::new(Level::Debug);
        let buf: Vec<u8> = Vec::new();
        handler.set_stream(Some(Box::new(buf)));
        let rec = Record {
            context: "svc".into(),
            level: Level::Info,
            message: "hello".into(),
            root: Map::new(),
            data: Map::new(),
        };
        assert!(handler.invoke(&rec).is_some());
    }

    #[test]
    fn error_stream_variant_has_its_own_kind() {
        let handler = ConsoleHandler::error_stream(Level::Warning);
        assert_eq!(handler.kind(), HandlerKind::ErrorStream);
    }
}
