/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Browser-console sink (spec.md §4.7 "Browser console", §6 "ChromeLogger").
//! Accumulates rows in a `ChromeLoggerFormatter` and, on shutdown, base64
//! encodes the batch into an `X-ChromeLogger-Data` response header, iff the
//! caller's response headers haven't already been committed.

use super::{impl_handler_core, write_to_stream, HandlerCore, HandlerKind, Streamable};
use crate::formatter::ChromeLoggerFormatter;
use crate::level::Level;
use crate::record::Record;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Maximum bytes of accumulated batch JSON before an early flush
/// (spec.md §4.7 "A maximum in-memory payload of 240 000 bytes").
pub const MAX_BATCH_BYTES: usize = 240_000;

/// The host application's response-header surface. `headers_committed`
/// guards against writing a header after the response has already started
/// streaming to the client (spec.md §4.7 "iff response headers have not yet
/// been committed").
pub trait ShutdownHook: Send + Sync {
    fn headers_committed(&self) -> bool;
    fn set_header(&self, name: &str, value: &str);
}

pub struct ChromeConsoleHandler {
    core: HandlerCore,
    formatter: Arc<ChromeLoggerFormatter>,
    stream: Mutex<Option<Box<dyn Write + Send>>>,
    /// Batches flushed early because they hit `MAX_BATCH_BYTES` mid-request,
    /// base64-encoded and awaiting delivery by the host (spec.md §4.7 "the
    /// current batch is flushed and a new batch begins").
    overflowed: Mutex<Vec<String>>,
}

impl ChromeConsoleHandler {
    pub fn new(min_level: Level) -> Self {
        let formatter = Arc::new(ChromeLoggerFormatter::new());
        let core = HandlerCore::new(min_level);
        core.set_format_inner(formatter.clone());
        Self { core, formatter, stream: Mutex::new(None), overflowed: Mutex::new(Vec::new()) }
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

        if self.formatter.payload_len() > MAX_BATCH_BYTES {
            let batch = self.formatter.payload();
            self.overflowed.lock().expect("overflow lock poisoned").push(STANDARD.encode(batch));
            self.formatter.reset();
        }

        Some(payload)
    }

    /// Takes any batches that were flushed early due to the size cap.
    pub fn take_overflowed_batches(&self) -> Vec<String> {
        std::mem::take(&mut *self.overflowed.lock().expect("overflow lock poisoned"))
    }

    /// Emits the current batch (and any overflowed batches) as the
    /// `X-ChromeLogger-Data` header via `hook`, unless headers are already
    /// committed.
    pub fn on_shutdown(&self, hook: &dyn ShutdownHook) {
        if hook.headers_committed() {
            return;
        }
        for batch in self.take_overflowed_batches() {
            hook.set_header("X-ChromeLogger-Data", &batch);
        }
        let payload = self.formatter.payload();
        self.formatter.reset();
        hook.set_header("X-ChromeLogger-Data", &STANDARD.encode(payload));
    }
}

impl Streamable for ChromeConsoleHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        *self.stream.lock().expect("stream lock poisoned") = stream;
    }
}

impl_handler_core!(ChromeConsoleHandler, HandlerKind::BrowserConsole);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeHook {
        committed: AtomicBool,
        last_header: Mutex<Option<(String, String)>>,
    }

    impl ShutdownHook for FakeHook {
        fn headers_committed(&self) -> bool {
            self.committed.load(Ordering::SeqCst)
        }

        fn set_header(&self, name: &str, value: &str) {
            *self.last_header.lock().unwrap() = Some((name.to_owned(), value.to_owned()));
        }
    }

    #[test]
    fn emits_header_only_when_not_committed() {
        let handler = ChromeConsoleHandler::new(Level::Debug);
        let rec = Record {
            context: String::new(),
            level: Level::Info,
            message: "hi".into(),
            root: Map::new(),
            data: Map::new(),
        };
        handler.invoke_with_record(&rec);

        let hook = FakeHook { committed: AtomicBool::new(true), last_header: Mutex::new(None) };
        handler.on_shutdown(&hook);
        assert!(hook.last_header.lock().unwrap().is_none());

        let hook = FakeHook { committed: AtomicBool::new(false), last_header: Mutex::new(None) };
        handler.on_shutdown(&hook);
        assert!(hook.last_header.lock().unwrap().is_some());
    }

    impl ChromeConsoleHandler {
        fn invoke_with_record(&self, record: &Record) -> Option<String> {
            self.invoke_impl(record)
        }
    }
}
