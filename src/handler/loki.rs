/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Grafana Loki sink (spec.md §4.7 "Slack / Teams / Loki", §6 "Loki push
//! endpoint"). A thin wrapper over the shared `HttpTransport` plus
//! `LokiFormatter`, the way `aurowora-log_loki::Loki` wraps its own
//! formatter and background push task.

use super::{impl_handler_core, write_to_stream, HandlerCore, HandlerKind, Streamable};
use crate::error::{Error, Result};
use crate::formatter::LokiFormatter;
use crate::level::Level;
use crate::record::Record;
use crate::transport::{HttpMethod, HttpTransport};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

pub struct LokiHandler {
    core: HandlerCore,
    push_url: String,
    transport: HttpTransport,
    stream: Mutex<Option<Box<dyn Write + Send>>>,
}

impl LokiHandler {
    pub fn new(base_url: &str, labels: HashMap<String, String>, min_level: Level) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::NoLabels);
        }
        let transport = HttpTransport::builder().method(HttpMethod::Post).build()?;
        let core = HandlerCore::new(min_level);
        core.set_format_inner(std::sync::Arc::new(LokiFormatter::new(labels)));
        Ok(Self {
            core,
            push_url: format!("{}/loki/api/v1/push", base_url.trim_end_matches('/')),
            transport,
            stream: Mutex::new(None),
        })
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

        if self.transport.send(&self.push_url, payload.as_bytes()) {
            Some(payload)
        } else {
            None
        }
    }
}

impl Streamable for LokiHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        *self.stream.lock().expect("stream lock poisoned") = stream;
    }
}

impl_handler_core!(LokiHandler, HandlerKind::Loki);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use serde_json::Map;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn rejects_empty_labels() {
        let err = LokiHandler::new("http://localhost:3100", HashMap::new(), Level::Info).unwrap_err();
        assert!(matches!(err, Error::NoLabels));
    }

    #[test]
    fn writes_push_body_to_overridden_stream() {
        let mut labels = HashMap::new();
        labels.insert("app".to_owned(), "ordersvc".to_owned());
        let handler = LokiHandler::new("http://localhost:3100", labels, Level::Info).unwrap();

        let buf = SharedBuf::default();
        handler.set_stream(Some(Box::new(buf.clone())));

        let rec = Record {
            context: "OrderSvc".into(),
            level: Level::Error,
            message: "failed".into(),
            root: Map::new(),
            data: Map::new(),
        };
        handler.invoke(&rec);

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(written.contains("\"app\":\"ordersvc\""));
    }
}
