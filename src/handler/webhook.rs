/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Generic HTTP webhook sink (spec.md §4.7 "Webhook").

use super::{impl_handler_core, write_to_stream, HandlerCore, HandlerKind, Streamable};
use crate::error::{Error, Result};
use crate::level::Level;
use crate::record::Record;
use crate::transport::HttpTransport;
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};
use url::Url;

/// Caller-supplied body formatter: `(message, record) -> bytes`.
pub type BodyFormatter = Arc<dyn Fn(&str, &Record) -> Vec<u8> + Send + Sync>;

pub struct WebhookHandler {
    core: HandlerCore,
    url: String,
    transport: HttpTransport,
    body_fn: Option<BodyFormatter>,
    stream: Mutex<Option<Box<dyn Write + Send>>>,
}

impl WebhookHandler {
    pub fn new(url: impl Into<String>, transport: HttpTransport, min_level: Level) -> Result<Self> {
        let url = url.into();
        Url::parse(&url).map_err(|_| Error::InvalidUrl(url.clone()))?;
        Ok(Self { core: HandlerCore::new(min_level), url, transport, body_fn: None, stream: Mutex::new(None) })
    }

    pub fn with_body_formatter(mut self, body_fn: BodyFormatter) -> Self {
        self.body_fn = Some(body_fn);
        self
    }

    fn default_body(&self, record: &Record) -> Vec<u8> {
        let body = json!({
            "message": record.message,
            "data": record.data,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        body.to_string().into_bytes()
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

        let body = match &self.body_fn {
            Some(f) => f(&record.message, record),
            None => self.default_body(record),
        };

        if self.transport.send(&self.url, &body) {
            Some(payload)
        } else {
            None
        }
    }
}

impl Streamable for WebhookHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        *self.stream.lock().expect("stream lock poisoned") = stream;
    }
}

impl_handler_core!(WebhookHandler, HandlerKind::Webhook);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_url() {
        let transport = HttpTransport::builder().build().unwrap();
        assert!(WebhookHandler::new("not a url", transport, Level::Info).is_err());
    }
}
