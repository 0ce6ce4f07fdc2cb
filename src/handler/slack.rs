/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Slack incoming-webhook sink (spec.md §4.7 "Slack / Teams / Loki").

use super::{impl_handler_core, write_to_stream, HandlerCore, HandlerKind, Streamable};
use crate::error::{Error, Result};
use crate::formatter::SlackFormatter;
use crate::level::Level;
use crate::record::Record;
use crate::transport::{HttpMethod, HttpTransport};
use std::io::Write;
use std::sync::Mutex;
use url::Url;

pub struct SlackHandler {
    core: HandlerCore,
    url: String,
    transport: HttpTransport,
    stream: Mutex<Option<Box<dyn Write + Send>>>,
}

impl SlackHandler {
    pub fn new(url: impl Into<String>, min_level: Level) -> Result<Self> {
        let url = url.into();
        Url::parse(&url).map_err(|_| Error::InvalidUrl(url.clone()))?;
        let transport = HttpTransport::builder().method(HttpMethod::Post).build()?;
        let core = HandlerCore::new(min_level);
        core.set_format_inner(std::sync::Arc::new(SlackFormatter));
        Ok(Self { core, url, transport, stream: Mutex::new(None) })
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

        if self.transport.send(&self.url, payload.as_bytes()) {
            Some(payload)
        } else {
            None
        }
    }
}

impl Streamable for SlackHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        *self.stream.lock().expect("stream lock poisoned") = stream;
    }
}

impl_handler_core!(SlackHandler, HandlerKind::Slack);
