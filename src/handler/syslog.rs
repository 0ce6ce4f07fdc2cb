/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! System log sink (spec.md §4.7 "Syslog"). Grounded on
//! `mixalturek-spirit`'s `spirit-log` crate, which also shells out to the
//! `syslog` crate for its `LogDestination::Syslog` variant.

use super::{impl_handler_core, write_to_stream, HandlerCore, HandlerKind, Streamable};
use crate::error::{Error, Result};
use crate::level::Level;
use crate::record::Record;
use syslog::{Facility, Formatter3164, Logger, LoggerBackend, Severity};
use std::io::Write;
use std::sync::Mutex;

fn severity_for(level: Level) -> Severity {
    match level {
        Level::Debug => Severity::LOG_DEBUG,
        Level::Info => Severity::LOG_INFO,
        Level::Notice => Severity::LOG_NOTICE,
        Level::Warning => Severity::LOG_WARNING,
        Level::Error => Severity::LOG_ERR,
        Level::Critical => Severity::LOG_CRIT,
        Level::Alert => Severity::LOG_ALERT,
        Level::Emergency => Severity::LOG_EMERG,
    }
}

/// Opens the system log on construction using `ident` as the syslog ident,
/// and closes it on drop.
pub struct SyslogHandler {
    core: HandlerCore,
    writer: Mutex<Logger<LoggerBackend, Formatter3164>>,
    stream: Mutex<Option<Box<dyn Write + Send>>>,
}

impl SyslogHandler {
    pub fn new(ident: impl Into<String>, min_level: Level) -> Result<Self> {
        let formatter = Formatter3164 { facility: Facility::LOG_USER, hostname: None, process: ident.into(), pid: std::process::id() as i32 };
        let writer = syslog::unix(formatter).map_err(|e| Error::Construction(e.to_string()))?;
        Ok(Self { core: HandlerCore::new(min_level), writer: Mutex::new(writer), stream: Mutex::new(None) })
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

        let severity = severity_for(record.level);
        let mut writer = self.writer.lock().expect("syslog writer lock poisoned");
        let result = match severity {
            Severity::LOG_EMERG => writer.emerg(&payload),
            Severity::LOG_ALERT => writer.alert(&payload),
            Severity::LOG_CRIT => writer.crit(&payload),
            Severity::LOG_ERR => writer.err(&payload),
            Severity::LOG_WARNING => writer.warning(&payload),
            Severity::LOG_NOTICE => writer.notice(&payload),
            Severity::LOG_INFO => writer.info(&payload),
            Severity::LOG_DEBUG => writer.debug(&payload),
        };
        result.ok().map(|_| payload)
    }
}

impl Streamable for SyslogHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        *self.stream.lock().expect("stream lock poisoned") = stream;
    }
}

impl_handler_core!(SyslogHandler, HandlerKind::Syslog);
