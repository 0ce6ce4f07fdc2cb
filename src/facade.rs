/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Bridges a `Logger` into the `log` facade (feature `log-facade`), so
//! `log::info!` and friends reach it too, alongside direct `Logger::log`
//! calls.

use crate::level::Level;
use crate::logger::Logger;
use log::{Level as LogLevel, Metadata, Record as LogRecord};
use std::sync::Arc;

fn from_log_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Error => Level::Error,
        LogLevel::Warn => Level::Warning,
        LogLevel::Info => Level::Info,
        LogLevel::Debug => Level::Debug,
        LogLevel::Trace => Level::Debug,
    }
}

/// Implements `log::Log` by forwarding every accepted record to an inner
/// `Logger`. Install with `facade::init`.
pub struct LogFacade {
    logger: Arc<Logger>,
}

impl LogFacade {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl log::Log for LogFacade {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &LogRecord) {
        let level = from_log_level(record.level());
        self.logger.log(level, &record.args().to_string(), Default::default());
    }

    fn flush(&self) {}
}

/// Installs `logger` as the process-wide `log` backend. Only one backend
/// can be installed per process (`log`'s own restriction); calling this
/// twice returns `log::SetLoggerError`.
pub fn init(logger: Arc<Logger>) -> Result<(), log::SetLoggerError> {
    log::set_max_level(log::LevelFilter::Trace);
    log::set_boxed_logger(Box::new(LogFacade::new(logger)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_log_levels_onto_canonical_levels() {
        assert_eq!(from_log_level(LogLevel::Warn), Level::Warning);
        assert_eq!(from_log_level(LogLevel::Trace), Level::Debug);
    }
}
