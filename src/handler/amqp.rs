/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! AMQP sink (spec.md §4.7 "AMQP"): declares a fan-out exchange lazily on
//! first publish, then publishes with an empty routing key and persistent
//! delivery mode so a broker restart doesn't drop queued log entries.

use super::{impl_handler_core, HandlerCore, HandlerKind};
use crate::error::{Error, Result};
use crate::level::Level;
use crate::record::Record;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The subset of an AMQP channel this handler needs. `declare_exchange` must
/// be idempotent (a `fanout` exchange declared with the same name/durability
/// twice is a no-op on compliant brokers).
pub trait AmqpChannel: Send + Sync {
    fn is_connected(&self) -> bool;
    fn declare_exchange(&self, name: &str) -> std::result::Result<(), String>;
    /// `persistent` maps to AMQP delivery-mode 2.
    fn publish(&self, exchange: &str, routing_key: &str, body: &[u8], persistent: bool) -> std::result::Result<(), String>;
}

pub struct AmqpHandler {
    core: HandlerCore,
    channel: Arc<dyn AmqpChannel>,
    exchange: String,
    declared: AtomicBool,
}

impl AmqpHandler {
    /// Rejects a channel that isn't already connected (spec.md §4.7
    /// "construction fails fast if the supplied channel handle is not
    /// already connected; the handler performs no connection
    /// establishment of its own").
    pub fn new(channel: Arc<dyn AmqpChannel>, exchange: impl Into<String>, min_level: Level) -> Result<Self> {
        if !channel.is_connected() {
            return Err(Error::BrokerNotConnected);
        }
        Ok(Self {
            core: HandlerCore::new(min_level),
            channel,
            exchange: exchange.into(),
            declared: AtomicBool::new(false),
        })
    }

    fn ensure_exchange(&self) -> std::result::Result<(), String> {
        if self.declared.load(Ordering::Relaxed) {
            return Ok(());
        }
        self.channel.declare_exchange(&self.exchange)?;
        self.declared.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        if !self.core.responsible(record.level) {
            return None;
        }
        let payload = self.core.format(record);

        let result = self
            .ensure_exchange()
            .and_then(|()| self.channel.publish(&self.exchange, "", payload.as_bytes(), true));

        match result {
            Ok(()) => Some(payload),
            Err(e) => {
                eprintln!("(Amqp) Failed to publish to exchange {:?}: {}", self.exchange, e);
                None
            }
        }
    }
}

impl_handler_core!(AmqpHandler, HandlerKind::Amqp);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::sync::Mutex;

    struct FakeChannel {
        connected: bool,
        declares: Mutex<Vec<String>>,
        publishes: Mutex<Vec<(String, String, bool)>>,
    }

    impl AmqpChannel for FakeChannel {
        fn is_connected(&self) -> bool {
            self.connected
        }
        fn declare_exchange(&self, name: &str) -> std::result::Result<(), String> {
            self.declares.lock().unwrap().push(name.to_owned());
            Ok(())
        }
        fn publish(&self, exchange: &str, routing_key: &str, body: &[u8], persistent: bool) -> std::result::Result<(), String> {
            self.publishes.lock().unwrap().push((
                exchange.to_owned(),
                format!("{}:{}", routing_key, String::from_utf8_lossy(body)),
                persistent,
            ));
            Ok(())
        }
    }

    #[test]
    fn rejects_unconnected_channel() {
        let channel = Arc::new(FakeChannel { connected: false, declares: Mutex::new(Vec::new()), publishes: Mutex::new(Vec::new()) });
        assert!(AmqpHandler::new(channel, "logs", Level::Debug).is_err());
    }

    #[test]
    fn declares_exchange_once_and_publishes_persistent() {
        let channel = Arc::new(FakeChannel { connected: true, declares: Mutex::new(Vec::new()), publishes: Mutex::new(Vec::new()) });
        let handler = AmqpHandler::new(channel.clone(), "logs", Level::Debug).unwrap();
        let rec = Record { context: String::new(), level: Level::Info, message: "hi".into(), root: Map::new(), data: Map::new() };

        assert!(handler.invoke_impl(&rec).is_some());
        assert!(handler.invoke_impl(&rec).is_some());

        assert_eq!(channel.declares.lock().unwrap().len(), 1);
        let publishes = channel.publishes.lock().unwrap();
        assert_eq!(publishes.len(), 2);
        assert!(publishes[0].2);
        assert!(publishes[0].1.starts_with(':'));
    }
}
